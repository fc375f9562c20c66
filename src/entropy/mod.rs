//! rANS entropy coding: distributions, single- and multi-context coders,
//! K-way interleaving, histogram clustering, and the LZ77+ANS hybrid
//! backend used for long runs and highly repetitive channels.

pub mod clustering;
pub mod distribution;
pub mod interleaved;
pub mod lz77;
pub mod multi_context;
pub mod rans;

pub use distribution::{ANSDistribution, PRECISION};
