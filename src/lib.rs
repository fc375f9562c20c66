//! Core encode/decode pipeline for a JPEG XL-style image codec: bit-level
//! I/O, rANS entropy coding, the Modular (lossless) and VarDCT (lossy)
//! pixel pipelines, and the codestream/container framing that ties them
//! together (spec §2's component list).
//!
//! The public entry points are [`orchestration::encode_codestream`] /
//! [`orchestration::decode_codestream`] for a bare codestream, and
//! [`orchestration::encode_container`] / [`orchestration::decode_container`]
//! when a host wants the ISOBMFF file wrapper with Exif/XML/ICC metadata.
//! Everything else in this crate (`modular`, `vardct`, `entropy`,
//! `bitstream`) is exposed for host applications and tests that need to
//! drive a single pipeline stage directly.

pub mod array2d;
pub mod bitstream;
pub mod consts;
pub mod container;
pub mod entropy;
pub mod error;
pub mod frame;
pub mod isobmff;
pub mod modular;
pub mod options;
pub mod orchestration;
pub mod util;
pub mod vardct;

pub use error::{JxlError, Result};
pub use frame::{AlphaMode, ColorSpace, ImageFrame, OwnedFrame, PixelType};
pub use options::{ColourTransform, EncodingMode, EncodingOptions, Effort};
pub use orchestration::{decode_codestream, decode_container, encode_codestream, encode_container};
