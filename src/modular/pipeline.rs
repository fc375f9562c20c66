//! Per-channel modular encode/decode: predictive residuals, squeeze
//! transform, entropy coding (spec §4.3's "per-channel payload order").
//!
//! Decoding order: entropy-decode the squeezed residual array (context for
//! each element is re-derived from already-decoded squeezed-domain
//! neighbours), invert the squeeze transform to recover raster-order
//! residuals, then walk the image in raster order adding each residual to
//! a prediction computed from already-reconstructed actual pixel values —
//! this is why squeeze inversion must fully complete before prediction
//! starts: prediction needs real pixel values, squeeze inversion only
//! needs the residual array.

use crate::array2d::Array2D;
use crate::error::Result;
use crate::modular::context::select_context;
use crate::modular::entropy::{ans_decode, ans_encode, rle_decode, rle_encode};
use crate::modular::predictor::{self, Neighbourhood, PredictorKind};
use crate::modular::squeeze::{self, SqueezePlan};
use crate::modular::tree::{MaTree, PropertyValues};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyBackend {
  RunLength,
  Ans,
}

/// Per-channel predictor configuration: either the plain MED predictor with
/// the simple 8-bucket context scheme, or a shared MA tree supplying both
/// predictor kind and entropy context per pixel.
#[derive(Debug, Clone)]
pub enum Predictor {
  Med,
  Tree(MaTree),
}

fn fetch_neighbourhood(channel: &Array2D<i32>, x: usize, y: usize) -> Neighbourhood {
  let get = |xx: isize, yy: isize| -> Option<i32> {
    if xx < 0 || yy < 0 {
      None
    } else {
      Some(channel[yy as usize][xx as usize])
    }
  };
  let w = get(x as isize - 1, y as isize);
  let n = get(x as isize, y as isize - 1);
  let nw = get(x as isize - 1, y as isize - 1);
  let ne = if x + 1 < channel.cols() { get(x as isize + 1, y as isize - 1) } else { None };

  // Fall back to the sole available neighbour, or 0 at the true origin.
  let w_v = w.unwrap_or(0);
  let n_v = n.unwrap_or(w_v);
  let w_v = if w.is_none() { n_v } else { w_v };
  let nw_v = nw.unwrap_or(if n.is_some() { n_v } else { w_v });
  let ne_v = ne.unwrap_or(n_v);
  Neighbourhood { n: n_v, w: w_v, nw: nw_v, ne: ne_v }
}

fn predict_pixel(
  predictor: &Predictor,
  channel_idx: usize,
  channel: &Array2D<i32>,
  residual_magnitude: &Array2D<i32>,
  x: usize,
  y: usize,
) -> (i32, usize) {
  let nb = fetch_neighbourhood(channel, x, y);
  match predictor {
    Predictor::Med => {
      let predicted = predictor::predict(PredictorKind::Med, &nb);
      let n_res = if y > 0 { residual_magnitude[y - 1][x] } else { 0 };
      let w_res = if x > 0 { residual_magnitude[y][x - 1] } else { 0 };
      let nw_res = if x > 0 && y > 0 { residual_magnitude[y - 1][x - 1] } else { 0 };
      (predicted, select_context(n_res, w_res, nw_res))
    }
    Predictor::Tree(tree) => {
      let max_abs_residual = {
        let n_res = if y > 0 { residual_magnitude[y - 1][x].abs() } else { 0 };
        let w_res = if x > 0 { residual_magnitude[y][x - 1].abs() } else { 0 };
        n_res.max(w_res)
      };
      let props = PropertyValues {
        channel: channel_idx as i32,
        n: nb.n,
        w: nb.w,
        nw: nb.nw,
        ne: nb.ne,
        max_abs_residual,
      };
      let (kind, ctx) = tree.traverse(&props);
      (predictor::predict(kind, &nb), ctx)
    }
  }
}

/// Forward predictive pass: returns the raster-order residual array and the
/// per-element entropy context array (same row-major order).
fn forward_predict(predictor: &Predictor, channel_idx: usize, channel: &Array2D<i32>) -> (Array2D<i32>, Vec<usize>) {
  let (rows, cols) = (channel.rows(), channel.cols());
  let mut residuals = Array2D::new_filled(rows, cols, 0i32);
  let mut contexts = Vec::with_capacity(rows * cols);

  for y in 0..rows {
    for x in 0..cols {
      let (predicted, ctx) = predict_pixel(predictor, channel_idx, channel, &residuals, x, y);
      residuals[y][x] = channel[y][x] - predicted;
      contexts.push(ctx);
    }
  }
  (residuals, contexts)
}

/// Inverse predictive pass: given fully-reconstructed raster-order
/// residuals, rebuild actual pixel values in raster order.
fn inverse_predict(predictor: &Predictor, channel_idx: usize, residuals: &Array2D<i32>) -> Array2D<i32> {
  let (rows, cols) = (residuals.rows(), residuals.cols());
  let mut channel = Array2D::new_filled(rows, cols, 0i32);

  for y in 0..rows {
    for x in 0..cols {
      let (predicted, _ctx) = predict_pixel(predictor, channel_idx, &channel, residuals, x, y);
      channel[y][x] = predicted + residuals[y][x];
    }
  }
  channel
}

fn context_count_for(predictor: &Predictor) -> usize {
  match predictor {
    Predictor::Med => crate::modular::context::CONTEXT_COUNT,
    Predictor::Tree(tree) => tree.context_count(),
  }
}

/// Encode one channel end to end: predict -> squeeze -> entropy code. The
/// byte block this returns always begins on a byte boundary in the caller's
/// stream (the caller is responsible for that alignment; every backend here
/// emits a self-delimiting byte blob).
pub fn encode_channel(
  channel_idx: usize,
  channel: &Array2D<i32>,
  predictor: &Predictor,
  squeeze_levels: usize,
  backend: EntropyBackend,
) -> Result<Vec<u8>> {
  let (rows, cols) = (channel.rows(), channel.cols());
  let (residuals, _raster_contexts) = forward_predict(predictor, channel_idx, channel);

  let mut squeezed = residuals.clone();
  let plan = squeeze::build_plan(cols, rows, squeeze_levels);
  squeeze::forward(&mut squeezed, &plan);

  let flat: Vec<i32> = squeezed.iter().copied().collect();
  let context_count = context_count_for(predictor);
  let squeezed_contexts = squeezed_domain_contexts(&squeezed, context_count);

  match backend {
    EntropyBackend::RunLength => Ok(rle_encode(&flat)),
    EntropyBackend::Ans => ans_encode(&flat, &squeezed_contexts, context_count),
  }
}

/// Contexts derived purely from the squeezed-domain causal neighbourhood
/// (abs values at N, W, NW within the squeezed array), bucketed the same
/// way as [`crate::modular::context::select_context`] but folded into
/// whatever context space the active predictor uses, so it stays
/// decodable without the raster-domain residuals the entropy stage
/// doesn't have yet.
fn squeezed_domain_contexts(squeezed: &Array2D<i32>, context_count: usize) -> Vec<usize> {
  let (rows, cols) = (squeezed.rows(), squeezed.cols());
  let mut contexts = Vec::with_capacity(rows * cols);
  for y in 0..rows {
    for x in 0..cols {
      let n = if y > 0 { squeezed[y - 1][x] } else { 0 };
      let w = if x > 0 { squeezed[y][x - 1] } else { 0 };
      let nw = if x > 0 && y > 0 { squeezed[y - 1][x - 1] } else { 0 };
      contexts.push(select_context(n, w, nw) % context_count.max(1));
    }
  }
  contexts
}

pub fn decode_channel(
  data: &[u8],
  channel_idx: usize,
  rows: usize,
  cols: usize,
  predictor: &Predictor,
  squeeze_levels: usize,
  backend: EntropyBackend,
) -> Result<Array2D<i32>> {
  let context_count = context_count_for(predictor);
  let flat: Vec<i32> = match backend {
    EntropyBackend::RunLength => rle_decode(data, rows * cols)?,
    EntropyBackend::Ans => {
      let mut partial: Array2D<i32> = Array2D::new_filled(rows, cols, 0i32);
      ans_decode(data, |i, decoded_so_far| {
        // `decoded_so_far.len() == i` always holds here (context_fn is
        // called once per index in increasing order); fold the element
        // just decoded into `partial` before deriving the next context, so
        // N/W/NW lookups see exactly what the encoder saw.
        if i > 0 {
          let prev = i - 1;
          partial[prev / cols][prev % cols] = decoded_so_far[prev];
        }
        let n = if i / cols > 0 { partial[i / cols - 1][i % cols] } else { 0 };
        let w = if i % cols > 0 { partial[i / cols][i % cols - 1] } else { 0 };
        let nw = if i % cols > 0 && i / cols > 0 { partial[i / cols - 1][i % cols - 1] } else { 0 };
        select_context(n, w, nw) % context_count.max(1)
      })?
    }
  };

  let mut squeezed = Array2D::new_filled(rows, cols, 0i32);
  for (i, &v) in flat.iter().enumerate() {
    squeezed[i / cols][i % cols] = v;
  }

  let plan = squeeze::build_plan(cols, rows, squeeze_levels);
  squeeze::inverse(&mut squeezed, &plan);

  Ok(inverse_predict(predictor, channel_idx, &squeezed))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ramp_channel(rows: usize, cols: usize) -> Array2D<i32> {
    let mut a = Array2D::new_filled(rows, cols, 0i32);
    for y in 0..rows {
      for x in 0..cols {
        a[y][x] = ((x * 7 + y * 3) % 256) as i32;
      }
    }
    a
  }

  #[test]
  fn med_rle_round_trips() {
    let channel = ramp_channel(16, 12);
    let predictor = Predictor::Med;
    let encoded = encode_channel(0, &channel, &predictor, 3, EntropyBackend::RunLength).unwrap();
    let decoded = decode_channel(&encoded, 0, 16, 12, &predictor, 3, EntropyBackend::RunLength).unwrap();
    for y in 0..16 {
      for x in 0..12 {
        assert_eq!(decoded[y][x], channel[y][x]);
      }
    }
  }

  #[test]
  fn med_ans_round_trips() {
    let channel = ramp_channel(10, 10);
    let predictor = Predictor::Med;
    let encoded = encode_channel(0, &channel, &predictor, 3, EntropyBackend::Ans).unwrap();
    let decoded = decode_channel(&encoded, 0, 10, 10, &predictor, 3, EntropyBackend::Ans).unwrap();
    for y in 0..10 {
      for x in 0..10 {
        assert_eq!(decoded[y][x], channel[y][x]);
      }
    }
  }

  #[test]
  fn ma_tree_ans_round_trips_a_flat_channel() {
    let channel = Array2D::new_filled(8, 8, 42i32);
    let predictor = Predictor::Tree(MaTree::default_tree());
    let encoded = encode_channel(1, &channel, &predictor, 3, EntropyBackend::Ans).unwrap();
    let decoded = decode_channel(&encoded, 1, 8, 8, &predictor, 3, EntropyBackend::Ans).unwrap();
    for y in 0..8 {
      for x in 0..8 {
        assert_eq!(decoded[y][x], 42);
      }
    }
  }

  #[test]
  fn ma_tree_extended_rle_round_trips_noisy_channel() {
    let mut channel = Array2D::new_filled(9, 11, 0i32);
    for y in 0..9 {
      for x in 0..11 {
        channel[y][x] = (((x * 31 + y * 17) % 251) as i32) - 100;
      }
    }
    let predictor = Predictor::Tree(MaTree::extended_tree());
    let encoded = encode_channel(0, &channel, &predictor, 3, EntropyBackend::RunLength).unwrap();
    let decoded = decode_channel(&encoded, 0, 9, 11, &predictor, 3, EntropyBackend::RunLength).unwrap();
    for y in 0..9 {
      for x in 0..11 {
        assert_eq!(decoded[y][x], channel[y][x]);
      }
    }
  }
}
