//! Separable type-II 2D DCT/IDCT for arbitrary `N x M` blocks (spec §4.4).
//!
//! The teacher's `txfm.rs` butterfly network is AV1's fixed-point integer
//! transform, tuned for 4/8-point block sizes under a bitstream-mandated
//! rounding contract; this codec's block grid spans nine shapes up to
//! `32x32` with no such contract, so the straightforward separable
//! cosine-sum form is used instead, scaled orthonormally per spec §4.4.

use crate::array2d::Array2D;
use std::f64::consts::PI;

fn scale(k: usize) -> f64 {
  if k == 0 {
    std::f64::consts::FRAC_1_SQRT_2
  } else {
    1.0
  }
}

/// 1D orthonormal DCT-II: `X[k] = sqrt(2/N) * c_k * sum_n x[n] cos(pi/N (n+0.5) k)`.
fn dct_1d(input: &[f64]) -> Vec<f64> {
  let n = input.len();
  let norm = (2.0 / n as f64).sqrt();
  let mut out = vec![0.0; n];
  for k in 0..n {
    let mut sum = 0.0;
    for (x, &v) in input.iter().enumerate() {
      sum += v * (PI / n as f64 * (x as f64 + 0.5) * k as f64).cos();
    }
    out[k] = norm * scale(k) * sum;
  }
  out
}

/// 1D orthonormal inverse (DCT-III): `x[n] = sqrt(2/N) * sum_k c_k X[k] cos(pi/N (n+0.5) k)`.
fn idct_1d(coeffs: &[f64]) -> Vec<f64> {
  let n = coeffs.len();
  let norm = (2.0 / n as f64).sqrt();
  let mut out = vec![0.0; n];
  for x in 0..n {
    let mut sum = 0.0;
    for (k, &c) in coeffs.iter().enumerate() {
      sum += scale(k) * c * (PI / n as f64 * (x as f64 + 0.5) * k as f64).cos();
    }
    out[x] = norm * sum;
  }
  out
}

/// Forward 2D DCT of an `N x M` (rows x cols) block of values, typically in
/// `[0, 1]` after spatial normalisation. `(0, 0)` of the result is DC.
pub fn forward_dct2d(block: &Array2D<f32>) -> Array2D<f32> {
  let (rows, cols) = (block.rows(), block.cols());

  // DCT along rows (columns as the transform axis), producing intermediate
  // per-row spectra, then DCT along columns.
  let mut intermediate = Array2D::new_filled(rows, cols, 0.0f64);
  for r in 0..rows {
    let row: Vec<f64> = (0..cols).map(|c| block[r][c] as f64).collect();
    let transformed = dct_1d(&row);
    for c in 0..cols {
      intermediate[r][c] = transformed[c];
    }
  }

  let mut result = Array2D::new_filled(rows, cols, 0.0f32);
  for c in 0..cols {
    let col: Vec<f64> = (0..rows).map(|r| intermediate[r][c]).collect();
    let transformed = dct_1d(&col);
    for r in 0..rows {
      result[r][c] = transformed[r] as f32;
    }
  }
  result
}

pub fn inverse_dct2d(coeffs: &Array2D<f32>) -> Array2D<f32> {
  let (rows, cols) = (coeffs.rows(), coeffs.cols());

  let mut intermediate = Array2D::new_filled(rows, cols, 0.0f64);
  for c in 0..cols {
    let col: Vec<f64> = (0..rows).map(|r| coeffs[r][c] as f64).collect();
    let transformed = idct_1d(&col);
    for r in 0..rows {
      intermediate[r][c] = transformed[r];
    }
  }

  let mut result = Array2D::new_filled(rows, cols, 0.0f32);
  for r in 0..rows {
    let row: Vec<f64> = (0..cols).map(|c| intermediate[r][c]).collect();
    let transformed = idct_1d(&row);
    for c in 0..cols {
      result[r][c] = transformed[c] as f32;
    }
  }
  result
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn idct_of_dct_recovers_an_8x8_block_within_tolerance() {
    let mut block = Array2D::new_filled(8, 8, 0.0f32);
    for r in 0..8 {
      for c in 0..8 {
        block[r][c] = ((r * 8 + c) as f32 / 64.0).sin().abs();
      }
    }
    let coeffs = forward_dct2d(&block);
    let back = inverse_dct2d(&coeffs);
    let mut max_err = 0.0f32;
    for r in 0..8 {
      for c in 0..8 {
        max_err = max_err.max((back[r][c] - block[r][c]).abs());
      }
    }
    assert!(max_err < 1e-4, "max error {max_err}");
  }

  #[test]
  fn dc_only_block_is_constant_under_the_inverse() {
    let mut coeffs = Array2D::new_filled(8, 8, 0.0f32);
    coeffs[0][0] = 8.0; // sqrt(2/8)*c0 * 8 samples of 1.0 folds to this DC value
    let back = inverse_dct2d(&coeffs);
    let first = back[0][0];
    for r in 0..8 {
      for c in 0..8 {
        assert!((back[r][c] - first).abs() < 1e-4);
      }
    }
  }

  #[test]
  fn round_trips_non_square_16x8_block() {
    let mut block = Array2D::new_filled(16, 8, 0.0f32);
    for r in 0..16 {
      for c in 0..8 {
        block[r][c] = ((r * 3 + c * 5) % 17) as f32 / 17.0;
      }
    }
    let coeffs = forward_dct2d(&block);
    let back = inverse_dct2d(&coeffs);
    for r in 0..16 {
      for c in 0..8 {
        assert!((back[r][c] - block[r][c]).abs() < 1e-4);
      }
    }
  }
}
