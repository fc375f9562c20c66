//! Chroma-from-luma: predict a chroma AC coefficient plane from the
//! co-located luma coefficients via a single per-block least-squares slope
//! (spec §4.4).

use crate::array2d::Array2D;

/// Slope `alpha = sum(L*C) / sum(L*L)` over AC positions (everything but the
/// DC coefficient at `(0, 0)`), or `0` if luma energy is negligible.
pub fn fit_alpha(luma_coeffs: &Array2D<f32>, chroma_coeffs: &Array2D<f32>) -> f32 {
  let (rows, cols) = (luma_coeffs.rows(), luma_coeffs.cols());
  let mut num = 0.0f64;
  let mut den = 0.0f64;
  for r in 0..rows {
    for c in 0..cols {
      if r == 0 && c == 0 {
        continue;
      }
      let l = luma_coeffs[r][c] as f64;
      let ch = chroma_coeffs[r][c] as f64;
      num += l * ch;
      den += l * l;
    }
  }
  if den < 1e-10 {
    0.0
  } else {
    (num / den) as f32
  }
}

/// Quantised slope as stored in the bitstream: `round(alpha * 256)`.
pub fn quantize_alpha(alpha: f32) -> i32 {
  (alpha * 256.0).round() as i32
}

pub fn dequantize_alpha(q: i32) -> f32 {
  q as f32 / 256.0
}

/// Residual chroma plane after subtracting the luma-predicted component:
/// `C'[r][c] = C[r][c] - alpha * L[r][c]` for AC positions; DC is untouched.
pub fn subtract_predicted(luma_coeffs: &Array2D<f32>, chroma_coeffs: &Array2D<f32>, alpha: f32) -> Array2D<f32> {
  let (rows, cols) = (chroma_coeffs.rows(), chroma_coeffs.cols());
  let mut out = chroma_coeffs.clone();
  for r in 0..rows {
    for c in 0..cols {
      if r == 0 && c == 0 {
        continue;
      }
      out[r][c] = chroma_coeffs[r][c] - alpha * luma_coeffs[r][c];
    }
  }
  out
}

/// Inverse of [`subtract_predicted`]: reconstruct chroma AC coefficients
/// from the residual plane and the co-located luma plane.
pub fn add_predicted(luma_coeffs: &Array2D<f32>, residual_coeffs: &Array2D<f32>, alpha: f32) -> Array2D<f32> {
  let (rows, cols) = (residual_coeffs.rows(), residual_coeffs.cols());
  let mut out = residual_coeffs.clone();
  for r in 0..rows {
    for c in 0..cols {
      if r == 0 && c == 0 {
        continue;
      }
      out[r][c] = residual_coeffs[r][c] + alpha * luma_coeffs[r][c];
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fit_alpha_recovers_an_exact_linear_relationship() {
    let mut luma = Array2D::new_filled(8, 8, 0.0f32);
    let mut chroma = Array2D::new_filled(8, 8, 0.0f32);
    for r in 0..8 {
      for c in 0..8 {
        luma[r][c] = (r * 8 + c) as f32;
        chroma[r][c] = 1.5 * luma[r][c];
      }
    }
    let alpha = fit_alpha(&luma, &chroma);
    assert!((alpha - 1.5).abs() < 1e-4, "alpha = {alpha}");
  }

  #[test]
  fn zero_luma_energy_yields_zero_alpha() {
    let luma = Array2D::new_filled(8, 8, 0.0f32);
    let chroma = Array2D::new_filled(8, 8, 3.0f32);
    assert_eq!(fit_alpha(&luma, &chroma), 0.0);
  }

  #[test]
  fn subtract_then_add_round_trips() {
    let mut luma = Array2D::new_filled(8, 8, 0.0f32);
    let mut chroma = Array2D::new_filled(8, 8, 0.0f32);
    for r in 0..8 {
      for c in 0..8 {
        luma[r][c] = ((r * 3 + c) % 5) as f32;
        chroma[r][c] = ((r + c * 2) % 7) as f32 - 3.0;
      }
    }
    let alpha = fit_alpha(&luma, &chroma);
    let residual = subtract_predicted(&luma, &chroma, alpha);
    let recovered = add_predicted(&luma, &residual, alpha);
    for r in 0..8 {
      for c in 0..8 {
        assert!((recovered[r][c] - chroma[r][c]).abs() < 1e-3);
      }
    }
    // DC is untouched by CfL.
    assert_eq!(residual[0][0], chroma[0][0]);
  }

  #[test]
  fn quantize_dequantize_round_trips_within_one_step() {
    for &a in &[0.0f32, 0.5, -0.75, 1.999, -2.0] {
      let q = quantize_alpha(a);
      let back = dequantize_alpha(q);
      assert!((back - a).abs() < 1.0 / 256.0 + 1e-6);
    }
  }
}
