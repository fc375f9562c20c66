//! Adaptive quantisation and DC prediction for the VarDCT pipeline (spec
//! §4.4).

use crate::array2d::Array2D;

pub const DEFAULT_STRENGTH: f32 = 1.0;
pub const DEFAULT_KAPPA: f32 = 0.01;

/// Per-block spatial activity: variance of the spatial-domain block after
/// normalisation to `[0, 1]`.
pub fn activity(normalized_block: &Array2D<f32>) -> f32 {
  let (rows, cols) = (normalized_block.rows(), normalized_block.cols());
  let n = (rows * cols) as f32;
  if n == 0.0 {
    return 0.0;
  }
  let mean: f32 = normalized_block.iter().sum::<f32>() / n;
  normalized_block.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>() / n
}

/// `scale = 1 + strength * (activity / (activity + kappa) - 0.5)`.
pub fn activity_scale(activity: f32, strength: f32, kappa: f32) -> f32 {
  1.0 + strength * (activity / (activity + kappa) - 0.5)
}

/// `qBase = max(1, distance * 8)`, applied after any region-of-interest
/// distance multiplier has already scaled `distance`.
pub fn q_base(distance: f32) -> f32 {
  (distance * 8.0).max(1.0)
}

/// Per-coefficient quantisation step at zigzag/natural position `(u, v)`:
/// `qBase * (1 + (u+v)/2) * clamp(1/scale, [0.5, 2.0])`, times 1.5 for
/// chroma channels.
pub fn coefficient_step(q_base: f32, u: usize, v: usize, scale: f32, is_chroma: bool) -> f32 {
  let inv_scale = (1.0 / scale).clamp(0.5, 2.0);
  let step = q_base * (1.0 + (u + v) as f32 / 2.0) * inv_scale;
  if is_chroma {
    step * 1.5
  } else {
    step
  }
}

pub fn quantize_coefficient(value: f32, step: f32) -> i32 {
  (value / step).round() as i32
}

pub fn dequantize_coefficient(level: i32, step: f32) -> f32 {
  level as f32 * step
}

/// Quantise an entire coefficient block, computing a fresh step per
/// position from activity-derived `scale`.
pub fn quantize_block(coeffs: &Array2D<f32>, q_base: f32, scale: f32, is_chroma: bool) -> Array2D<i32> {
  let (rows, cols) = (coeffs.rows(), coeffs.cols());
  let mut out = Array2D::new_filled(rows, cols, 0i32);
  for u in 0..rows {
    for v in 0..cols {
      let step = coefficient_step(q_base, u, v, scale, is_chroma);
      out[u][v] = quantize_coefficient(coeffs[u][v], step);
    }
  }
  out
}

pub fn dequantize_block(levels: &Array2D<i32>, q_base: f32, scale: f32, is_chroma: bool) -> Array2D<f32> {
  let (rows, cols) = (levels.rows(), levels.cols());
  let mut out = Array2D::new_filled(rows, cols, 0.0f32);
  for u in 0..rows {
    for v in 0..cols {
      let step = coefficient_step(q_base, u, v, scale, is_chroma);
      out[u][v] = dequantize_coefficient(levels[u][v], step);
    }
  }
  out
}

/// Predicted DC for the 8x8 cell at `(cell_row, cell_col)` in a grid of
/// already-reconstructed absolute DC values, `None` entries meaning "not yet
/// decoded" (never true for left/above neighbours in raster scan order, but
/// kept `Option` for clarity at the grid edges). Shared by both directions
/// of the VarDCT DC pass: the encoder predicts the same way the decoder
/// reconstructs, so residual = absolute − predicted round-trips exactly.
pub fn predict_dc(dc_cells: &Array2D<Option<i32>>, cell_row: usize, cell_col: usize) -> i32 {
  let left = if cell_col > 0 { dc_cells[cell_row][cell_col - 1] } else { None };
  let above = if cell_row > 0 { dc_cells[cell_row - 1][cell_col] } else { None };
  match (left, above) {
    (Some(l), Some(a)) => (l + a).div_euclid(2),
    (Some(l), None) => l,
    (None, Some(a)) => a,
    (None, None) => 0,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn activity_of_flat_block_is_zero() {
    let block = Array2D::new_filled(8, 8, 0.5f32);
    assert_eq!(activity(&block), 0.0);
  }

  #[test]
  fn scale_is_one_at_default_midpoint_activity() {
    // activity / (activity + kappa) == 0.5 when activity == kappa.
    let scale = activity_scale(DEFAULT_KAPPA, DEFAULT_STRENGTH, DEFAULT_KAPPA);
    assert!((scale - 1.0).abs() < 1e-6);
  }

  #[test]
  fn q_base_floors_at_one() {
    assert_eq!(q_base(0.0), 1.0);
    assert_eq!(q_base(1.0), 8.0);
  }

  #[test]
  fn chroma_step_is_one_and_a_half_times_luma_step() {
    let luma = coefficient_step(8.0, 2, 3, 1.0, false);
    let chroma = coefficient_step(8.0, 2, 3, 1.0, true);
    assert!((chroma - luma * 1.5).abs() < 1e-4);
  }

  #[test]
  fn quantize_dequantize_recovers_the_value_within_one_step() {
    let step = 3.0;
    for &v in &[0.0f32, 7.0, -7.0, 100.0] {
      let level = quantize_coefficient(v, step);
      let back = dequantize_coefficient(level, step);
      assert!((back - v).abs() <= step / 2.0 + 1e-3);
    }
  }

  #[test]
  fn dc_prediction_uses_neighbour_average_or_falls_back_to_the_edges() {
    let mut grid: Array2D<Option<i32>> = Array2D::new_filled(2, 3, None);
    grid[0][0] = Some(10);
    grid[0][1] = Some(20);
    grid[1][0] = Some(30);
    assert_eq!(predict_dc(&grid, 0, 0), 0);
    assert_eq!(predict_dc(&grid, 0, 1), 10);
    assert_eq!(predict_dc(&grid, 1, 0), 10);
    assert_eq!(predict_dc(&grid, 1, 1), (20 + 30) / 2);
  }
}
