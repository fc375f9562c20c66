//! Content-adaptive VarDCT block-size selection (spec §4.4).
//!
//! Block sizes are chosen per `32x32`-aligned region from the variance of
//! its four `16x16` quadrants, each itself built from four `8x8`
//! sub-blocks: very smooth regions promote to `16x16`/`32x32`; strongly
//! directional ones pick a matching rectangular shape; everything else
//! stays at the default `8x8`.

use crate::array2d::Array2D;

pub const SMOOTH_VARIANCE_THRESHOLD: f32 = 0.005;
pub const ANISOTROPY_RATIO_THRESHOLD: f32 = 2.0;

/// Sample variance of a spatial block already normalised to `[0, 1]`.
pub fn block_variance(block: &Array2D<f32>) -> f32 {
  let n = (block.rows() * block.cols()) as f32;
  if n == 0.0 {
    return 0.0;
  }
  let mean: f32 = block.iter().sum::<f32>() / n;
  let var: f32 = block.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>() / n;
  var
}

/// One `8x8`-block's worth of statistics used to pick the shape for the
/// `32x32`-aligned region it anchors.
#[derive(Debug, Clone, Copy)]
pub struct SubBlockStats {
  pub variance: f32,
  /// Variance of column-wise means (captures horizontal structure) versus
  /// row-wise means (captures vertical structure); used for anisotropy.
  pub horizontal_variance: f32,
  pub vertical_variance: f32,
}

pub fn sub_block_stats(block: &Array2D<f32>) -> SubBlockStats {
  let (rows, cols) = (block.rows(), block.cols());
  let variance = block_variance(block);

  let row_means: Vec<f32> = (0..rows)
    .map(|r| (0..cols).map(|c| block[r][c]).sum::<f32>() / cols.max(1) as f32)
    .collect();
  let col_means: Vec<f32> = (0..cols)
    .map(|c| (0..rows).map(|r| block[r][c]).sum::<f32>() / rows.max(1) as f32)
    .collect();

  let mean_of = |v: &[f32]| v.iter().sum::<f32>() / v.len().max(1) as f32;
  let variance_of = |v: &[f32]| {
    let m = mean_of(v);
    v.iter().map(|&x| (x - m) * (x - m)).sum::<f32>() / v.len().max(1) as f32
  };

  // Horizontal structure shows up as variance *across columns* (row means
  // differing along x would require per-column data; here we measure how
  // much column means vary, which is high when there's horizontal edges).
  SubBlockStats { variance, horizontal_variance: variance_of(&col_means), vertical_variance: variance_of(&row_means) }
}

/// Choose a block shape for a region given the `8x8` sub-block stats
/// available within it (fewer than 16 near image borders). `max_w`/`max_h`
/// bound how large a shape the region has room for (in pixels).
pub fn select_block_shape(stats: &[SubBlockStats], max_w: usize, max_h: usize) -> (usize, usize) {
  if stats.is_empty() {
    return (8, 8);
  }
  let max_variance = stats.iter().map(|s| s.variance).fold(0.0f32, f32::max);
  let mean_variance = stats.iter().map(|s| s.variance).sum::<f32>() / stats.len() as f32;

  if max_variance < SMOOTH_VARIANCE_THRESHOLD {
    if max_w >= 32 && max_h >= 32 && stats.len() >= 16 {
      return (32, 32);
    }
    if max_w >= 16 && max_h >= 16 && stats.len() >= 4 {
      return (16, 16);
    }
  }

  let mean_horizontal = stats.iter().map(|s| s.horizontal_variance).sum::<f32>() / stats.len() as f32;
  let mean_vertical = stats.iter().map(|s| s.vertical_variance).sum::<f32>() / stats.len() as f32;

  if mean_variance < SMOOTH_VARIANCE_THRESHOLD * 4.0 {
    if mean_horizontal > mean_vertical * ANISOTROPY_RATIO_THRESHOLD && max_w >= 16 && max_h >= 8 {
      return (8, 16); // (rows=8, cols=16): wide horizontal structure
    }
    if mean_vertical > mean_horizontal * ANISOTROPY_RATIO_THRESHOLD && max_w >= 8 && max_h >= 16 {
      return (16, 8); // (rows=16, cols=8): tall vertical structure
    }
  }

  (8, 8)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn flat_block(rows: usize, cols: usize, value: f32) -> Array2D<f32> {
    Array2D::new_filled(rows, cols, value)
  }

  #[test]
  fn flat_region_promotes_to_32x32() {
    let stats = vec![
      SubBlockStats { variance: 0.0, horizontal_variance: 0.0, vertical_variance: 0.0 };
      16
    ];
    assert_eq!(select_block_shape(&stats, 32, 32), (32, 32));
  }

  #[test]
  fn noisy_region_stays_8x8() {
    let stats = vec![SubBlockStats { variance: 0.5, horizontal_variance: 0.1, vertical_variance: 0.1 }; 4];
    assert_eq!(select_block_shape(&stats, 32, 32), (8, 8));
  }

  #[test]
  fn block_variance_of_a_flat_block_is_zero() {
    let block = flat_block(8, 8, 0.5);
    assert_eq!(block_variance(&block), 0.0);
  }

  #[test]
  fn edge_region_with_insufficient_room_falls_back_to_8x8() {
    let stats = vec![
      SubBlockStats { variance: 0.0, horizontal_variance: 0.0, vertical_variance: 0.0 };
      2
    ];
    // Smooth but only 2 sub-blocks available (e.g. at an image border) —
    // not enough for 16x16 (needs >=4) or 32x32 (needs >=16).
    assert_eq!(select_block_shape(&stats, 32, 32), (8, 8));
  }
}
