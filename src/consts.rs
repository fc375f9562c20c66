// Shared numeric constants: coefficient scan orders and the XYB opsin matrix.
//
// The 8x8 zigzag order below is pinned to the literal table in the
// specification glossary and is covered by a unit test; scan orders for
// other block shapes are generated by the same diagonal zigzag procedure,
// generalized to non-square extents.

/// Generate a zigzag scan order for an `rows x cols` block using the same
/// diagonal traversal that produces the canonical 8x8 table.
pub fn zigzag_scan_order(rows: usize, cols: usize) -> Vec<(u16, u16)> {
  let mut order = Vec::with_capacity(rows * cols);
  let mut row = 0i64;
  let mut col = 0i64;
  let mut going_up = true;

  let r_max = rows as i64 - 1;
  let c_max = cols as i64 - 1;

  for _ in 0..(rows * cols) {
    order.push((row as u16, col as u16));

    if going_up {
      if col == c_max {
        row += 1;
        going_up = false;
      } else if row == 0 {
        col += 1;
        going_up = false;
      } else {
        row -= 1;
        col += 1;
      }
    } else if row == r_max {
      col += 1;
      going_up = true;
    } else if col == 0 {
      row += 1;
      going_up = true;
    } else {
      row += 1;
      col -= 1;
    }
  }

  order
}

/// Natural frequency order: sort positions by `u^2 + v^2`, ties broken by
/// row then column.
pub fn natural_scan_order(rows: usize, cols: usize) -> Vec<(u16, u16)> {
  let mut positions: Vec<(u16, u16)> = Vec::with_capacity(rows * cols);
  for r in 0..rows {
    for c in 0..cols {
      positions.push((r as u16, c as u16));
    }
  }
  positions.sort_by_key(|&(r, c)| ((r as u32) * (r as u32) + (c as u32) * (c as u32), r, c));
  positions
}

/// Admissible VarDCT block shapes (height, width), with stable integer tags.
pub const BLOCK_SHAPES: [(usize, usize); 9] = [
  (8, 8),
  (16, 16),
  (32, 32),
  (16, 8),
  (8, 16),
  (32, 8),
  (8, 32),
  (32, 16),
  (16, 32),
];

pub fn block_shape_tag(h: usize, w: usize) -> Option<u8> {
  BLOCK_SHAPES.iter().position(|&(sh, sw)| sh == h && sw == w).map(|i| i as u8)
}

pub fn block_shape_from_tag(tag: u8) -> Option<(usize, usize)> {
  BLOCK_SHAPES.get(tag as usize).copied()
}

/// XYB opsin absorbance matrix, row-major, applied to linear RGB to obtain (L, M, S).
pub const OPSIN_ABSORBANCE_MATRIX: [[f32; 3]; 3] = [
  [0.30078125, 0.63046875, 0.06875],
  [0.23046875, 0.69531250, 0.07421875],
  [0.24218750, 0.07812500, 0.67968750],
];

/// Cube-root transfer bias `b` used by `f(x) = cbrt(max(0, x) + b) - cbrt(b)`.
pub const XYB_TRANSFER_BIAS: f32 = 0.00379246;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zigzag_8x8_matches_spec_table() {
    let expected: [(u16, u16); 64] = [
      (0, 0), (0, 1), (1, 0), (2, 0), (1, 1), (0, 2), (0, 3), (1, 2), (2, 1), (3, 0), (4, 0),
      (3, 1), (2, 2), (1, 3), (0, 4), (0, 5), (1, 4), (2, 3), (3, 2), (4, 1), (5, 0), (6, 0),
      (5, 1), (4, 2), (3, 3), (2, 4), (1, 5), (0, 6), (0, 7), (1, 6), (2, 5), (3, 4), (4, 3),
      (5, 2), (6, 1), (7, 0), (7, 1), (6, 2), (5, 3), (4, 4), (3, 5), (2, 6), (1, 7), (2, 7),
      (3, 6), (4, 5), (5, 4), (6, 3), (7, 2), (7, 3), (6, 4), (5, 5), (4, 6), (3, 7), (4, 7),
      (5, 6), (6, 5), (7, 4), (7, 5), (6, 6), (5, 7), (6, 7), (7, 6), (7, 7),
    ];
    assert_eq!(zigzag_scan_order(8, 8), expected.to_vec());
  }

  #[test]
  fn zigzag_is_a_permutation() {
    let order = zigzag_scan_order(8, 8);
    let mut seen = vec![false; 64];
    for &(r, c) in &order {
      let idx = (r as usize) * 8 + c as usize;
      assert!(!seen[idx], "duplicate position in zigzag order");
      seen[idx] = true;
    }
    assert!(seen.iter().all(|&b| b));
  }

  #[test]
  fn natural_order_is_a_permutation() {
    let order = natural_scan_order(8, 16);
    let mut seen = vec![false; 8 * 16];
    for &(r, c) in &order {
      let idx = (r as usize) * 16 + c as usize;
      assert!(!seen[idx]);
      seen[idx] = true;
    }
    assert!(seen.iter().all(|&b| b));
  }
}
