//! Reversible YCoCg-R colour transform used by the modular pipeline.
//!
//! Integer-exact lifting steps guarantee bit-exact round trips, unlike the
//! float YCbCr matrix used by the VarDCT side.

use crate::array2d::Array2D;

/// Chroma channels are signed; this bias recenters them into `u16` storage.
pub const CHROMA_STORAGE_BIAS: i32 = 32768;

/// Forward transform: (R, G, B) -> (Y, Co, Cg).
pub fn forward_pixel(r: i32, g: i32, b: i32) -> (i32, i32, i32) {
  let co = r - b;
  let t = b + (co >> 1);
  let cg = g - t;
  let y = t + (cg >> 1);
  (y, co, cg)
}

/// Inverse transform: (Y, Co, Cg) -> (R, G, B).
pub fn inverse_pixel(y: i32, co: i32, cg: i32) -> (i32, i32, i32) {
  let t = y - (cg >> 1);
  let g = cg + t;
  let b = t - (co >> 1);
  let r = co + b;
  (r, g, b)
}

pub fn encode_chroma_storage(value: i32) -> u16 {
  (value + CHROMA_STORAGE_BIAS) as u16
}

pub fn decode_chroma_storage(stored: u16) -> i32 {
  stored as i32 - CHROMA_STORAGE_BIAS
}

/// Apply the forward transform across whole R/G/B planes, producing signed
/// planes (Y unsigned range, Co/Cg signed) ready for prediction.
pub fn forward_frame(r: &Array2D<u16>, g: &Array2D<u16>, b: &Array2D<u16>) -> (Array2D<i32>, Array2D<i32>, Array2D<i32>) {
  let (rows, cols) = (r.rows(), r.cols());
  let mut y_plane = Array2D::new_filled(rows, cols, 0i32);
  let mut co_plane = Array2D::new_filled(rows, cols, 0i32);
  let mut cg_plane = Array2D::new_filled(rows, cols, 0i32);

  for row in 0..rows {
    for col in 0..cols {
      let (y, co, cg) = forward_pixel(r[row][col] as i32, g[row][col] as i32, b[row][col] as i32);
      y_plane[row][col] = y;
      co_plane[row][col] = co;
      cg_plane[row][col] = cg;
    }
  }
  (y_plane, co_plane, cg_plane)
}

pub fn inverse_frame(y: &Array2D<i32>, co: &Array2D<i32>, cg: &Array2D<i32>) -> (Array2D<u16>, Array2D<u16>, Array2D<u16>) {
  let (rows, cols) = (y.rows(), y.cols());
  let mut r_plane = Array2D::new_filled(rows, cols, 0u16);
  let mut g_plane = Array2D::new_filled(rows, cols, 0u16);
  let mut b_plane = Array2D::new_filled(rows, cols, 0u16);

  for row in 0..rows {
    for col in 0..cols {
      let (r, g, b) = inverse_pixel(y[row][col], co[row][col], cg[row][col]);
      r_plane[row][col] = r as u16;
      g_plane[row][col] = g as u16;
      b_plane[row][col] = b as u16;
    }
  }
  (r_plane, g_plane, b_plane)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_every_corner_of_the_8_bit_cube() {
    for &r in &[0i32, 1, 127, 128, 255] {
      for &g in &[0i32, 1, 127, 128, 255] {
        for &b in &[0i32, 1, 127, 128, 255] {
          let (y, co, cg) = forward_pixel(r, g, b);
          let (rr, gg, bb) = inverse_pixel(y, co, cg);
          assert_eq!((r, g, b), (rr, gg, bb));
        }
      }
    }
  }

  #[test]
  fn chroma_storage_bias_round_trips_negative_values() {
    for v in [-32768i32, -1, 0, 1, 32767] {
      assert_eq!(decode_chroma_storage(encode_chroma_storage(v)), v);
    }
  }

  #[test]
  fn frame_round_trip_matches_pixelwise_transform() {
    let r = Array2D::new_filled(2, 2, 10u16);
    let g = Array2D::new_filled(2, 2, 200u16);
    let b = Array2D::new_filled(2, 2, 77u16);
    let (y, co, cg) = forward_frame(&r, &g, &b);
    let (rr, gg, bb) = inverse_frame(&y, &co, &cg);
    for row in 0..2 {
      for col in 0..2 {
        assert_eq!(rr[row][col], r[row][col]);
        assert_eq!(gg[row][col], g[row][col]);
        assert_eq!(bb[row][col], b[row][col]);
      }
    }
  }
}
