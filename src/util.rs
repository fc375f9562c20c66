// Small numeric and bit-twiddling helpers shared across the codec.

use std::io::prelude::*;

use byteorder::WriteBytesExt;

/// Clamp `value` into `[lo, hi]`.
pub fn clamp<T: PartialOrd>(value: T, lo: T, hi: T) -> T {
  if value < lo {
    lo
  } else if value > hi {
    hi
  } else {
    value
  }
}

/// Write a value in LEB128 format: 7 value bits per byte, MSB continuation
/// flag, little-endian group order.
pub fn write_leb128<W: Write>(w: &mut W, mut value: usize) {
  if value == 0 {
    w.write_u8(0).unwrap();
    return;
  }

  while value != 0 {
    let more_flag = if (value >> 7) > 0 { 0x80 } else { 0x00 };
    w.write_u8(more_flag | (value & 0x7F) as u8).unwrap();
    value >>= 7;
  }
}

/// Write `data` prefixed by its own LEB128-encoded length; the inverse of
/// reading a `read_varint` length followed by that many `read_bytes`.
pub fn leb128_prefixed(data: &[u8]) -> Vec<u8> {
  let mut out = Vec::with_capacity(data.len() + 5);
  write_leb128(&mut out, data.len());
  out.extend_from_slice(data);
  out
}

/// Map a signed residual to an unsigned symbol: `v >= 0 -> 2v`, `v < 0 -> -2v - 1`.
/// Used by every signed-varint and signed-residual field in both pipelines.
pub fn zigzag_encode(v: i32) -> u32 {
  ((v << 1) ^ (v >> 31)) as u32
}

/// Inverse of [`zigzag_encode`].
pub fn zigzag_decode(u: u32) -> i32 {
  ((u >> 1) as i32) ^ -((u & 1) as i32)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clamp_bounds() {
    assert_eq!(clamp(5, 0, 10), 5);
    assert_eq!(clamp(-5, 0, 10), 0);
    assert_eq!(clamp(15, 0, 10), 10);
  }

  #[test]
  fn zigzag_round_trips_and_is_bijective_onto_non_negatives() {
    for v in [-1_000_000i32, -2, -1, 0, 1, 2, 1_000_000, i32::MIN, i32::MAX] {
      assert_eq!(zigzag_decode(zigzag_encode(v)), v);
    }
    assert_eq!(zigzag_encode(0), 0);
    assert_eq!(zigzag_encode(-1), 1);
    assert_eq!(zigzag_encode(1), 2);
    assert_eq!(zigzag_encode(-2), 3);
  }
}
