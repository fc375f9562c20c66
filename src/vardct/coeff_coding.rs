//! Coefficient ordering and per-block serialisation for the VarDCT
//! pipeline (spec §4.4): zigzag/natural scan, the non-ANS varint block
//! format, and the two-context (DC/AC) ANS coefficient format.
//!
//! The ANS path's alphabet-clamp is spec-mandated and therefore lossy; the
//! orchestration layer only selects it when `distance > 0` (see DESIGN.md),
//! keeping the non-ANS varint path as the exact serialisation used for
//! lossless VarDCT at distance 0.

use crate::array2d::Array2D;
use crate::bitstream::{BitReader, BitWriter};
use crate::entropy::distribution::ANSDistribution;
use crate::entropy::multi_context::StreamingDecoder;
use crate::error::{JxlError, Result};

const END_OF_BLOCK: u64 = 0xFFFF;
const ANS_COEFF_MARKER: u8 = 0x02;
const ANS_ALPHABET: usize = 256;
const DC_CONTEXT: usize = 0;
const AC_CONTEXT: usize = 1;

/// Flatten a quantised coefficient block into scan order (DC first).
pub fn flatten_in_scan_order(block: &Array2D<i32>, scan: &[(u16, u16)]) -> Vec<i32> {
  scan.iter().map(|&(r, c)| block[r as usize][c as usize]).collect()
}

/// Inverse of [`flatten_in_scan_order`]: place scanned coefficients back
/// into their `(row, col)` positions.
pub fn unflatten_from_scan_order(values: &[i32], scan: &[(u16, u16)], rows: usize, cols: usize) -> Array2D<i32> {
  let mut out = Array2D::new_filled(rows, cols, 0i32);
  for (&(r, c), &v) in scan.iter().zip(values) {
    out[r as usize][c as usize] = v;
  }
  out
}

/// Serialise one block's scan-ordered coefficients (`scanned[0]` is DC):
/// DC as a signed varint, then AC as alternating `(zero-run varint,
/// coefficient signed varint)` pairs, terminated by a zero-run of
/// `0xFFFF` meaning "remaining coefficients are zero". The zero-run is
/// always written, even when it is `0`.
pub fn write_block_non_ans(w: &mut BitWriter, scanned: &[i32]) {
  w.write_signed_varint(scanned[0]);
  let ac = &scanned[1..];
  let mut i = 0;
  while i < ac.len() {
    if ac[i..].iter().all(|&v| v == 0) {
      w.write_varint(END_OF_BLOCK);
      return;
    }
    let mut run = 0u64;
    while ac[i] == 0 {
      run += 1;
      i += 1;
    }
    w.write_varint(run);
    w.write_signed_varint(ac[i]);
    i += 1;
  }
  w.write_varint(END_OF_BLOCK);
}

/// Read one block's scan-ordered coefficients written by
/// [`write_block_non_ans`]; `ac_len` is the number of AC positions
/// (`block_len - 1`).
pub fn read_block_non_ans(r: &mut BitReader, ac_len: usize) -> Result<Vec<i32>> {
  let mut scanned = Vec::with_capacity(ac_len + 1);
  scanned.push(r.read_signed_varint()?);
  let mut remaining = ac_len;
  loop {
    let run = r.read_varint()?;
    if run == END_OF_BLOCK {
      break;
    }
    let run = run as usize;
    if run > remaining {
      return Err(JxlError::MalformedCoefficients { block_index: 0 });
    }
    for _ in 0..run {
      scanned.push(0);
    }
    remaining -= run;
    if remaining == 0 {
      return Err(JxlError::MalformedCoefficients { block_index: 0 });
    }
    let coeff = r.read_signed_varint()?;
    scanned.push(coeff);
    remaining -= 1;
  }
  while scanned.len() < ac_len + 1 {
    scanned.push(0);
  }
  Ok(scanned)
}

fn clamp_to_alphabet(symbol: u32) -> usize {
  (symbol as usize).min(ANS_ALPHABET - 1)
}

/// Encode a set of blocks' scan-ordered coefficients with the two-context
/// (DC/AC) ANS format. `blocks[i][0]` is that block's DC; the rest are AC
/// in scan order. Values whose zigzag-mapped magnitude exceeds the
/// alphabet are clamped per spec, so this path is lossy for those values —
/// callers must not select it at distance 0.
pub fn encode_blocks_ans(blocks: &[Vec<i32>]) -> Result<Vec<u8>> {
  let mut symbols = Vec::new();
  let mut contexts = Vec::new();
  for block in blocks {
    symbols.push(clamp_to_alphabet(crate::util::zigzag_encode(block[0])));
    contexts.push(DC_CONTEXT);
    for &ac in &block[1..] {
      symbols.push(clamp_to_alphabet(crate::util::zigzag_encode(ac)));
      contexts.push(AC_CONTEXT);
    }
  }

  let dc_symbols: Vec<usize> = symbols.iter().zip(&contexts).filter(|(_, &c)| c == DC_CONTEXT).map(|(&s, _)| s).collect();
  let ac_symbols: Vec<usize> = symbols.iter().zip(&contexts).filter(|(_, &c)| c == AC_CONTEXT).map(|(&s, _)| s).collect();

  let dc_dist = ANSDistribution::from_symbols(&dc_symbols, ANS_ALPHABET)?;
  let ac_dist =
    if ac_symbols.is_empty() { ANSDistribution::from_counts(&[1])? } else { ANSDistribution::from_symbols(&ac_symbols, ANS_ALPHABET)? };
  let dists = [dc_dist, ac_dist];

  let payload = crate::entropy::multi_context::encode(&symbols, &contexts, &dists)?;

  let mut out = Vec::new();
  out.push(ANS_COEFF_MARKER);
  out.extend_from_slice(&(blocks.len() as u32).to_be_bytes());
  for dist in &dists {
    let serialized = dist.serialize(1);
    crate::util::write_leb128(&mut out, serialized.len());
    out.extend_from_slice(&serialized);
  }
  out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
  out.extend_from_slice(&payload);
  Ok(out)
}

fn leb128_len(data: &[u8]) -> usize {
  let mut n = 0;
  for &b in data {
    n += 1;
    if b & 0x80 == 0 {
      break;
    }
  }
  n
}

/// Decode the ANS coefficient format, splitting the flat symbol stream
/// back into per-block `(1 + ac_len)`-length vectors.
pub fn decode_blocks_ans(data: &[u8], ac_len: usize) -> Result<Vec<Vec<i32>>> {
  if data.is_empty() || data[0] != ANS_COEFF_MARKER {
    return Err(JxlError::MissingAnsMarker);
  }
  let mut pos = 1;
  if pos + 4 > data.len() {
    return Err(JxlError::UnexpectedEof);
  }
  let block_count = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
  pos += 4;

  let mut dists = Vec::with_capacity(2);
  for _ in 0..2 {
    let mut r = BitReader::new(&data[pos..]);
    let len = r.read_varint()? as usize;
    pos += leb128_len(&data[pos..]);
    if pos + len > data.len() {
      return Err(JxlError::UnexpectedEof);
    }
    let (dist, consumed) = ANSDistribution::deserialize(&data[pos..pos + len])?;
    if consumed != len {
      return Err(JxlError::TruncatedHeader { expected: len, actual: consumed });
    }
    dists.push(dist);
    pos += len;
  }

  if pos + 4 > data.len() {
    return Err(JxlError::UnexpectedEof);
  }
  let payload_len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
  pos += 4;
  if pos + payload_len > data.len() {
    return Err(JxlError::UnexpectedEof);
  }
  let payload = &data[pos..pos + payload_len];

  let total_symbols = block_count * (ac_len + 1);
  let mut decoder = StreamingDecoder::new(payload, total_symbols)?;
  let mut blocks = Vec::with_capacity(block_count);
  for _ in 0..block_count {
    let mut block = Vec::with_capacity(ac_len + 1);
    let dc_token = decoder.decode_one(DC_CONTEXT, &dists)?;
    block.push(crate::util::zigzag_decode(dc_token as u32));
    for _ in 0..ac_len {
      let ac_token = decoder.decode_one(AC_CONTEXT, &dists)?;
      block.push(crate::util::zigzag_decode(ac_token as u32));
    }
    blocks.push(block);
  }
  Ok(blocks)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::consts::zigzag_scan_order;

  #[test]
  fn flatten_unflatten_round_trips_through_zigzag_order() {
    let scan = zigzag_scan_order(8, 8);
    let mut block = Array2D::new_filled(8, 8, 0i32);
    for r in 0..8 {
      for c in 0..8 {
        block[r][c] = (r * 8 + c) as i32 - 32;
      }
    }
    let flat = flatten_in_scan_order(&block, &scan);
    let back = unflatten_from_scan_order(&flat, &scan, 8, 8);
    for r in 0..8 {
      for c in 0..8 {
        assert_eq!(back[r][c], block[r][c]);
      }
    }
  }

  #[test]
  fn non_ans_block_round_trips_with_interior_zero_runs() {
    let scanned = vec![5i32, 0, 0, 3, 0, -2, 0, 0, 0, 0];
    let mut w = BitWriter::new();
    write_block_non_ans(&mut w, &scanned);
    let bytes = w.finalize();
    let mut r = BitReader::new(&bytes);
    let decoded = read_block_non_ans(&mut r, scanned.len() - 1).unwrap();
    assert_eq!(decoded, scanned);
  }

  #[test]
  fn non_ans_all_zero_ac_round_trips() {
    let scanned = vec![7i32, 0, 0, 0, 0];
    let mut w = BitWriter::new();
    write_block_non_ans(&mut w, &scanned);
    let bytes = w.finalize();
    let mut r = BitReader::new(&bytes);
    let decoded = read_block_non_ans(&mut r, scanned.len() - 1).unwrap();
    assert_eq!(decoded, scanned);
  }

  #[test]
  fn ans_coefficient_coding_round_trips_small_values() {
    let blocks = vec![vec![3i32, 0, -1, 2, 0], vec![-4i32, 1, 0, 0, 0], vec![0i32, 0, 0, 0, 0]];
    let encoded = encode_blocks_ans(&blocks).unwrap();
    let decoded = decode_blocks_ans(&encoded, 4).unwrap();
    assert_eq!(decoded, blocks);
  }
}
