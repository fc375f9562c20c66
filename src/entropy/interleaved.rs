//! K-way interleaved rANS streams sharing one distribution.
//!
//! Splitting a long symbol sequence into `K` independently renormalised
//! streams lets a decoder fan the streams out across `K` worker threads.
//! Symbols are assigned to streams round-robin (`symbol i -> stream i % K`),
//! which keeps each stream's local statistics close to the aggregate.

use crate::entropy::distribution::ANSDistribution;
use crate::entropy::rans;
use crate::error::{JxlError, Result};

/// Header: 4-byte big-endian stream count `K`, then K 4-byte big-endian
/// final states (one per stream, in stream order), then the K stream byte
/// blocks concatenated in order — no length fields. A decoder recovers each
/// block's extent the same way single-stream rANS does: it only pulls bytes
/// off the front of the remaining buffer while renormalisation demands it,
/// so it consumes exactly the bytes that stream's encoder emitted and stops
/// there, leaving the next stream's bytes untouched at the front.
pub fn encode(symbols: &[usize], dist: &ANSDistribution, k: usize) -> Result<Vec<u8>> {
  if k == 0 {
    return Err(JxlError::BlockCountMismatch { expected: 1, actual: 0 });
  }

  let mut streams: Vec<Vec<usize>> = vec![Vec::new(); k];
  for (i, &s) in symbols.iter().enumerate() {
    streams[i % k].push(s);
  }

  let mut states = Vec::with_capacity(k);
  let mut bodies = Vec::with_capacity(k);
  for stream in &streams {
    let (state, body) = rans::encode_body(stream, dist)?;
    states.push(state);
    bodies.push(body);
  }

  let mut out = Vec::new();
  out.extend_from_slice(&(k as u32).to_be_bytes());
  for state in &states {
    out.extend_from_slice(&state.to_be_bytes());
  }
  for body in &bodies {
    out.extend_from_slice(body);
  }
  Ok(out)
}

/// Decode `num_symbols` total symbols that were interleaved across `K` streams.
pub fn decode(data: &[u8], dist: &ANSDistribution, num_symbols: usize) -> Result<Vec<usize>> {
  if data.len() < 4 {
    return Err(JxlError::UnexpectedEof);
  }
  let k = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
  if k == 0 {
    return Err(JxlError::BlockCountMismatch { expected: 1, actual: 0 });
  }
  let mut pos = 4;

  let mut states = Vec::with_capacity(k);
  for _ in 0..k {
    if pos + 4 > data.len() {
      return Err(JxlError::UnexpectedEof);
    }
    states.push(u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]));
    pos += 4;
  }

  // stream j gets ceil/floor share of num_symbols: the first (num_symbols % k)
  // streams get one extra symbol.
  let base = num_symbols / k;
  let extra = num_symbols % k;

  let mut stream_symbols: Vec<Vec<usize>> = Vec::with_capacity(k);
  for (j, &state) in states.iter().enumerate() {
    let quota = base + if j < extra { 1 } else { 0 };
    let (symbols, consumed) = rans::decode_body(&data[pos..], state, dist, quota)?;
    pos += consumed;
    stream_symbols.push(symbols);
  }

  let mut out = vec![0usize; num_symbols];
  let mut cursors = vec![0usize; k];
  for i in 0..num_symbols {
    let j = i % k;
    out[i] = stream_symbols[j][cursors[j]];
    cursors[j] += 1;
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_with_four_streams() {
    let symbols: Vec<usize> = (0..97).map(|i| (i * 7) % 5).collect();
    let dist = ANSDistribution::from_symbols(&symbols, 5).unwrap();
    let encoded = encode(&symbols, &dist, 4).unwrap();
    let decoded = decode(&encoded, &dist, symbols.len()).unwrap();
    assert_eq!(decoded, symbols);
  }

  #[test]
  fn single_stream_matches_plain_rans() {
    let symbols: Vec<usize> = vec![0, 1, 1, 0, 1, 0, 0, 1, 1];
    let dist = ANSDistribution::from_symbols(&symbols, 2).unwrap();
    let encoded = encode(&symbols, &dist, 1).unwrap();
    let decoded = decode(&encoded, &dist, symbols.len()).unwrap();
    assert_eq!(decoded, symbols);
  }
}
