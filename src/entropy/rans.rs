//! Single-context rANS encoder/decoder.
//!
//! rANS is a stack machine: encoding walks the symbol sequence in reverse so
//! that decoding, which must run forward, reproduces the symbols in their
//! original order. The renormalisation interval is `[L, L * 256)` with
//! `L = 2^16`, matched to a `PRECISION` of `2^12` so that `L * 256 / PRECISION`
//! stays an exact power of two.

use crate::entropy::distribution::{ANSDistribution, PRECISION};
use crate::error::{JxlError, Result};

const RANS_L: u32 = 1 << 16;

/// Encode `symbols` against `dist`, returning the final state and the
/// renormalisation byte stream separately. Callers that frame the state in
/// their own header (e.g. `interleaved`, which hoists all K states together)
/// use this directly; [`encode`] just concatenates the two for callers that
/// want a single self-contained blob.
pub fn encode_body(symbols: &[usize], dist: &ANSDistribution) -> Result<(u32, Vec<u8>)> {
  let mut state: u32 = RANS_L;
  let mut renorm_bytes: Vec<u8> = Vec::new();

  for &symbol in symbols.iter().rev() {
    let freq = dist.freq(symbol)?;
    if freq == 0 {
      return Err(JxlError::SymbolOutOfRange { symbol, alphabet_size: dist.alphabet_size() });
    }
    let cum_start = dist.cum_start(symbol)?;

    let x_max = (((1u64 << 24) / PRECISION as u64) as u32) * freq;
    while state >= x_max {
      renorm_bytes.push((state & 0xFF) as u8);
      state >>= 8;
    }
    state = (state / freq) * PRECISION + (state % freq) + cum_start;
  }

  renorm_bytes.reverse();
  Ok((state, renorm_bytes))
}

/// Encode `symbols` against a single shared distribution.
///
/// Output layout: 4-byte big-endian final state, followed by the
/// renormalisation byte stream in the order a forward decoder consumes it.
pub fn encode(symbols: &[usize], dist: &ANSDistribution) -> Result<Vec<u8>> {
  let (state, renorm_bytes) = encode_body(symbols, dist)?;
  let mut out = Vec::with_capacity(4 + renorm_bytes.len());
  out.extend_from_slice(&state.to_be_bytes());
  out.extend_from_slice(&renorm_bytes);
  Ok(out)
}

/// Decode exactly `num_symbols` symbols starting from `state`, consuming
/// only as many bytes from the front of `data` as renormalisation actually
/// requires. Returns the symbols and how many bytes were consumed, so a
/// caller can resume reading a shared buffer right after this stream's
/// bytes without knowing their length in advance.
pub fn decode_body(
  data: &[u8],
  mut state: u32,
  dist: &ANSDistribution,
  num_symbols: usize,
) -> Result<(Vec<usize>, usize)> {
  let mut pos = 0;
  let mut out = Vec::with_capacity(num_symbols);

  for i in 0..num_symbols {
    let slot = state % PRECISION;
    let (symbol, freq, cum_start) = dist.lookup(slot);
    state = freq * (state / PRECISION) + slot - cum_start;

    while state < RANS_L {
      if pos < data.len() {
        state = (state << 8) | data[pos] as u32;
        pos += 1;
      } else if i == num_symbols - 1 {
        break;
      } else {
        return Err(JxlError::RansUnderflow { remaining: num_symbols - i - 1 });
      }
    }

    out.push(symbol);
  }

  Ok((out, pos))
}

/// Decode exactly `num_symbols` symbols from `data` against `dist`, reading
/// the initial state from `data`'s leading 4 bytes.
pub fn decode(data: &[u8], dist: &ANSDistribution, num_symbols: usize) -> Result<Vec<usize>> {
  if data.len() < 4 {
    return Err(JxlError::UnexpectedEof);
  }
  let state = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
  let (symbols, _consumed) = decode_body(&data[4..], state, dist, num_symbols)?;
  Ok(symbols)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_a_skewed_alphabet() {
    let symbols: Vec<usize> =
      (0..500).map(|i| if i % 5 == 0 { 1 } else { 0 }).collect();
    let dist = ANSDistribution::from_symbols(&symbols, 3).unwrap();
    let encoded = encode(&symbols, &dist).unwrap();
    let decoded = decode(&encoded, &dist, symbols.len()).unwrap();
    assert_eq!(decoded, symbols);
  }

  #[test]
  fn trivial_single_symbol_distribution_repeats_forever() {
    let dist = ANSDistribution::from_counts(&[7]).unwrap();
    let encoded = encode(&[0, 0, 0, 0], &dist).unwrap();
    // A single-symbol distribution never needs more than the 4-byte state:
    // decoding more repetitions than were encoded must still succeed because
    // the state is a fixed point of the update for the only symbol in scope.
    let decoded = decode(&encoded, &dist, 3).unwrap();
    assert_eq!(decoded, vec![0, 0, 0]);
  }

  #[test]
  fn decode_detects_truncated_stream() {
    let symbols = vec![0usize, 1, 0, 1, 1, 0, 1];
    let dist = ANSDistribution::from_symbols(&symbols, 2).unwrap();
    let mut encoded = encode(&symbols, &dist).unwrap();
    encoded.truncate(4); // keep only the final state, drop all renorm bytes
    assert!(matches!(
      decode(&encoded, &dist, symbols.len()),
      Err(JxlError::RansUnderflow { .. })
    ));
  }

  #[test]
  fn empty_symbol_sequence_round_trips_to_bare_state() {
    let dist = ANSDistribution::from_counts(&[3, 1]).unwrap();
    let encoded = encode(&[], &dist).unwrap();
    assert_eq!(encoded.len(), 4);
    let decoded = decode(&encoded, &dist, 0).unwrap();
    assert!(decoded.is_empty());
  }
}
