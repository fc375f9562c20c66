//! Multi-context rANS: each symbol is coded against the distribution owned
//! by its context. Contexts are supplied by the caller (derived causally by
//! the modular pipeline, or chosen explicitly by the VarDCT coefficient
//! coder) and must be reproducible bit-for-bit during decode.

use crate::entropy::distribution::{ANSDistribution, PRECISION};
use crate::error::{JxlError, Result};

const RANS_L: u32 = 1 << 16;

/// Encode `symbols`, each coded against `dists[contexts[i]]`.
///
/// A single rANS state is shared across all contexts: the stack-machine
/// property still holds because decode replays the same context sequence in
/// the same (reverse-of-reverse = forward) order.
pub fn encode(symbols: &[usize], contexts: &[usize], dists: &[ANSDistribution]) -> Result<Vec<u8>> {
  if symbols.len() != contexts.len() {
    return Err(JxlError::BlockCountMismatch { expected: symbols.len(), actual: contexts.len() });
  }

  let mut state: u32 = RANS_L;
  let mut renorm_bytes: Vec<u8> = Vec::new();

  for i in (0..symbols.len()).rev() {
    let ctx = contexts[i];
    let dist = dists
      .get(ctx)
      .ok_or(JxlError::ContextOutOfRange { context: ctx, context_count: dists.len() })?;
    let symbol = symbols[i];
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
  let mut out = Vec::with_capacity(4 + renorm_bytes.len());
  out.extend_from_slice(&state.to_be_bytes());
  out.extend_from_slice(&renorm_bytes);
  Ok(out)
}

/// Decode `contexts.len()` symbols, one per supplied context.
pub fn decode(data: &[u8], contexts: &[usize], dists: &[ANSDistribution]) -> Result<Vec<usize>> {
  if data.len() < 4 {
    return Err(JxlError::UnexpectedEof);
  }
  let mut state = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
  let mut pos = 4;
  let mut out = Vec::with_capacity(contexts.len());
  let num_symbols = contexts.len();

  for (i, &ctx) in contexts.iter().enumerate() {
    let dist = dists
      .get(ctx)
      .ok_or(JxlError::ContextOutOfRange { context: ctx, context_count: dists.len() })?;

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

  Ok(out)
}

/// Pull-based decoder for callers that must derive each symbol's context
/// from previously-decoded output (the modular pipeline's causal
/// neighbourhood) rather than supplying the full context array up front.
pub struct StreamingDecoder<'a> {
  data: &'a [u8],
  pos: usize,
  state: u32,
  total_symbols: usize,
  decoded: usize,
}

impl<'a> StreamingDecoder<'a> {
  pub fn new(data: &'a [u8], total_symbols: usize) -> Result<Self> {
    if data.len() < 4 {
      return Err(JxlError::UnexpectedEof);
    }
    let state = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    Ok(Self { data, pos: 4, state, total_symbols, decoded: 0 })
  }

  pub fn decode_one(&mut self, context: usize, dists: &[ANSDistribution]) -> Result<usize> {
    let dist = dists
      .get(context)
      .ok_or(JxlError::ContextOutOfRange { context, context_count: dists.len() })?;

    let slot = self.state % PRECISION;
    let (symbol, freq, cum_start) = dist.lookup(slot);
    self.state = freq * (self.state / PRECISION) + slot - cum_start;

    let is_last = self.decoded + 1 == self.total_symbols;
    while self.state < RANS_L {
      if self.pos < self.data.len() {
        self.state = (self.state << 8) | self.data[self.pos] as u32;
        self.pos += 1;
      } else if is_last {
        break;
      } else {
        return Err(JxlError::RansUnderflow { remaining: self.total_symbols - self.decoded - 1 });
      }
    }

    self.decoded += 1;
    Ok(symbol)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_with_two_alternating_contexts() {
    let dist_a = ANSDistribution::from_counts(&[1, 9]).unwrap();
    let dist_b = ANSDistribution::from_counts(&[9, 1]).unwrap();
    let dists = vec![dist_a, dist_b];

    let contexts: Vec<usize> = (0..40).map(|i| i % 2).collect();
    let symbols: Vec<usize> = contexts.iter().map(|&c| if c == 0 { 1 } else { 0 }).collect();

    let encoded = encode(&symbols, &contexts, &dists).unwrap();
    let decoded = decode(&encoded, &contexts, &dists).unwrap();
    assert_eq!(decoded, symbols);
  }

  #[test]
  fn rejects_context_out_of_range() {
    let dists = vec![ANSDistribution::from_counts(&[1]).unwrap()];
    let result = encode(&[0], &[1], &dists);
    assert!(matches!(result, Err(JxlError::ContextOutOfRange { context: 1, context_count: 1 })));
  }

  #[test]
  fn streaming_decoder_matches_batch_decoder_for_causally_chosen_contexts() {
    let dist_a = ANSDistribution::from_counts(&[1, 9]).unwrap();
    let dist_b = ANSDistribution::from_counts(&[9, 1]).unwrap();
    let dists = vec![dist_a, dist_b];

    let contexts: Vec<usize> = (0..40).map(|i| i % 2).collect();
    let symbols: Vec<usize> = contexts.iter().map(|&c| if c == 0 { 1 } else { 0 }).collect();
    let encoded = encode(&symbols, &contexts, &dists).unwrap();

    let mut decoder = StreamingDecoder::new(&encoded, symbols.len()).unwrap();
    let mut decoded = Vec::new();
    for &ctx in &contexts {
      decoded.push(decoder.decode_one(ctx, &dists).unwrap());
    }
    assert_eq!(decoded, symbols);
  }
}
