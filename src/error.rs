//! Error taxonomy for the codec core.
//!
//! Every variant corresponds to one failure mode named in the specification's
//! error-handling design: signature/format, dimensioning, header parse,
//! entropy, bitstream, and block-data errors. Leaf components return these
//! unchanged; nothing is silently recovered except the one documented case
//! in `JxlError::RansUnderflow` handling (see `entropy::rans`).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, JxlError>;

#[derive(Debug, Error)]
pub enum JxlError {
  // --- Signature / format ---
  #[error("invalid codestream signature: expected FF 0A, found {0:02X?}")]
  InvalidSignature([u8; 2]),

  #[error("unknown ISOBMFF box type: {0:?}")]
  UnknownBox([u8; 4]),

  #[error("container has no `jxlc` box")]
  MissingCodestreamBox,

  #[error("box of type {box_type:?} claims size {claimed} but only {available} bytes remain")]
  BoxExtendsPastEnd { box_type: [u8; 4], claimed: usize, available: usize },

  // --- Dimensioning ---
  #[error("width or height is zero")]
  ZeroDimension,

  #[error("dimension {axis} = {value} exceeds the per-axis cap of {cap}")]
  DimensionTooLarge { axis: &'static str, value: usize, cap: usize },

  #[error("pixel count {pixels} exceeds the cap of {cap}")]
  TooManyPixels { pixels: u64, cap: u64 },

  // --- Header parse ---
  #[error("header is missing required field: {0}")]
  MissingField(&'static str),

  #[error("header truncated: expected at least {expected} bytes, got {actual}")]
  TruncatedHeader { expected: usize, actual: usize },

  #[error("unknown format version: {0}")]
  UnknownVersion(u8),

  #[error("unknown encoding mode tag: {0}")]
  UnknownEncodingMode(u8),

  // --- Entropy ---
  #[error("distribution has no symbols")]
  EmptyDistribution,

  #[error("distribution frequencies sum to {actual}, expected {expected}")]
  DistributionSumMismatch { expected: u32, actual: u32 },

  #[error("symbol {symbol} is out of range for an alphabet of size {alphabet_size}")]
  SymbolOutOfRange { symbol: usize, alphabet_size: usize },

  #[error("unknown distribution serialisation mode: {0}")]
  UnknownDistributionMode(u8),

  #[error("context {context} is out of range for {context_count} contexts")]
  ContextOutOfRange { context: usize, context_count: usize },

  #[error("rANS state underflowed with {remaining} symbols still expected")]
  RansUnderflow { remaining: usize },

  #[error("invalid LZ77 distance {distance} (window so far: {available})")]
  InvalidLz77Distance { distance: usize, available: usize },

  #[error("invalid LZ77 match length {0}")]
  InvalidLz77Length(usize),

  #[error("unknown LZ77 token marker: {0}")]
  UnknownLz77Marker(u8),

  // --- Bitstream ---
  #[error("varint would overflow 64 bits")]
  VarintOverflow,

  #[error("unexpected end of bitstream")]
  UnexpectedEof,

  #[error("expected byte-alignment padding bits to be zero")]
  InvalidPadding,

  // --- Block data ---
  #[error("malformed coefficient stream at block {block_index}")]
  MalformedCoefficients { block_index: usize },

  #[error("expected {expected} blocks, found {actual}")]
  BlockCountMismatch { expected: usize, actual: usize },

  #[error("missing ANS marker byte for coefficient stream")]
  MissingAnsMarker,

  #[error(transparent)]
  Io(#[from] std::io::Error),
}
