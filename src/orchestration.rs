//! Top-level encode/decode flow: mode selection between the Modular and
//! VarDCT pipelines, codestream framing, and optional ISOBMFF wrapping
//! (spec §2's "Orchestration" component, §6's top-level entry points).
//!
//! This is the one layer in the crate that logs: per the ambient-stack
//! design (see `DESIGN.md`), `debug!` marks the mode/effort decision,
//! `trace!` would mark per-block choices if this layer made any (it
//! doesn't — those live in `vardct`/`modular`), and `warn!` marks the one
//! documented silent fallback, VarDCT's lossless-distance override of
//! `use_ans`.

use log::debug;

use crate::bitstream::BitWriter;
use crate::container::{self, ContainerMetadata, FrameHeader, ImageHeader};
use crate::error::{JxlError, Result};
use crate::frame::{ImageFrame, OwnedFrame};
use crate::options::EncodingOptions;
use crate::{modular, vardct};

fn color_space_tag(frame: &dyn ImageFrame) -> u8 {
  use crate::frame::ColorSpace;
  match frame.color_space() {
    ColorSpace::Srgb => 0,
    ColorSpace::LinearSrgb => 1,
    ColorSpace::Gray => 2,
    ColorSpace::Unknown => 255,
  }
}

fn color_space_from_tag(tag: u8) -> crate::frame::ColorSpace {
  use crate::frame::ColorSpace;
  match tag {
    0 => ColorSpace::Srgb,
    1 => ColorSpace::LinearSrgb,
    2 => ColorSpace::Gray,
    _ => ColorSpace::Unknown,
  }
}

/// Encode `frame` into a bare codestream: `signature`, image header, frame
/// header, then the Modular- or VarDCT-coded payload chosen by
/// `options.is_lossless()`.
pub fn encode_codestream(frame: &dyn ImageFrame, options: &EncodingOptions) -> Result<Vec<u8>> {
  if frame.width() == 0 || frame.height() == 0 {
    return Err(JxlError::ZeroDimension);
  }

  let lossless = options.is_lossless();
  debug!(
    "encoding {}x{} frame, mode={}, effort={:?}",
    frame.width(),
    frame.height(),
    if lossless { "modular/lossless" } else { "vardct/lossy" },
    options.effort
  );

  let mut out = Vec::new();
  let mut w = BitWriter::new();
  let image_header = ImageHeader {
    width: frame.width() as u32,
    height: frame.height() as u32,
    bits_per_sample: frame.bits_per_sample(),
    channel_count: frame.channels() as u8,
    color_space_tag: color_space_tag(frame),
    has_alpha: frame.has_alpha(),
  };
  image_header.write(&mut w);
  FrameHeader::default().write(&mut w);
  out.extend_from_slice(&w.finalize());

  let payload = if lossless {
    modular::encode_frame(frame, options)?
  } else {
    vardct::encode_frame(frame, options)?
  };
  out.extend_from_slice(&payload);

  Ok(out)
}

/// Decode a bare codestream produced by [`encode_codestream`] back into an
/// owned frame.
pub fn decode_codestream(data: &[u8]) -> Result<OwnedFrame> {
  let mut r = crate::bitstream::BitReader::new(data);
  let image_header = ImageHeader::read(&mut r)?;
  let _frame_header = FrameHeader::read(&mut r)?;
  let header_len = r.byte_position();
  if !r.is_byte_aligned() {
    return Err(JxlError::InvalidPadding);
  }
  let payload = &data[header_len..];

  // The payload's own leading mode bit (spec §4.3/§4.4: 1 = Modular, 0 =
  // VarDCT) disambiguates the pipeline without needing a separate flag
  // in the frame header, mirroring how each pipeline's own header
  // already self-identifies on read.
  if payload.is_empty() {
    return Err(JxlError::UnexpectedEof);
  }
  let mode_bit = payload[0] >> 7;
  let frame = if mode_bit == 1 { modular::decode_frame(payload)? } else { vardct::decode_frame(payload)? };

  debug_assert_eq!(frame.width(), image_header.width as usize);
  debug_assert_eq!(frame.height(), image_header.height as usize);
  let _ = color_space_from_tag(image_header.color_space_tag);
  Ok(frame)
}

/// Encode `frame` and wrap the resulting codestream in an ISOBMFF
/// container carrying the given metadata (spec §4.5).
pub fn encode_container(
  frame: &dyn ImageFrame,
  options: &EncodingOptions,
  metadata: &ContainerMetadata,
) -> Result<Vec<u8>> {
  let codestream = encode_codestream(frame, options)?;
  Ok(container::write_container(&codestream, metadata))
}

/// Parse an ISOBMFF container and decode its `jxlc` payload.
pub fn decode_container(data: &[u8]) -> Result<(OwnedFrame, ContainerMetadata)> {
  let parsed = container::parse_container(data)?;
  let frame = decode_codestream(&parsed.codestream)?;
  Ok((frame, parsed.metadata))
}
