//! Codestream framing and the ISOBMFF container (spec §4.5): the bare
//! codestream signature and image header, the per-frame header, and the
//! box layout a `.jxl` file uses when it wraps the codestream together
//! with metadata (Exif/XML/ICC) and an optional frame index.

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{JxlError, Result};
use crate::isobmff::{ISOBMFFReader, ISOBMFFWriter};

pub const SIGNATURE: [u8; 2] = [0xFF, 0x0A];

/// The simplified image header that follows the signature: `total 14
/// bytes` together with the 2-byte signature (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
  pub width: u32,
  pub height: u32,
  pub bits_per_sample: u8,
  pub channel_count: u8,
  pub color_space_tag: u8,
  pub has_alpha: bool,
}

impl ImageHeader {
  pub fn write(&self, w: &mut BitWriter) {
    w.write_byte(SIGNATURE[0]);
    w.write_byte(SIGNATURE[1]);
    w.write_u32(self.width);
    w.write_u32(self.height);
    w.write_byte(self.bits_per_sample);
    w.write_byte(self.channel_count);
    w.write_byte(self.color_space_tag);
    w.write_bit(self.has_alpha as u32);
    w.flush_byte();
  }

  pub fn read(r: &mut BitReader) -> Result<Self> {
    let sig0 = r.read_byte()?;
    let sig1 = r.read_byte()?;
    if [sig0, sig1] != SIGNATURE {
      return Err(JxlError::InvalidSignature([sig0, sig1]));
    }
    let width = r.read_u32()?;
    let height = r.read_u32()?;
    let bits_per_sample = r.read_byte()?;
    let channel_count = r.read_byte()?;
    let color_space_tag = r.read_byte()?;
    let has_alpha = r.read_bit()? != 0;
    r.skip_to_byte_alignment();
    if channel_count == 0 {
      return Err(JxlError::MissingField("channel_count"));
    }
    Ok(Self { width, height, bits_per_sample, channel_count, color_space_tag, has_alpha })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
  Replace,
  Add,
  Blend,
  MulAdd,
}

impl BlendMode {
  fn to_bits(self) -> u32 {
    match self {
      BlendMode::Replace => 0,
      BlendMode::Add => 1,
      BlendMode::Blend => 2,
      BlendMode::MulAdd => 3,
    }
  }
  fn from_bits(bits: u32) -> Self {
    match bits {
      0 => BlendMode::Replace,
      1 => BlendMode::Add,
      2 => BlendMode::Blend,
      _ => BlendMode::MulAdd,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
  pub x0: u32,
  pub y0: u32,
  pub width: u32,
  pub height: u32,
}

/// The per-frame header (spec §4.5). `all_default` collapses every field
/// below to the defaults named in the spec (regular VarDCT, replace blend,
/// no duration, last frame, no reference, no name, no crop, 1 pass, 1
/// group) and the header occupies exactly one byte.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameHeader {
  pub frame_type: u8,
  pub is_vardct: bool,
  pub blend_mode: Option<BlendMode>,
  pub duration: Option<u32>,
  pub is_last: bool,
  pub save_as_reference: Option<u8>,
  pub name: Option<String>,
  pub crop: Option<Crop>,
  pub pass_count: u8,
  pub group_count: u16,
}

impl Default for FrameHeader {
  fn default() -> Self {
    Self {
      frame_type: 0,
      is_vardct: true,
      blend_mode: None,
      duration: None,
      is_last: true,
      save_as_reference: None,
      name: None,
      crop: None,
      pass_count: 1,
      group_count: 1,
    }
  }
}

impl FrameHeader {
  fn is_all_default(&self) -> bool {
    *self == Self::default()
  }

  pub fn write(&self, w: &mut BitWriter) {
    if self.is_all_default() {
      w.write_bit(1);
      w.flush_byte();
      return;
    }
    w.write_bit(0);
    w.write_bits(self.frame_type as u64, 2);
    w.write_bit(!self.is_vardct as u32);
    w.write_bits(0, 2); // reserved

    match self.blend_mode {
      Some(mode) => {
        w.write_bit(1);
        w.write_bits(mode.to_bits() as u64, 2);
      }
      None => w.write_bit(0),
    }

    match self.duration {
      Some(d) => {
        w.write_bit(1);
        w.write_u32(d);
      }
      None => w.write_bit(0),
    }

    w.write_bit(self.is_last as u32);

    match self.save_as_reference {
      Some(slot) => {
        w.write_bit(1);
        w.write_bits(slot as u64, 2);
      }
      None => w.write_bit(0),
    }

    match &self.name {
      Some(name) => {
        w.write_bit(1);
        let bytes = name.as_bytes();
        w.write_bits(bytes.len() as u64, 16);
        w.flush_byte();
        w.write_data(bytes);
      }
      None => w.write_bit(0),
    }

    match self.crop {
      Some(c) => {
        w.write_bit(1);
        w.write_u32(c.x0);
        w.write_u32(c.y0);
        w.write_u32(c.width);
        w.write_u32(c.height);
      }
      None => w.write_bit(0),
    }

    if self.pass_count != 1 {
      w.write_bit(1);
      w.write_bits(self.pass_count as u64, 8);
    } else {
      w.write_bit(0);
    }

    w.write_bits(self.group_count as u64, 16);
  }

  pub fn read(r: &mut BitReader) -> Result<Self> {
    let all_default = r.read_bit()?;
    if all_default != 0 {
      r.skip_to_byte_alignment();
      return Ok(Self::default());
    }

    let frame_type = r.read_bits(2)? as u8;
    let encoding_is_modular = r.read_bit()? != 0;
    let _reserved = r.read_bits(2)?;

    let blend_mode = if r.read_bit()? != 0 { Some(BlendMode::from_bits(r.read_bits(2)? as u32)) } else { None };

    let duration = if r.read_bit()? != 0 { Some(r.read_u32()?) } else { None };

    let is_last = r.read_bit()? != 0;

    let save_as_reference = if r.read_bit()? != 0 { Some(r.read_bits(2)? as u8) } else { None };

    let name = if r.read_bit()? != 0 {
      let len = r.read_bits(16)? as usize;
      r.skip_to_byte_alignment();
      let bytes = r.read_bytes(len)?;
      Some(String::from_utf8_lossy(bytes).into_owned())
    } else {
      None
    };

    let crop = if r.read_bit()? != 0 {
      Some(Crop { x0: r.read_u32()?, y0: r.read_u32()?, width: r.read_u32()?, height: r.read_u32()? })
    } else {
      None
    };

    let pass_count = if r.read_bit()? != 0 { r.read_bits(8)? as u8 } else { 1 };

    let group_count = r.read_bits(16)? as u16;

    Ok(Self {
      frame_type,
      is_vardct: !encoding_is_modular,
      blend_mode,
      duration,
      is_last,
      save_as_reference,
      name,
      crop,
      pass_count,
      group_count,
    })
  }
}

/// One `jxli` frame-index entry: 16 bytes (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameIndexEntry {
  pub frame_number: u32,
  pub byte_offset: u64,
  pub duration: u32,
}

impl FrameIndexEntry {
  const ENCODED_LEN: usize = 16;

  fn write(&self, out: &mut Vec<u8>) {
    out.extend_from_slice(&self.frame_number.to_be_bytes());
    out.extend_from_slice(&self.byte_offset.to_be_bytes());
    out.extend_from_slice(&self.duration.to_be_bytes());
  }

  fn read(data: &[u8]) -> Result<Self> {
    if data.len() < Self::ENCODED_LEN {
      return Err(JxlError::TruncatedHeader { expected: Self::ENCODED_LEN, actual: data.len() });
    }
    let frame_number = u32::from_be_bytes(data[0..4].try_into().unwrap());
    let byte_offset = u64::from_be_bytes(data[4..12].try_into().unwrap());
    let duration = u32::from_be_bytes(data[12..16].try_into().unwrap());
    Ok(Self { frame_number, byte_offset, duration })
  }
}

/// Optional metadata to wrap alongside the bare codestream when producing
/// an ISOBMFF container (spec §4.5). Every field is independently
/// optional; a well-formed container always carries exactly one `jxlc`.
#[derive(Debug, Clone, Default)]
pub struct ContainerMetadata {
  pub exif: Option<Vec<u8>>,
  pub xml: Option<Vec<u8>>,
  pub colr: Option<Vec<u8>>,
  pub frame_index: Option<Vec<FrameIndexEntry>>,
  pub level: Option<u8>,
}

/// A parsed container: the bare codestream plus whatever metadata boxes
/// were present. Fields are `None`/empty exactly when the corresponding
/// box was absent.
#[derive(Debug, Clone, Default)]
pub struct ParsedContainer {
  pub codestream: Vec<u8>,
  pub metadata: ContainerMetadata,
}

const FTYP_BRAND: &[u8; 4] = b"JXL ";

/// Wrap a bare codestream in the ISOBMFF box sequence: `signature`,
/// `ftyp`, `jxlc`, then any metadata boxes present.
pub fn write_container(codestream: &[u8], metadata: &ContainerMetadata) -> Vec<u8> {
  let mut w = ISOBMFFWriter::new();
  {
    let mut b = w.open_box(b"JXL ");
    b.write_bytes(&[0x0D, 0x0A, 0x87, 0x0A]);
  }
  {
    let mut b = w.open_box(b"ftyp");
    b.write_bytes(FTYP_BRAND);
    b.write_u32(0);
    b.write_bytes(FTYP_BRAND);
  }
  {
    let mut b = w.open_box(b"jxlc");
    b.write_bytes(codestream);
  }
  if let Some(exif) = &metadata.exif {
    let mut b = w.open_box(b"Exif");
    b.write_bytes(exif);
  }
  if let Some(xml) = &metadata.xml {
    let mut b = w.open_box(b"xml ");
    b.write_bytes(xml);
  }
  if let Some(colr) = &metadata.colr {
    let mut b = w.open_box(b"colr");
    b.write_bytes(colr);
  }
  if let Some(entries) = &metadata.frame_index {
    let mut b = w.open_box(b"jxli");
    let mut payload = Vec::with_capacity(entries.len() * FrameIndexEntry::ENCODED_LEN);
    for e in entries {
      e.write(&mut payload);
    }
    b.write_bytes(&payload);
  }
  if let Some(level) = metadata.level {
    let mut b = w.open_box(b"jxll");
    b.write_u8(level);
  }
  Vec::from(w.finalize())
}

/// Parse a well-formed ISOBMFF container back into its bare codestream and
/// metadata. Fails if no `jxlc` box is present.
pub fn parse_container(data: &[u8]) -> Result<ParsedContainer> {
  let boxes = ISOBMFFReader::new(data).read_all()?;
  let mut result = ParsedContainer::default();
  let mut found_codestream = false;

  for b in &boxes {
    match &b.box_type {
      b"jxlc" => {
        result.codestream = b.payload.to_vec();
        found_codestream = true;
      }
      b"Exif" => result.metadata.exif = Some(b.payload.to_vec()),
      b"xml " => result.metadata.xml = Some(b.payload.to_vec()),
      b"colr" => result.metadata.colr = Some(b.payload.to_vec()),
      b"jxli" => {
        let mut entries = Vec::new();
        let mut pos = 0;
        while pos + FrameIndexEntry::ENCODED_LEN <= b.payload.len() {
          entries.push(FrameIndexEntry::read(&b.payload[pos..])?);
          pos += FrameIndexEntry::ENCODED_LEN;
        }
        result.metadata.frame_index = Some(entries);
      }
      b"jxll" => {
        if b.payload.is_empty() {
          return Err(JxlError::TruncatedHeader { expected: 1, actual: 0 });
        }
        result.metadata.level = Some(b.payload[0]);
      }
      b"JXL " | b"ftyp" => {} // recognised, but carry no data this crate consumes
      other => return Err(JxlError::UnknownBox(*other)),
    }
  }

  if !found_codestream {
    return Err(JxlError::MissingCodestreamBox);
  }
  Ok(result)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn image_header_round_trips_and_totals_fourteen_bytes() {
    let header =
      ImageHeader { width: 1920, height: 1080, bits_per_sample: 8, channel_count: 3, color_space_tag: 0, has_alpha: false };
    let mut w = BitWriter::new();
    header.write(&mut w);
    let bytes = w.finalize();
    assert_eq!(bytes.len(), 14);
    assert_eq!(&bytes[0..2], &SIGNATURE);

    let mut r = BitReader::new(&bytes);
    let decoded = ImageHeader::read(&mut r).unwrap();
    assert_eq!(decoded, header);
  }

  #[test]
  fn image_header_rejects_bad_signature() {
    let bytes = [0x00u8, 0x01, 0, 0, 0, 1, 0, 0, 0, 1, 8, 1, 0, 0];
    let mut r = BitReader::new(&bytes);
    let result = ImageHeader::read(&mut r);
    assert!(matches!(result, Err(JxlError::InvalidSignature(_))));
  }

  #[test]
  fn default_frame_header_round_trips_as_a_single_byte() {
    let header = FrameHeader::default();
    let mut w = BitWriter::new();
    header.write(&mut w);
    let bytes = w.finalize();
    assert_eq!(bytes.len(), 1);

    let mut r = BitReader::new(&bytes);
    let decoded = FrameHeader::read(&mut r).unwrap();
    assert_eq!(decoded, header);
  }

  #[test]
  fn non_default_frame_header_round_trips_every_field() {
    let header = FrameHeader {
      frame_type: 2,
      is_vardct: false,
      blend_mode: Some(BlendMode::Blend),
      duration: Some(42),
      is_last: false,
      save_as_reference: Some(1),
      name: Some("hello".to_string()),
      crop: Some(Crop { x0: 1, y0: 2, width: 100, height: 200 }),
      pass_count: 3,
      group_count: 4,
    };
    let mut w = BitWriter::new();
    header.write(&mut w);
    let bytes = w.finalize();

    let mut r = BitReader::new(&bytes);
    let decoded = FrameHeader::read(&mut r).unwrap();
    assert_eq!(decoded, header);
  }

  #[test]
  fn container_round_trips_codestream_and_metadata() {
    let codestream = vec![0xFFu8, 0x0A, 1, 2, 3, 4, 5];
    let metadata = ContainerMetadata {
      exif: Some(vec![9, 9, 9]),
      xml: None,
      colr: Some(vec![1, 2, 3, 4]),
      frame_index: Some(vec![FrameIndexEntry { frame_number: 0, byte_offset: 14, duration: 100 }]),
      level: Some(5),
    };
    let bytes = write_container(&codestream, &metadata);
    let parsed = parse_container(&bytes).unwrap();
    assert_eq!(parsed.codestream, codestream);
    assert_eq!(parsed.metadata.exif, Some(vec![9, 9, 9]));
    assert_eq!(parsed.metadata.xml, None);
    assert_eq!(parsed.metadata.colr, Some(vec![1, 2, 3, 4]));
    assert_eq!(parsed.metadata.frame_index.unwrap()[0].duration, 100);
    assert_eq!(parsed.metadata.level, Some(5));
  }

  /// Boundary scenario from spec §8 #6: a well-formed file with boxes
  /// `[signature, ftyp, jxlc]` returns a container whose `codestream` is
  /// the `jxlc` payload and whose metadata fields are all nil.
  #[test]
  fn container_with_only_signature_ftyp_jxlc_has_nil_metadata() {
    let codestream = vec![0xFFu8, 0x0A, 7, 7, 7];
    let bytes = write_container(&codestream, &ContainerMetadata::default());
    let parsed = parse_container(&bytes).unwrap();
    assert_eq!(parsed.codestream, codestream);
    assert!(parsed.metadata.exif.is_none());
    assert!(parsed.metadata.xml.is_none());
    assert!(parsed.metadata.colr.is_none());
    assert!(parsed.metadata.frame_index.is_none());
    assert!(parsed.metadata.level.is_none());
  }

  #[test]
  fn container_without_jxlc_box_fails() {
    let mut w = ISOBMFFWriter::new();
    {
      let mut b = w.open_box(b"ftyp");
      b.write_bytes(FTYP_BRAND);
    }
    let bytes = w.finalize();
    let result = parse_container(&bytes);
    assert!(matches!(result, Err(JxlError::MissingCodestreamBox)));
  }

  #[test]
  fn container_with_unrecognised_box_type_fails() {
    let mut w = ISOBMFFWriter::new();
    {
      let mut b = w.open_box(b"jxlc");
      b.write_bytes(&[0xFF, 0x0A, 1, 2, 3]);
    }
    {
      let mut b = w.open_box(b"zzzz");
      b.write_bytes(&[1, 2, 3]);
    }
    let bytes = w.finalize();
    let result = parse_container(&bytes);
    assert!(matches!(result, Err(JxlError::UnknownBox(b)) if &b == b"zzzz"));
  }

  #[test]
  fn image_header_with_zero_channel_count_fails() {
    let mut w = BitWriter::new();
    w.write_byte(SIGNATURE[0]);
    w.write_byte(SIGNATURE[1]);
    w.write_u32(4);
    w.write_u32(4);
    w.write_byte(8);
    w.write_byte(0); // channel_count
    w.write_byte(0);
    w.write_bit(0);
    w.flush_byte();
    let bytes = w.finalize();
    let mut r = BitReader::new(&bytes);
    let result = ImageHeader::read(&mut r);
    assert!(matches!(result, Err(JxlError::MissingField("channel_count"))));
  }
}
