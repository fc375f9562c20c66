//! The VarDCT (lossy) pipeline: colour transform, content-adaptive block
//! grid, separable DCT, chroma-from-luma, adaptive quantisation with DC
//! prediction, and coefficient serialisation with optional progressive
//! passes (spec §4.4).
//!
//! At `distance == 0.0` the ANS coefficient path's alphabet clamp (spec
//! §4.4) would silently lose precision, so the frame-level encoder always
//! falls back to the exact non-ANS varint serialisation in that case
//! regardless of `EncodingOptions::use_ans`, to honour the "lossless
//! distance" contract tested at the orchestration layer (see DESIGN.md).

pub mod blockgrid;
pub mod cfl;
pub mod coeff_coding;
pub mod colour;
pub mod dct;
pub mod quant;

use crate::array2d::Array2D;
use crate::bitstream::{BitReader, BitWriter};
use crate::consts::{self, zigzag_scan_order};
use crate::error::{JxlError, Result};
use crate::frame::{ImageFrame, OwnedFrame, PixelType};
use crate::options::EncodingOptions;
use std::collections::HashMap;

const VERSION: u8 = 1;
pub const COLOUR_TRANSFORM_YCBCR: u8 = 0;
pub const COLOUR_TRANSFORM_XYB: u8 = 1;
pub const COLOUR_TRANSFORM_NONE: u8 = 2;

#[derive(Debug, Clone, Copy)]
pub struct VarDctHeader {
  pub width: u32,
  pub height: u32,
  pub channels: u8,
  pub distance: f32,
  pub adaptive_quant: bool,
  pub use_ans: bool,
  pub pixel_type: u8,
  pub colour_transform: u8,
  pub variable_block: bool,
  pub pass_count: u8,
}

impl VarDctHeader {
  pub fn write(&self, w: &mut BitWriter) {
    w.write_bit(0); // mode bit: 0 = VarDCT
    w.flush_byte();
    w.write_byte(VERSION);
    w.write_u32(self.width);
    w.write_u32(self.height);
    w.write_byte(self.channels);
    w.write_u32(self.distance.to_bits());
    let mut flags = 0u8;
    if self.adaptive_quant {
      flags |= 1;
    }
    if self.use_ans {
      flags |= 2;
    }
    w.write_byte(flags);
    w.write_byte(self.pixel_type);
    w.write_byte(self.colour_transform);
    w.write_byte(self.variable_block as u8);
    w.write_byte(self.pass_count);
  }

  pub fn read(r: &mut BitReader) -> Result<Self> {
    let mode = r.read_bit()?;
    if mode != 0 {
      return Err(JxlError::UnknownEncodingMode(mode as u8));
    }
    r.skip_to_byte_alignment();
    let version = r.read_byte()?;
    if version != VERSION {
      return Err(JxlError::UnknownVersion(version));
    }
    let width = r.read_u32()?;
    let height = r.read_u32()?;
    let channels = r.read_byte()?;
    let distance = f32::from_bits(r.read_u32()?);
    let flags = r.read_byte()?;
    let pixel_type = r.read_byte()?;
    let colour_transform = r.read_byte()?;
    let variable_block = r.read_byte()? != 0;
    let pass_count = r.read_byte()?;
    Ok(Self {
      width,
      height,
      channels,
      distance,
      adaptive_quant: flags & 1 != 0,
      use_ans: flags & 2 != 0,
      pixel_type,
      colour_transform,
      variable_block,
      pass_count,
    })
  }
}

#[derive(Debug, Clone, Copy)]
pub struct BlockSpec {
  pub row: usize,
  pub col: usize,
  pub height: usize,
  pub width: usize,
}

fn pad_up(value: usize, to: usize) -> usize {
  value.div_ceil(to) * to
}

fn build_fixed_grid(padded_rows: usize, padded_cols: usize) -> Vec<BlockSpec> {
  let mut grid = Vec::new();
  let mut row = 0;
  while row < padded_rows {
    let mut col = 0;
    while col < padded_cols {
      grid.push(BlockSpec { row, col, height: 8, width: 8 });
      col += 8;
    }
    row += 8;
  }
  grid
}

fn build_variable_grid(luma_norm: &Array2D<f32>, padded_rows: usize, padded_cols: usize) -> Vec<BlockSpec> {
  let mut grid = Vec::new();
  let mut mb_row = 0;
  while mb_row < padded_rows {
    let mut mb_col = 0;
    while mb_col < padded_cols {
      let mut stats = Vec::with_capacity(16);
      for sr in (0..32).step_by(8) {
        for sc in (0..32).step_by(8) {
          let r0 = mb_row + sr;
          let c0 = mb_col + sc;
          if r0 >= padded_rows || c0 >= padded_cols {
            continue;
          }
          let sub = extract_clamped(luma_norm, r0, c0, 8, 8);
          stats.push(blockgrid::sub_block_stats(&sub));
        }
      }
      let (h, w) = blockgrid::select_block_shape(&stats, 32, 32);
      let mut br = 0;
      while br < 32 && mb_row + br < padded_rows {
        let mut bc = 0;
        while bc < 32 && mb_col + bc < padded_cols {
          grid.push(BlockSpec { row: mb_row + br, col: mb_col + bc, height: h, width: w });
          bc += w;
        }
        br += h;
      }
      mb_col += 32;
    }
    mb_row += 32;
  }
  grid
}

fn extract_clamped(channel: &Array2D<f32>, row: usize, col: usize, h: usize, w: usize) -> Array2D<f32> {
  let (rows, cols) = (channel.rows(), channel.cols());
  let mut out = Array2D::new_filled(h, w, 0.0f32);
  for r in 0..h {
    for c in 0..w {
      let sr = (row + r).min(rows - 1);
      let sc = (col + c).min(cols - 1);
      out[r][c] = channel[sr][sc];
    }
  }
  out
}

fn place_clamped(channel: &mut Array2D<f32>, row: usize, col: usize, block: &Array2D<f32>) {
  let (rows, cols) = (channel.rows(), channel.cols());
  for r in 0..block.rows() {
    for c in 0..block.cols() {
      let tr = row + r;
      let tc = col + c;
      if tr < rows && tc < cols {
        channel[tr][tc] = block[r][c];
      }
    }
  }
}

struct BlockData {
  spec: BlockSpec,
  coeffs: Array2D<f32>,
  scale: f32,
  q_base: f32,
  alpha_q: i32,
}

#[allow(clippy::too_many_arguments)]
fn compute_block_data(
  spec: BlockSpec,
  channel_norm: &Array2D<f32>,
  channel_real: &Array2D<f32>,
  base_distance: f32,
  roi: Option<&crate::options::RegionOfInterest>,
  luma_coeffs: Option<&Array2D<f32>>,
  is_chroma: bool,
) -> BlockData {
  let norm_block = extract_clamped(channel_norm, spec.row, spec.col, spec.height, spec.width);
  let activity = quant::activity(&norm_block);
  let scale = quant::activity_scale(activity, quant::DEFAULT_STRENGTH, quant::DEFAULT_KAPPA);

  let px = spec.col + spec.width / 2;
  let py = spec.row + spec.height / 2;
  let multiplier = roi.map_or(1.0, |r| r.distance_multiplier(px, py));
  let q_base = quant::q_base(base_distance * multiplier);

  let real_block = extract_clamped(channel_real, spec.row, spec.col, spec.height, spec.width);
  let mut coeffs = dct::forward_dct2d(&real_block);

  let alpha_q = if let (true, Some(luma)) = (is_chroma, luma_coeffs) {
    let alpha = cfl::fit_alpha(luma, &coeffs);
    let q = cfl::quantize_alpha(alpha);
    coeffs = cfl::subtract_predicted(luma, &coeffs, cfl::dequantize_alpha(q));
    q
  } else {
    0
  };

  BlockData { spec, coeffs, scale, q_base, alpha_q }
}

fn cell_grid_dims(padded_rows: usize, padded_cols: usize) -> (usize, usize) {
  (padded_rows / 8, padded_cols / 8)
}

fn predict_and_residualize(blocks: &[BlockData], is_chroma: bool, padded_rows: usize, padded_cols: usize) -> Vec<Vec<i32>> {
  let (cell_rows, cell_cols) = cell_grid_dims(padded_rows, padded_cols);
  let mut dc_cells: Array2D<Option<i32>> = Array2D::new_filled(cell_rows, cell_cols, None);
  let mut out = Vec::with_capacity(blocks.len());

  for b in blocks {
    let scan = zigzag_scan_order(b.spec.height, b.spec.width);
    let levels = quant::quantize_block(&b.coeffs, b.q_base, b.scale, is_chroma);
    let mut scanned = coeff_coding::flatten_in_scan_order(&levels, &scan);

    let cell_row = b.spec.row / 8;
    let cell_col = b.spec.col / 8;
    let predicted = quant::predict_dc(&dc_cells, cell_row, cell_col);
    let absolute_dc = scanned[0];
    scanned[0] = absolute_dc - predicted;

    for r in cell_row..(cell_row + b.spec.height / 8).min(cell_rows) {
      for c in cell_col..(cell_col + b.spec.width / 8).min(cell_cols) {
        dc_cells[r][c] = Some(absolute_dc);
      }
    }
    out.push(scanned);
  }
  out
}

fn reconstruct_dc(blocks_spec: &[BlockSpec], scanned: &mut [Vec<i32>], padded_rows: usize, padded_cols: usize) {
  let (cell_rows, cell_cols) = cell_grid_dims(padded_rows, padded_cols);
  let mut dc_cells: Array2D<Option<i32>> = Array2D::new_filled(cell_rows, cell_cols, None);

  for (spec, scanned_block) in blocks_spec.iter().zip(scanned.iter_mut()) {
    let cell_row = spec.row / 8;
    let cell_col = spec.col / 8;
    let predicted = quant::predict_dc(&dc_cells, cell_row, cell_col);
    let absolute_dc = predicted + scanned_block[0];
    scanned_block[0] = absolute_dc;

    for r in cell_row..(cell_row + spec.height / 8).min(cell_rows) {
      for c in cell_col..(cell_col + spec.width / 8).min(cell_cols) {
        dc_cells[r][c] = Some(absolute_dc);
      }
    }
  }
}

/// Proportional AC pass boundary within a block's AC range (`ac_len =
/// h*w - 1`): for the canonical `8x8` block this lands on exactly the
/// spec's `1..16` / `16..64` split; other shapes scale the same quarter
/// split to their own coefficient count.
fn ac_pass_boundary(total_len: usize) -> usize {
  if total_len == 64 {
    15 // ac index 0..15 is scan positions 1..16
  } else {
    ((total_len as f32 / 4.0).round() as usize).clamp(1, total_len - 1).saturating_sub(1).max(1)
  }
}

fn write_dc_stream(out: &mut Vec<u8>, dc_residuals: &[i32], use_ans: bool) -> Result<()> {
  if use_ans {
    let blocks: Vec<Vec<i32>> = dc_residuals.iter().map(|&v| vec![v]).collect();
    let encoded = coeff_coding::encode_blocks_ans(&blocks)?;
    crate::util::write_leb128(out, encoded.len());
    out.extend_from_slice(&encoded);
  } else {
    let mut w = BitWriter::new();
    w.write_varint(dc_residuals.len() as u64);
    for &v in dc_residuals {
      w.write_signed_varint(v);
    }
    let bytes = w.finalize();
    crate::util::write_leb128(out, bytes.len());
    out.extend_from_slice(&bytes);
  }
  Ok(())
}

fn read_dc_stream(r: &mut BitReader, use_ans: bool) -> Result<Vec<i32>> {
  let len = r.read_varint()? as usize;
  let bytes = r.read_bytes(len)?;
  if use_ans {
    let blocks = coeff_coding::decode_blocks_ans(bytes, 0)?;
    Ok(blocks.into_iter().map(|b| b[0]).collect())
  } else {
    let mut inner = BitReader::new(bytes);
    let count = inner.read_varint()? as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
      out.push(inner.read_signed_varint()?);
    }
    Ok(out)
  }
}

fn write_ac_groups(out: &mut Vec<u8>, specs: &[BlockSpec], ac_slices: &[&[i32]], use_ans: bool) -> Result<()> {
  let mut groups: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
  for (i, s) in specs.iter().enumerate() {
    groups.entry((s.height, s.width)).or_default().push(i);
  }
  let mut shape_keys: Vec<(usize, usize)> = groups.keys().copied().collect();
  shape_keys.sort();

  let mut w = BitWriter::new();
  w.write_varint(shape_keys.len() as u64);
  for shape in shape_keys {
    let indices = &groups[&shape];
    let tag = consts::block_shape_tag(shape.0, shape.1).ok_or(JxlError::MalformedCoefficients { block_index: 0 })?;
    w.write_byte(tag);
    w.write_varint(indices.len() as u64);
    for &idx in indices {
      w.write_varint(idx as u64);
    }
    let blocks: Vec<Vec<i32>> = indices.iter().map(|&i| {
      let mut v = Vec::with_capacity(ac_slices[i].len() + 1);
      v.push(0);
      v.extend_from_slice(ac_slices[i]);
      v
    }).collect();
    if use_ans {
      let encoded = coeff_coding::encode_blocks_ans(&blocks)?;
      w.write_data(&crate::util::leb128_prefixed(&encoded));
    } else {
      let mut inner = BitWriter::new();
      for block in &blocks {
        coeff_coding::write_block_non_ans(&mut inner, block);
      }
      w.write_data(&crate::util::leb128_prefixed(&inner.finalize()));
    }
  }
  let bytes = w.finalize();
  crate::util::write_leb128(out, bytes.len());
  out.extend_from_slice(&bytes);
  Ok(())
}

/// Returns, for every block index (in grid order), its decoded AC slice.
fn read_ac_groups(r: &mut BitReader, ac_len_of: impl Fn(usize) -> usize, block_count: usize, use_ans: bool) -> Result<Vec<Vec<i32>>> {
  let outer_len = r.read_varint()? as usize;
  let outer_bytes = r.read_bytes(outer_len)?;
  let mut inner_r = BitReader::new(outer_bytes);

  let mut result: Vec<Option<Vec<i32>>> = vec![None; block_count];
  let group_count = inner_r.read_varint()?;
  for _ in 0..group_count {
    let tag = inner_r.read_byte()?;
    let (h, w) = consts::block_shape_from_tag(tag).ok_or(JxlError::MalformedCoefficients { block_index: 0 })?;
    let ac_len = h * w - 1;
    let index_count = inner_r.read_varint()? as usize;
    let mut indices = Vec::with_capacity(index_count);
    for _ in 0..index_count {
      indices.push(inner_r.read_varint()? as usize);
    }
    let body_len = inner_r.read_varint()? as usize;
    let body = inner_r.read_bytes(body_len)?;
    if use_ans {
      let blocks = coeff_coding::decode_blocks_ans(body, ac_len)?;
      for (&idx, block) in indices.iter().zip(blocks) {
        result[idx] = Some(block[1..].to_vec());
      }
    } else {
      let mut body_r = BitReader::new(body);
      for &idx in &indices {
        let block = coeff_coding::read_block_non_ans(&mut body_r, ac_len)?;
        result[idx] = Some(block[1..].to_vec());
      }
    }
    let _ = ac_len_of; // shape-derived ac_len is authoritative; kept for signature symmetry
  }

  result.into_iter().enumerate().map(|(i, v)| v.ok_or(JxlError::MalformedCoefficients { block_index: i })).collect()
}

#[allow(clippy::too_many_arguments)]
fn encode_channel_vardct(
  blocks: &[BlockData],
  is_chroma: bool,
  padded_rows: usize,
  padded_cols: usize,
  use_ans: bool,
  pass_count: u8,
) -> Result<Vec<u8>> {
  let scanned = predict_and_residualize(blocks, is_chroma, padded_rows, padded_cols);
  let specs: Vec<BlockSpec> = blocks.iter().map(|b| b.spec).collect();

  let mut out = Vec::new();

  // Pass 0: side info (scale + CfL alpha, chroma only) and DC residuals.
  out.push(0u8);
  for b in blocks {
    out.extend_from_slice(&b.scale.to_bits().to_be_bytes());
    if is_chroma {
      let mut w = BitWriter::new();
      w.write_signed_varint(b.alpha_q);
      out.extend_from_slice(&w.finalize());
    }
  }
  let dc_residuals: Vec<i32> = scanned.iter().map(|s| s[0]).collect();
  write_dc_stream(&mut out, &dc_residuals, use_ans)?;

  if pass_count <= 1 {
    let ac_slices: Vec<&[i32]> = scanned.iter().map(|s| &s[1..]).collect();
    out.push(1u8);
    write_ac_groups(&mut out, &specs, &ac_slices, use_ans)?;
  } else {
    // Pass 1: ac index 0..boundary2 (within the AC-only slice).
    let boundary2: Vec<usize> = blocks.iter().map(|b| ac_pass_boundary(b.spec.height * b.spec.width)).collect();
    let pass1_slices: Vec<&[i32]> = scanned.iter().zip(&boundary2).map(|(s, &b2)| &s[1..1 + b2]).collect();
    out.push(1u8);
    write_ac_groups(&mut out, &specs, &pass1_slices, use_ans)?;

    let pass2_slices: Vec<&[i32]> = scanned.iter().zip(&boundary2).map(|(s, &b2)| &s[1 + b2..]).collect();
    out.push(2u8);
    write_ac_groups(&mut out, &specs, &pass2_slices, use_ans)?;
  }

  Ok(out)
}

fn decode_channel_vardct(
  data: &[u8],
  specs: &[BlockSpec],
  is_chroma: bool,
  padded_rows: usize,
  padded_cols: usize,
  use_ans: bool,
  pass_count: u8,
) -> Result<(Vec<Vec<i32>>, Vec<f32>, Vec<i32>)> {
  let mut r = BitReader::new(data);

  let pass0_idx = r.read_byte()?;
  if pass0_idx != 0 {
    return Err(JxlError::MalformedCoefficients { block_index: 0 });
  }
  let mut scales = Vec::with_capacity(specs.len());
  let mut alpha_qs = Vec::with_capacity(specs.len());
  for _ in specs {
    let bits = r.read_bytes(4)?;
    scales.push(f32::from_bits(u32::from_be_bytes([bits[0], bits[1], bits[2], bits[3]])));
    if is_chroma {
      alpha_qs.push(r.read_signed_varint()?);
    } else {
      alpha_qs.push(0);
    }
  }
  let dc_residuals = read_dc_stream(&mut r, use_ans)?;

  let ac_len_of = |i: usize| specs[i].height * specs[i].width - 1;
  let mut scanned: Vec<Vec<i32>> = Vec::with_capacity(specs.len());

  if pass_count <= 1 {
    let pass1_idx = r.read_byte()?;
    if pass1_idx != 1 {
      return Err(JxlError::MalformedCoefficients { block_index: 0 });
    }
    let acs = read_ac_groups(&mut r, ac_len_of, specs.len(), use_ans)?;
    for (dc, ac) in dc_residuals.into_iter().zip(acs) {
      let mut v = Vec::with_capacity(ac.len() + 1);
      v.push(dc);
      v.extend(ac);
      scanned.push(v);
    }
  } else {
    let pass1_idx = r.read_byte()?;
    if pass1_idx != 1 {
      return Err(JxlError::MalformedCoefficients { block_index: 0 });
    }
    let acs1 = read_ac_groups(&mut r, ac_len_of, specs.len(), use_ans)?;
    let pass2_idx = r.read_byte()?;
    if pass2_idx != 2 {
      return Err(JxlError::MalformedCoefficients { block_index: 0 });
    }
    let acs2 = read_ac_groups(&mut r, ac_len_of, specs.len(), use_ans)?;
    for ((dc, a1), a2) in dc_residuals.into_iter().zip(acs1).zip(acs2) {
      let mut v = Vec::with_capacity(a1.len() + a2.len() + 1);
      v.push(dc);
      v.extend(a1);
      v.extend(a2);
      scanned.push(v);
    }
  }

  reconstruct_dc(specs, &mut scanned, padded_rows, padded_cols);
  Ok((scanned, scales, alpha_qs))
}

fn max_value_for(pixel_type: PixelType) -> f32 {
  match pixel_type {
    PixelType::Uint8 => 65535.0,
    PixelType::Uint16 => 65535.0,
    PixelType::Float32 => 65535.0,
  }
}

/// Encode a frame with the VarDCT pipeline end to end.
pub fn encode_frame(frame: &dyn ImageFrame, options: &EncodingOptions) -> Result<Vec<u8>> {
  let (width, height) = (frame.width(), frame.height());
  let channels = frame.channels();
  let distance = options.distance();
  let colour_transform = if channels >= 3 {
    match options.colour_transform {
      crate::options::ColourTransform::Xyb => COLOUR_TRANSFORM_XYB,
      crate::options::ColourTransform::YCbCr => COLOUR_TRANSFORM_YCBCR,
    }
  } else {
    COLOUR_TRANSFORM_NONE
  };
  let use_ans = options.use_ans && distance > 0.0;
  let pass_count = if options.progressive { 3 } else { 1 };
  let align = if options.variable_block_size { 32 } else { 8 };
  let (padded_rows, padded_cols) = (pad_up(height, align), pad_up(width, align));

  let mut raw_channels: Vec<Array2D<f32>> = Vec::with_capacity(channels);
  for c in 0..channels {
    let mut plane = Array2D::new_filled(height, width, 0.0f32);
    for y in 0..height {
      for x in 0..width {
        plane[y][x] = frame.get_pixel(x, y, c) as f32;
      }
    }
    raw_channels.push(plane);
  }

  if channels >= 3 && colour_transform != COLOUR_TRANSFORM_NONE {
    for y in 0..height {
      for x in 0..width {
        let (r, g, b) = (raw_channels[0][y][x], raw_channels[1][y][x], raw_channels[2][y][x]);
        let (a, bb, c) = if colour_transform == COLOUR_TRANSFORM_XYB {
          colour::xyb_forward(r, g, b)
        } else {
          colour::ycbcr_forward(r, g, b)
        };
        raw_channels[0][y][x] = a;
        raw_channels[1][y][x] = bb;
        raw_channels[2][y][x] = c;
      }
    }
  }

  let max_value = max_value_for(frame.pixel_type());
  let padded_channels: Vec<Array2D<f32>> =
    raw_channels.iter().map(|ch| extract_clamped(ch, 0, 0, padded_rows, padded_cols)).collect();
  let normalized_channels: Vec<Array2D<f32>> =
    padded_channels.iter().map(|ch| { let mut n = ch.clone(); n.map(|_, _, v| v / max_value); n }).collect();

  let grid = if options.variable_block_size {
    build_variable_grid(&normalized_channels[0], padded_rows, padded_cols)
  } else {
    build_fixed_grid(padded_rows, padded_cols)
  };

  let mut out = Vec::new();
  let mut w = BitWriter::new();
  let header = VarDctHeader {
    width: width as u32,
    height: height as u32,
    channels: channels as u8,
    distance,
    adaptive_quant: options.adaptive_quantization,
    use_ans,
    pixel_type: pixel_type_tag(frame.pixel_type()),
    colour_transform,
    variable_block: options.variable_block_size,
    pass_count,
  };
  header.write(&mut w);
  out.extend_from_slice(&w.finalize());

  if options.variable_block_size {
    let mut gw = BitWriter::new();
    gw.write_varint(grid.len() as u64);
    for b in &grid {
      let tag = consts::block_shape_tag(b.height, b.width).ok_or(JxlError::MalformedCoefficients { block_index: 0 })?;
      gw.write_byte(tag);
    }
    let bytes = gw.finalize();
    crate::util::write_leb128(&mut out, bytes.len());
    out.extend_from_slice(&bytes);
  }

  let mut luma_coeffs_by_block: Option<Vec<Array2D<f32>>> = None;
  for c in 0..channels {
    let is_chroma = (c == 1 || c == 2) && colour_transform != COLOUR_TRANSFORM_NONE;
    let mut blocks = Vec::with_capacity(grid.len());
    for (i, &spec) in grid.iter().enumerate() {
      let luma_ref = if is_chroma { luma_coeffs_by_block.as_ref().map(|v| &v[i]) } else { None };
      let bd = compute_block_data(
        spec,
        &normalized_channels[c],
        &padded_channels[c],
        distance,
        options.region_of_interest.as_ref(),
        luma_ref,
        is_chroma,
      );
      blocks.push(bd);
    }
    if c == 0 {
      luma_coeffs_by_block = Some(blocks.iter().map(|b| b.coeffs.clone()).collect());
    }
    let encoded = encode_channel_vardct(&blocks, is_chroma, padded_rows, padded_cols, use_ans, pass_count)?;
    crate::util::write_leb128(&mut out, encoded.len());
    out.extend_from_slice(&encoded);
  }

  Ok(out)
}

fn pixel_type_tag(pt: PixelType) -> u8 {
  match pt {
    PixelType::Uint8 => 0,
    PixelType::Uint16 => 1,
    PixelType::Float32 => 2,
  }
}

fn pixel_type_from_tag(tag: u8) -> Result<PixelType> {
  match tag {
    0 => Ok(PixelType::Uint8),
    1 => Ok(PixelType::Uint16),
    2 => Ok(PixelType::Float32),
    other => Err(JxlError::UnknownEncodingMode(other)),
  }
}

/// Decode a VarDCT-encoded byte stream back into an owned frame.
pub fn decode_frame(data: &[u8]) -> Result<OwnedFrame> {
  let mut r = BitReader::new(data);
  let header = VarDctHeader::read(&mut r)?;
  let (width, height) = (header.width as usize, header.height as usize);
  let align = if header.variable_block { 32 } else { 8 };
  let (padded_rows, padded_cols) = (pad_up(height, align), pad_up(width, align));

  let grid = if header.variable_block {
    let len = r.read_varint()? as usize;
    let bytes = r.read_bytes(len)?;
    let mut gr = BitReader::new(bytes);
    let count = gr.read_varint()? as usize;
    let mut grid = Vec::with_capacity(count);
    for _ in 0..count {
      let tag = gr.read_byte()?;
      let (h, w) = consts::block_shape_from_tag(tag).ok_or(JxlError::MalformedCoefficients { block_index: 0 })?;
      grid.push((h, w));
    }
    reconstruct_variable_positions(&grid, padded_rows, padded_cols)
  } else {
    build_fixed_grid(padded_rows, padded_cols)
  };

  let pixel_type = pixel_type_from_tag(header.pixel_type)?;
  let max_value = max_value_for(pixel_type);

  let mut channels: Vec<Array2D<f32>> = Vec::with_capacity(header.channels as usize);
  let mut luma_coeffs: Option<Vec<Array2D<f32>>> = None;

  for c in 0..header.channels as usize {
    let len = r.read_varint()? as usize;
    let bytes = r.read_bytes(len)?;
    let is_chroma = (c == 1 || c == 2) && header.colour_transform != COLOUR_TRANSFORM_NONE;
    let (scanned, scales, alpha_qs) =
      decode_channel_vardct(bytes, &grid, is_chroma, padded_rows, padded_cols, header.use_ans, header.pass_count)?;

    let mut plane = Array2D::new_filled(padded_rows, padded_cols, 0.0f32);
    let mut this_channel_coeffs = Vec::with_capacity(grid.len());
    for (i, spec) in grid.iter().enumerate() {
      let scan = zigzag_scan_order(spec.height, spec.width);
      let levels = coeff_coding::unflatten_from_scan_order(&scanned[i], &scan, spec.height, spec.width);
      let mut coeffs = quant::dequantize_block(&levels, quant::q_base(header.distance), scales[i], is_chroma);
      if is_chroma {
        if let Some(luma) = luma_coeffs.as_ref() {
          coeffs = cfl::add_predicted(&luma[i], &coeffs, cfl::dequantize_alpha(alpha_qs[i]));
        }
      }
      let spatial = dct::inverse_dct2d(&coeffs);
      place_clamped(&mut plane, spec.row, spec.col, &spatial);
      this_channel_coeffs.push(coeffs);
    }
    if c == 0 {
      luma_coeffs = Some(this_channel_coeffs);
    }
    channels.push(plane);
  }

  if header.channels as usize >= 3 && header.colour_transform != COLOUR_TRANSFORM_NONE {
    for y in 0..padded_rows {
      for x in 0..padded_cols {
        let (a, bb, cc) = (channels[0][y][x], channels[1][y][x], channels[2][y][x]);
        let (r_, g_, b_) = if header.colour_transform == COLOUR_TRANSFORM_XYB {
          colour::xyb_inverse(a, bb, cc)
        } else {
          colour::ycbcr_inverse(a, bb, cc)
        };
        channels[0][y][x] = r_;
        channels[1][y][x] = g_;
        channels[2][y][x] = b_;
      }
    }
  }

  let mut frame = OwnedFrame::new(
    width,
    height,
    header.channels as usize,
    16,
    header.channels as usize > 3,
    crate::frame::AlphaMode::Straight,
    pixel_type,
    if header.channels as usize >= 3 { crate::frame::ColorSpace::Srgb } else { crate::frame::ColorSpace::Gray },
  )?;
  for c in 0..header.channels as usize {
    for y in 0..height {
      for x in 0..width {
        let v = channels[c][y][x].round().clamp(0.0, max_value) as u16;
        frame.set_pixel(x, y, c, v);
      }
    }
  }
  Ok(frame)
}

/// Recompute the same tiling a `build_variable_grid` call would produce,
/// from a flat list of macroblock shapes read off the wire (macroblocks
/// in raster order, 32x32-aligned).
fn reconstruct_variable_positions(shapes: &[(usize, usize)], padded_rows: usize, padded_cols: usize) -> Vec<BlockSpec> {
  let mut grid = Vec::new();
  let mut mb_idx = 0;
  let mut mb_row = 0;
  while mb_row < padded_rows {
    let mut mb_col = 0;
    while mb_col < padded_cols {
      let (h, w) = shapes[mb_idx];
      let mut br = 0;
      while br < 32 && mb_row + br < padded_rows {
        let mut bc = 0;
        while bc < 32 && mb_col + bc < padded_cols {
          grid.push(BlockSpec { row: mb_row + br, col: mb_col + bc, height: h, width: w });
          bc += w;
        }
        br += h;
      }
      mb_idx += 1;
      mb_col += 32;
    }
    mb_row += 32;
  }
  grid
}
