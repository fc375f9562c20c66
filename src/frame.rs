//! The `ImageFrame` contract (spec §3/§6): a rectangular raster that the
//! core reads and writes by `(x, y, channel)`, always in a 16-bit domain
//! regardless of the underlying storage type. The public wrapper that
//! bridges a real host image type to this contract is an external
//! collaborator; `OwnedFrame` here is a minimal, independently-testable
//! fixture satisfying the same contract, used by the demo binary and by
//! this crate's own round-trip tests.

use crate::error::{JxlError, Result};

pub const MAX_AXIS_DIMENSION: usize = 262144;
pub const MAX_PIXELS: u64 = 256 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
  Uint8,
  Uint16,
  Float32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
  Straight,
  Premultiplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
  Srgb,
  LinearSrgb,
  Gray,
  Unknown,
}

/// `getPixel`/`setPixel` contract consumed by the core from the host wrapper.
pub trait ImageFrame {
  fn width(&self) -> usize;
  fn height(&self) -> usize;
  fn channels(&self) -> usize;
  fn bits_per_sample(&self) -> u8;
  fn has_alpha(&self) -> bool;
  fn alpha_mode(&self) -> AlphaMode;
  fn pixel_type(&self) -> PixelType;
  fn color_space(&self) -> ColorSpace;
  fn orientation(&self) -> u8;

  /// Pixel value normalised to the 16-bit domain `[0, 65535]`.
  fn get_pixel(&self, x: usize, y: usize, channel: usize) -> u16;
  fn set_pixel(&mut self, x: usize, y: usize, channel: usize, value: u16);
}

/// A minimal owned implementation of [`ImageFrame`], storing every channel
/// already normalised to `u16` regardless of `pixel_type`; quantisation to
/// the narrower storage type is left to a real host wrapper's write-back.
#[derive(Debug, Clone)]
pub struct OwnedFrame {
  width: usize,
  height: usize,
  channels: usize,
  bits_per_sample: u8,
  has_alpha: bool,
  alpha_mode: AlphaMode,
  pixel_type: PixelType,
  color_space: ColorSpace,
  orientation: u8,
  data: Vec<u16>,
}

impl OwnedFrame {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    width: usize,
    height: usize,
    channels: usize,
    bits_per_sample: u8,
    has_alpha: bool,
    alpha_mode: AlphaMode,
    pixel_type: PixelType,
    color_space: ColorSpace,
  ) -> Result<Self> {
    if width == 0 || height == 0 {
      return Err(JxlError::ZeroDimension);
    }
    if width > MAX_AXIS_DIMENSION {
      return Err(JxlError::DimensionTooLarge { axis: "width", value: width, cap: MAX_AXIS_DIMENSION });
    }
    if height > MAX_AXIS_DIMENSION {
      return Err(JxlError::DimensionTooLarge { axis: "height", value: height, cap: MAX_AXIS_DIMENSION });
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
      return Err(JxlError::TooManyPixels { pixels, cap: MAX_PIXELS });
    }

    Ok(Self {
      width,
      height,
      channels,
      bits_per_sample,
      has_alpha,
      alpha_mode,
      pixel_type,
      color_space,
      orientation: 1,
      data: vec![0u16; width * height * channels],
    })
  }

  fn index(&self, x: usize, y: usize, channel: usize) -> usize {
    (y * self.width + x) * self.channels + channel
  }
}

impl ImageFrame for OwnedFrame {
  fn width(&self) -> usize {
    self.width
  }
  fn height(&self) -> usize {
    self.height
  }
  fn channels(&self) -> usize {
    self.channels
  }
  fn bits_per_sample(&self) -> u8 {
    self.bits_per_sample
  }
  fn has_alpha(&self) -> bool {
    self.has_alpha
  }
  fn alpha_mode(&self) -> AlphaMode {
    self.alpha_mode
  }
  fn pixel_type(&self) -> PixelType {
    self.pixel_type
  }
  fn color_space(&self) -> ColorSpace {
    self.color_space
  }
  fn orientation(&self) -> u8 {
    self.orientation
  }

  fn get_pixel(&self, x: usize, y: usize, channel: usize) -> u16 {
    self.data[self.index(x, y, channel)]
  }

  fn set_pixel(&mut self, x: usize, y: usize, channel: usize, value: u16) {
    let idx = self.index(x, y, channel);
    self.data[idx] = value;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_zero_dimensions() {
    let result = OwnedFrame::new(0, 10, 1, 8, false, AlphaMode::Straight, PixelType::Uint8, ColorSpace::Gray);
    assert!(matches!(result, Err(JxlError::ZeroDimension)));
  }

  #[test]
  fn rejects_axis_above_cap() {
    let result = OwnedFrame::new(
      MAX_AXIS_DIMENSION + 1,
      1,
      1,
      8,
      false,
      AlphaMode::Straight,
      PixelType::Uint8,
      ColorSpace::Gray,
    );
    assert!(matches!(result, Err(JxlError::DimensionTooLarge { axis: "width", .. })));
  }

  #[test]
  fn rejects_pixel_count_above_cap() {
    // Both axes individually legal, product exceeds the 256 Mpx cap.
    let side = 17000usize;
    let result =
      OwnedFrame::new(side, side, 1, 8, false, AlphaMode::Straight, PixelType::Uint8, ColorSpace::Gray);
    assert!(matches!(result, Err(JxlError::TooManyPixels { .. })));
  }

  #[test]
  fn get_set_pixel_round_trips_per_channel() {
    let mut frame =
      OwnedFrame::new(4, 3, 3, 8, false, AlphaMode::Straight, PixelType::Uint8, ColorSpace::Srgb).unwrap();
    for y in 0..3 {
      for x in 0..4 {
        for c in 0..3 {
          frame.set_pixel(x, y, c, (x * 100 + y * 10 + c) as u16);
        }
      }
    }
    for y in 0..3 {
      for x in 0..4 {
        for c in 0..3 {
          assert_eq!(frame.get_pixel(x, y, c), (x * 100 + y * 10 + c) as u16);
        }
      }
    }
  }
}
