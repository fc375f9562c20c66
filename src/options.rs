//! Encoding options contract (spec §6). Plain, `serde`-derived structs so a
//! host application can load an options profile from JSON, the way the
//! teacher pack's `dvine_types` structs round-trip through `serde_json`.

use serde::{Deserialize, Serialize};

/// Named effort ranks, matching the ranks a JPEG XL encoder's `--effort`
/// flag names. `Squirrel` and above switch the modular pipeline from MED to
/// MA-tree prediction (spec §6); `Kitten` and above additionally select the
/// extended (15-node/8-context) tree over the default one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Effort {
  Lightning = 1,
  Thunder = 2,
  Falcon = 3,
  Cheetah = 4,
  Hare = 5,
  Wombat = 6,
  Squirrel = 7,
  Kitten = 8,
  Tortoise = 9,
}

impl Effort {
  pub fn rank(self) -> u8 {
    self as u8
  }

  pub fn uses_ma_tree(self) -> bool {
    self >= Effort::Squirrel
  }

  pub fn uses_extended_tree(self) -> bool {
    self >= Effort::Kitten
  }
}

impl Default for Effort {
  fn default() -> Self {
    Effort::Squirrel
  }
}

/// `mode` selector: lossless (Modular), lossy by perceptual quality, or a
/// direct distance knob. `distance(0.0)` always requests the lossless path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EncodingMode {
  Lossless,
  Lossy { quality: f32 },
  Distance(f32),
}

impl EncodingMode {
  /// Resolve this mode to a concrete distance value per spec §6's
  /// quality->distance mapping.
  pub fn resolve_distance(self) -> f32 {
    match self {
      EncodingMode::Lossless => 0.0,
      EncodingMode::Distance(d) => d.max(0.0),
      EncodingMode::Lossy { quality } => quality_to_distance(quality),
    }
  }
}

/// `q >= 100: 0.0; q >= 30: 0.1 + (100-q)/10; q < 30: 7.0 + (30-q)/3.75`.
pub fn quality_to_distance(quality: f32) -> f32 {
  if quality >= 100.0 {
    0.0
  } else if quality >= 30.0 {
    0.1 + (100.0 - quality) / 10.0
  } else {
    7.0 + (30.0 - quality) / 3.75
  }
}

/// `qBase = max(1, distance * 8)`, the base VarDCT quantisation step.
pub fn distance_to_qbase(distance: f32) -> f32 {
  (distance * 8.0).max(1.0)
}

/// Which VarDCT colour transform to use when the frame carries at least
/// three channels (spec §4.4); ignored for single/two-channel frames,
/// which always skip colour transform entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColourTransform {
  YCbCr,
  Xyb,
}

impl Default for ColourTransform {
  fn default() -> Self {
    ColourTransform::YCbCr
  }
}

/// A rectangular region whose interior is coded at a different `distance`
/// multiplier than the rest of the frame, with a linear feather falloff
/// from the region's edge over `feather` pixels. Modelled as a closed-form
/// multiplier function rather than a stored closure so the whole options
/// struct stays `Serialize`/`Deserialize`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionOfInterest {
  pub x: usize,
  pub y: usize,
  pub width: usize,
  pub height: usize,
  pub feather: f32,
  /// Multiplier applied to `distance` inside the region; the multiplier
  /// relaxes linearly back to 1.0 over `feather` pixels outside it.
  pub interior_multiplier: f32,
}

impl RegionOfInterest {
  /// `distanceMultiplier(px, py) -> float` from spec §6.
  pub fn distance_multiplier(&self, px: usize, py: usize) -> f32 {
    let dx = if px < self.x {
      (self.x - px) as f32
    } else if px >= self.x + self.width {
      (px - (self.x + self.width - 1)) as f32
    } else {
      0.0
    };
    let dy = if py < self.y {
      (self.y - py) as f32
    } else if py >= self.y + self.height {
      (py - (self.y + self.height - 1)) as f32
    } else {
      0.0
    };
    let dist_outside = dx.max(dy);
    if dist_outside <= 0.0 {
      return self.interior_multiplier;
    }
    if self.feather <= 0.0 {
      return 1.0;
    }
    let t = (dist_outside / self.feather).min(1.0);
    self.interior_multiplier + (1.0 - self.interior_multiplier) * t
  }
}

/// Frames-per-second as an exact rational, plus loop count and optional
/// per-frame duration overrides (in timescale units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
  pub fps_numerator: u32,
  pub fps_denominator: u32,
  pub loop_count: u32,
  pub frame_durations: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceFrameConfig {
  pub keyframe_interval: u32,
  pub max_delta_run: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingOptions {
  pub mode: EncodingMode,
  #[serde(default)]
  pub effort: Effort,
  pub adaptive_quantization: bool,
  pub use_ans: bool,
  pub progressive: bool,
  pub variable_block_size: bool,
  #[serde(default)]
  pub colour_transform: ColourTransform,
  #[serde(default)]
  pub region_of_interest: Option<RegionOfInterest>,
  #[serde(default)]
  pub animation: Option<AnimationConfig>,
  #[serde(default)]
  pub reference_frame: Option<ReferenceFrameConfig>,
}

impl EncodingOptions {
  pub fn distance(&self) -> f32 {
    self.mode.resolve_distance()
  }

  pub fn is_lossless(&self) -> bool {
    self.distance() == 0.0
  }
}

impl Default for EncodingOptions {
  fn default() -> Self {
    Self {
      mode: EncodingMode::Lossless,
      effort: Effort::default(),
      adaptive_quantization: true,
      use_ans: true,
      progressive: false,
      variable_block_size: false,
      region_of_interest: None,
      animation: None,
      reference_frame: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quality_to_distance_matches_boundary_values() {
    assert_eq!(quality_to_distance(100.0), 0.0);
    assert_eq!(quality_to_distance(150.0), 0.0);
    assert!((quality_to_distance(90.0) - 1.1).abs() < 1e-6);
    assert!((quality_to_distance(30.0) - 7.1).abs() < 1e-6);
    assert!((quality_to_distance(0.0) - 15.0).abs() < 1e-6);
  }

  #[test]
  fn distance_zero_resolves_to_lossless() {
    assert_eq!(EncodingMode::Distance(0.0).resolve_distance(), 0.0);
    assert_eq!(EncodingMode::Lossless.resolve_distance(), 0.0);
  }

  #[test]
  fn qbase_is_at_least_one() {
    assert_eq!(distance_to_qbase(0.0), 1.0);
    assert_eq!(distance_to_qbase(1.0), 8.0);
  }

  #[test]
  fn roi_multiplier_is_full_strength_inside_and_relaxes_over_feather() {
    let roi = RegionOfInterest { x: 10, y: 10, width: 10, height: 10, feather: 4.0, interior_multiplier: 0.5 };
    assert_eq!(roi.distance_multiplier(15, 15), 0.5);
    assert_eq!(roi.distance_multiplier(100, 100), 1.0);
    let mid = roi.distance_multiplier(8, 15); // 2px outside, half the feather
    assert!(mid > 0.5 && mid < 1.0);
  }

  #[test]
  fn effort_gates_ma_tree_and_extended_tree() {
    assert!(!Effort::Hare.uses_ma_tree());
    assert!(Effort::Squirrel.uses_ma_tree());
    assert!(!Effort::Squirrel.uses_extended_tree());
    assert!(Effort::Tortoise.uses_extended_tree());
  }

  #[test]
  fn options_round_trip_through_json() {
    let opts = EncodingOptions {
      mode: EncodingMode::Lossy { quality: 80.0 },
      region_of_interest: Some(RegionOfInterest {
        x: 0,
        y: 0,
        width: 5,
        height: 5,
        feather: 2.0,
        interior_multiplier: 0.8,
      }),
      ..EncodingOptions::default()
    };
    let json = serde_json::to_string(&opts).unwrap();
    let back: EncodingOptions = serde_json::from_str(&json).unwrap();
    assert_eq!(back, opts);
  }
}
