//! Small demo binary: build a synthetic frame in memory, push it through
//! `jxl_core`'s encode/decode round trip, and report fidelity. Exercises
//! the library end to end the way a codec's own sample driver does; it is
//! not the deliverable, the library is.

use clap::Parser;
use log::info;

use jxl_core::{
  container::ContainerMetadata, decode_container, encode_container, AlphaMode, ColorSpace, EncodingMode,
  EncodingOptions, Effort, ImageFrame, OwnedFrame, PixelType,
};

#[derive(Parser, Debug)]
#[command(name = "jxl_demo", about = "Round-trip a synthetic image through jxl-core")]
struct Args {
  /// Frame width in pixels
  #[arg(long, default_value_t = 64)]
  width: usize,

  /// Frame height in pixels
  #[arg(long, default_value_t = 64)]
  height: usize,

  /// Number of channels (1 = gray, 3 = RGB, 4 = RGBA)
  #[arg(long, default_value_t = 3)]
  channels: usize,

  /// Encode lossless instead of at a target distance/quality
  #[arg(long, default_value_t = false)]
  lossless: bool,

  /// Butteraugli-style distance; ignored if --lossless is set
  #[arg(long, default_value_t = 1.0)]
  distance: f32,

  /// Encoder effort rank, 1 (Lightning) through 9 (Tortoise)
  #[arg(long, default_value_t = 7)]
  effort: u8,

  /// Write the resulting container to this path instead of discarding it
  #[arg(long)]
  output: Option<String>,
}

fn effort_from_rank(rank: u8) -> Effort {
  match rank {
    1 => Effort::Lightning,
    2 => Effort::Thunder,
    3 => Effort::Falcon,
    4 => Effort::Cheetah,
    5 => Effort::Hare,
    6 => Effort::Wombat,
    7 => Effort::Squirrel,
    8 => Effort::Kitten,
    _ => Effort::Tortoise,
  }
}

fn build_synthetic_frame(width: usize, height: usize, channels: usize) -> OwnedFrame {
  let color_space = if channels == 1 { ColorSpace::Gray } else { ColorSpace::Srgb };
  let mut frame =
    OwnedFrame::new(width, height, channels, 8, channels == 4, AlphaMode::Straight, PixelType::Uint8, color_space)
      .expect("synthetic frame dimensions are always valid");

  for y in 0..height {
    for x in 0..width {
      for c in 0..channels {
        let ramp = ((x * 255) / width.max(1)) as i32;
        let band = ((y * 255) / height.max(1)) as i32;
        let value = match c % 3 {
          0 => ramp,
          1 => band,
          _ => 255 - ramp,
        };
        frame.set_pixel(x, y, c, value.clamp(0, 255) as u16 * 257);
      }
    }
  }
  frame
}

fn max_abs_error(a: &OwnedFrame, b: &OwnedFrame) -> i32 {
  let mut max_err = 0i32;
  for y in 0..a.height() {
    for x in 0..a.width() {
      for c in 0..a.channels() {
        let err = (a.get_pixel(x, y, c) as i32 - b.get_pixel(x, y, c) as i32).abs();
        max_err = max_err.max(err);
      }
    }
  }
  max_err
}

fn main() {
  env_logger::init();

  let args = Args::parse();
  let frame = build_synthetic_frame(args.width, args.height, args.channels);

  let mode =
    if args.lossless { EncodingMode::Lossless } else { EncodingMode::Distance(args.distance) };
  let options = EncodingOptions { mode, effort: effort_from_rank(args.effort), ..EncodingOptions::default() };

  info!(
    "encoding {}x{}x{} frame, mode={:?}, effort={:?}",
    args.width, args.height, args.channels, options.mode, options.effort
  );

  let metadata = ContainerMetadata::default();
  let container_bytes =
    encode_container(&frame, &options, &metadata).expect("encoding a synthetic in-memory frame cannot fail");
  let (decoded, _metadata) =
    decode_container(&container_bytes).expect("decoding our own just-written container cannot fail");

  let max_err = max_abs_error(&frame, &decoded);
  println!(
    "{}x{}x{} frame, mode={:?}: {} container bytes, max channel error {}",
    args.width,
    args.height,
    args.channels,
    options.mode,
    container_bytes.len(),
    max_err
  );
  if options.is_lossless() && max_err != 0 {
    eprintln!("warning: lossless round trip was not exact");
  }

  if let Some(path) = args.output {
    std::fs::write(&path, &container_bytes).expect("failed to write output container");
    info!("wrote container to {path}");
  }
}
