// Demo binary: synthesizes a textured target drifting over a noisy scene,
// tracks it from the first frame, and dumps the trajectory. Handy for eyeing
// the matcher behavior without a host application.

use pathline::all::*;
use pathline::util;

use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use log::LevelFilter;
use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

#[derive(Parser)]
struct Args {
  /// Number of frames to synthesize.
  #[clap(long, default_value = "60")]
  frames: usize,

  #[clap(long, default_value = "320")]
  width: usize,

  #[clap(long, default_value = "240")]
  height: usize,

  /// Target drift per frame, pixels.
  #[clap(long, default_value = "2", allow_hyphen_values = true)]
  step_x: i32,

  #[clap(long, default_value = "1", allow_hyphen_values = true)]
  step_y: i32,

  /// Amplitude of the per-pixel background noise.
  #[clap(long, default_value = "8")]
  noise: u8,

  #[clap(long, default_value = "1")]
  seed: u64,

  /// JSON file overriding the tracking parameters.
  #[clap(long)]
  params: Option<String>,

  /// Print the track archive fragment at the end.
  #[clap(long)]
  print_xml: bool,
}

const TARGET_SIDE: usize = 24;
const TIMESTAMPS_PER_FRAME: i64 = 40;

fn handle_error(err: &anyhow::Error) {
  for (i, e) in err.chain().enumerate() {
    println!("  {}: {}", i + 1, e);
  }
}

fn main() {
  if let Err(err) = run() {
    handle_error(&err);
  }
}

fn synthesize_frame(
  width: usize,
  height: usize,
  target: Pixel,
  noise: u8,
  rng: &mut Xoshiro256PlusPlus,
) -> Image {
  let mut frame = Image::new(width, height);

  if noise > 0 {
    for value in frame.data.iter_mut() {
      *value = (rng.next_u32() % noise as u32) as u8;
    }
  }

  // Textured square whose center is the tracked point.
  let left = target[0] - TARGET_SIDE as i32 / 2;
  let top = target[1] - TARGET_SIDE as i32 / 2;
  for y in 0..TARGET_SIDE {
    for x in 0..TARGET_SIDE {
      let px = left + x as i32;
      let py = top + y as i32;
      if px >= 0 && py >= 0 && (px as usize) < width && (py as usize) < height {
        frame.set_value(px as usize, py as usize, ((x * 7 + y * 13) % 200 + 40) as u8);
      }
    }
  }
  frame
}

fn run() -> Result<()> {
  let args = Args::parse();

  env_logger::Builder::new()
    .filter_level(LevelFilter::Info)
    .format(util::format_log)
    .init();

  let params = match &args.params {
    Some(path) => {
      let text = std::fs::read_to_string(path)
        .context(format!("Failed to read parameter file {}", path))?;
      serde_json::from_str::<TrackingParams>(&text)
        .context("Failed to parse tracking parameters")?
    },
    None => TrackingParams::default(),
  };

  if args.frames == 0 {
    anyhow::bail!("Need at least one frame.");
  }

  let mut rng = Xoshiro256PlusPlus::seed_from_u64(args.seed);
  let origin = Pixel::new(args.width as i32 / 4, args.height as i32 / 3);

  let frames: Vec<(i64, Image)> = (0..args.frames)
    .map(|i| {
      let target = origin + Pixel::new(args.step_x, args.step_y) * i as i32;
      let timestamp = i as i64 * TIMESTAMPS_PER_FRAME;
      (timestamp, synthesize_frame(args.width, args.height, target, args.noise, &mut rng))
    })
    .collect();

  let mut track = Track::new(origin, 0, &frames[0].1, params);
  if track.untrackable {
    warn!("No template could be captured at the origin.");
    return Ok(());
  }
  track.set_average_timestamps_per_frame(TIMESTAMPS_PER_FRAME);
  track.extra_data = ExtraData::Speed;

  let cancel = std::sync::atomic::AtomicBool::new(false);
  let outcome = run_tracking_pass(&mut track, &frames[1..], &cancel, &mut |done, total| {
    if done % 10 == 0 {
      info!("Tracked {}/{} frames.", done, total);
    }
  });
  info!("Tracking pass: {:?}, {} points.", outcome, track.positions.len());

  let calibration = CalibrationHelper::default();
  for p in &track.positions {
    let frame_number = p.t / TIMESTAMPS_PER_FRAME;
    let index = track.find_closest_point(p.t + track.begin_timestamp);
    info!(
      "frame {:3}  ({:4}, {:4})  similarity {:.3}  {}",
      frame_number, p.x, p.y, p.similarity,
      track.extra_data_text(index, &calibration),
    );
  }

  if args.print_xml {
    let timecode = |t: i64| format!("0:00:00:{:02}", t / TIMESTAMPS_PER_FRAME);
    let mut xml = String::new();
    write_track_xml(&track, &calibration, &timecode, &mut xml)?;
    println!("{}", xml);
  }

  Ok(())
}
