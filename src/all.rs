// Crate-wide prelude so the modules can pull everything in with one line.

pub use crate::{
  block_tracker::*,
  calibration::*,
  canvas::*,
  coordinate_system::*,
  fading::*,
  image::*,
  kva::*,
  label::*,
  session::*,
  style::*,
  track::*,
  track_point::*,
  tracker::*,
  types::*,
};

pub use {
  std::fmt,
  std::ops::Index,
  log::{debug, error, info, warn},
};
