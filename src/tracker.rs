use crate::all::*;

use serde::{Deserialize, Serialize};

// Matching parameters. Explicit data handed to the tracker constructor; the
// defaults reproduce the tuning the block matcher ships with, but none of
// them is load-bearing for correctness.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingParams {
  // Discard candidate blocks with lower similarity.
  pub similarity_threshold: f64,
  // Above this similarity the template is NOT refreshed from the new frame.
  // A strong match means the object still looks the same, and keeping the
  // older template avoids the incremental update drift.
  pub template_update_threshold: f64,
  // Template side is image_dim / block_factor. A smaller template focuses
  // on the object instead of the background.
  pub block_factor: i32,
  pub min_block_side: i32,
  // Search window is this many times the template size.
  pub search_factor: f64,
}

impl Default for TrackingParams {
  fn default() -> TrackingParams {
    TrackingParams {
      similarity_threshold: 0.50,
      template_update_threshold: 0.80,
      block_factor: 20,
      min_block_side: 20,
      search_factor: 4.0,
    }
  }
}

// Seam for the matching algorithm. `Track` owns one of these and never looks
// inside; an optical-flow matcher could slot in without touching the
// trajectory logic.
pub trait Tracker {
  // Locate the last point of `previous` in `frame`. Always produces a point;
  // the flag tells the caller whether it can keep tracking. `t` is relative
  // to the first point of the track.
  fn track(
    &self,
    previous: &[TrackPoint],
    frame: Option<&Image>,
    t: i64,
  ) -> (bool, TrackPoint);

  // Build a point at the given coordinates, capturing whatever internal data
  // the algorithm needs for the next match. Manual points always recapture
  // from the frame and get similarity 1.0.
  fn create_track_point(
    &self,
    manual: bool,
    x: i32,
    y: i32,
    similarity: f64,
    t: i64,
    frame: Option<&Image>,
    previous: &[TrackPoint],
  ) -> TrackPoint;

  // Bare point without algorithm data, for archive import. It cannot seed a
  // match until its internal data is rebuilt from a frame.
  fn create_orphan_track_point(&self, x: i32, y: i32, t: i64) -> TrackPoint;

  // Debug overlay around the current point (search and template boxes).
  fn draw(
    &self,
    canvas: &mut dyn Canvas,
    point: Pixel,
    transformer: &CoordinateSystem,
    color: Rgba,
    opacity: f64,
  );

  // Grab zone for the current point while in edit status.
  fn edit_rectangle(&self, position: Pixel) -> Rect;
}
