use crate::all::*;

// Opacity policy for a drawing around a reference timestamp. The track uses
// it two ways: to fade the whole trajectory out after its last point, and to
// decide which keyframe labels are inside the focus window.
#[derive(Clone, Debug)]
pub struct Fading {
  pub enabled: bool,
  pub always_visible: bool,
  // Number of frames over which opacity falls from 1 to 0.
  pub fading_frames: i64,
  pub reference_timestamp: i64,
  // Timestamps per frame of the parent video, updated when known.
  pub average_timestamps_per_frame: i64,
  pub master_factor: f64,
}

impl Fading {
  pub fn new(reference_timestamp: i64, fading_frames: i64) -> Fading {
    Fading {
      enabled: true,
      always_visible: false,
      fading_frames,
      reference_timestamp,
      average_timestamps_per_frame: 1,
      master_factor: 1.0,
    }
  }

  pub fn opacity_factor(&self, timestamp: i64) -> f64 {
    let factor = if !self.enabled {
      if timestamp == self.reference_timestamp { 1.0 } else { 0.0 }
    }
    else if self.always_visible {
      1.0
    }
    else {
      self.compute(self.reference_timestamp, timestamp, self.fading_frames)
    };
    factor * self.master_factor
  }

  // Whether a point at `test_timestamp` is visible at all when the current
  // position is `reference_timestamp` and the window spans `visible_frames`.
  pub fn is_visible(
    &self,
    reference_timestamp: i64,
    test_timestamp: i64,
    visible_frames: i64,
  ) -> bool {
    self.compute(reference_timestamp, test_timestamp, visible_frames) > 0.0
  }

  fn compute(&self, reference: i64, test: i64, fading_frames: i64) -> f64 {
    let distance = (test - reference).abs();
    let fading_timestamps = fading_frames * self.average_timestamps_per_frame;
    if distance > fading_timestamps {
      0.0
    }
    else {
      1.0 - distance as f64 / fading_timestamps as f64
    }
  }
}
