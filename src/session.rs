use crate::all::*;

use std::sync::atomic::{AtomicBool, Ordering};

// Bulk tracking over a frame sequence, as run when re-tracking a trajectory
// for an export. Meant to run on a worker thread while the caller watches
// coarse progress; the cancel flag is checked between frames, never in the
// middle of a match. A single pass owns the track for its whole duration,
// concurrent passes over the same track are the caller's bug to avoid.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
  Completed,
  Cancelled,
  // Matching fell under the similarity threshold; the trajectory is valid
  // up to the last matched frame.
  TargetLost,
}

pub fn run_tracking_pass(
  track: &mut Track,
  frames: &[(i64, Image)],
  cancel: &AtomicBool,
  progress: &mut dyn FnMut(usize, usize),
) -> PassOutcome {
  for (i, (timestamp, frame)) in frames.iter().enumerate() {
    if cancel.load(Ordering::Relaxed) {
      info!("Tracking pass cancelled at frame {}/{}.", i, frames.len());
      return PassOutcome::Cancelled;
    }

    track.track_current_position(*timestamp, Some(frame));
    progress(i + 1, frames.len());

    if track.status == TrackStatus::Interactive {
      info!("Tracking pass lost its target at frame {}/{}.", i + 1, frames.len());
      return PassOutcome::TargetLost;
    }
  }
  PassOutcome::Completed
}
