use crate::all::*;

// Template matching through normalized cross-correlation.
//
// To find the point in frame I, the matcher slides the template saved with
// the point of frame I-1 over a search window centered on that point, and
// takes the position with the best correlation. The winning point then saves
// a template of its own for frame I+1: a fresh crop when the match was only
// moderate, a copy of the previous template when the match was strong (see
// `TrackingParams::template_update_threshold`).
//
// The score is the coefficient-normalized correlation (both patches reduced
// by their means), the variant that survives local brightness shifts where
// plain correlation and SSD do not.
pub struct BlockTracker {
  params: TrackingParams,
  block_size: Size,
  search_window_size: Size,
}

impl BlockTracker {
  pub fn new(image_size: Size, params: TrackingParams) -> BlockTracker {
    let mut block_width = image_size.width / params.block_factor;
    let mut block_height = image_size.height / params.block_factor;
    if block_width < params.min_block_side {
      block_width = params.min_block_side;
    }
    if block_height < params.min_block_side {
      block_height = params.min_block_side;
    }

    let block_size = Size::new(block_width, block_height);
    let search_window_size = Size::new(
      (block_width as f64 * params.search_factor) as i32,
      (block_height as f64 * params.search_factor) as i32,
    );

    debug!(
      "Template matching: image {}x{}, template {}x{}, search window {}x{}, similarity thr. {}, tpl update thr. {}",
      image_size.width, image_size.height,
      block_size.width, block_size.height,
      search_window_size.width, search_window_size.height,
      params.similarity_threshold, params.template_update_threshold,
    );

    BlockTracker { params, block_size, search_window_size }
  }

  pub fn block_size(&self) -> Size {
    self.block_size
  }

  pub fn search_window_size(&self) -> Size {
    self.search_window_size
  }
}

impl Tracker for BlockTracker {
  fn track(
    &self,
    previous: &[TrackPoint],
    frame: Option<&Image>,
    t: i64,
  ) -> (bool, TrackPoint) {
    let last = match previous.last() {
      Some(last) => last,
      None => {
        warn!("Track called with an empty point history.");
        return (false, self.create_track_point(false, 0, 0, 0.0, t, frame, previous));
      },
    };

    let (template, frame) = match (&last.template, frame) {
      (Some(template), Some(frame)) => (template, frame),
      _ => {
        // Error case: degrade to a point at the last known location.
        debug!("Track failed. No input frame, or last point has no cached template.");
        let point = self.create_track_point(false, last.x, last.y, 0.0, t, frame, previous);
        return (false, point);
      },
    };

    // Center the search zone on the last point, clipped to the frame.
    let search_center = last.point();
    let search_zone = box_of_size(search_center, self.search_window_size)
      .intersect(&frame.bounds());

    let best = match_template(frame, search_zone, template);

    match best {
      Some((argmax, score)) if score > self.params.similarity_threshold => {
        let candidate = Pixel::new(
          search_zone.left() + argmax[0] + template.width as i32 / 2,
          search_zone.top() + argmax[1] + template.height as i32 / 2,
        );
        let point = self.create_track_point(
          false, candidate[0], candidate[1], score, t, Some(frame), previous,
        );
        (true, point)
      },
      _ => {
        // No match. Create the point at the center of the search window.
        debug!("Track failed. No block over the similarity threshold in the search window.");
        let point = self.create_track_point(
          false, search_center[0], search_center[1], 0.0, t, Some(frame), previous,
        );
        (false, point)
      },
    }
  }

  fn create_track_point(
    &self,
    manual: bool,
    x: i32,
    y: i32,
    similarity: f64,
    t: i64,
    frame: Option<&Image>,
    previous: &[TrackPoint],
  ) -> TrackPoint {
    let mut template = None;

    if !manual
      && !previous.is_empty()
      && similarity > self.params.template_update_threshold
    {
      // Strong match: keep the previous template instead of re-cropping, so
      // the reference pattern does not drift with every frame. Copied, never
      // shared; later frames must not alter an already captured patch.
      if let Some(previous_template) = previous
        .last()
        .and_then(|p| p.template.as_ref())
      {
        template = Some(previous_template.clone());
      }
    }

    if template.is_none() {
      template = frame.map(|frame| frame.crop_clamped(x, y, self.block_size));
    }

    TrackPoint {
      x,
      y,
      t,
      template,
      similarity: if manual { 1.0 } else { similarity },
      is_reference: manual,
    }
  }

  fn create_orphan_track_point(&self, x: i32, y: i32, t: i64) -> TrackPoint {
    // Used when importing from the archive: no frame is at hand, the
    // template is rebuilt lazily when the point is next edited.
    TrackPoint::new(x, y, t)
  }

  fn draw(
    &self,
    canvas: &mut dyn Canvas,
    point: Pixel,
    transformer: &CoordinateSystem,
    color: Rgba,
    opacity: f64,
  ) {
    // Search and template boxes around the point.
    let p = transformer.transform(point);
    let pen = Pen::new(color.with_alpha((opacity * 192.0) as u8), 1);
    canvas.draw_rectangle(&pen, box_of_size(p, transformer.transform_size(self.search_window_size)));
    canvas.draw_rectangle(&pen, box_of_size(p, transformer.transform_size(self.block_size)));
  }

  fn edit_rectangle(&self, position: Pixel) -> Rect {
    box_of_size(position, self.search_window_size)
  }
}

// Slide `template` over every position of `zone` and return the offset and
// score of the best coefficient-normalized correlation. The similarity map
// has size (zone - template + 1) per axis; None when the clipped zone cannot
// fit the template at all.
fn match_template(frame: &Image, zone: Rect, template: &Image) -> Option<(Pixel, f64)> {
  let result_width = zone.width - template.width as i32 + 1;
  let result_height = zone.height - template.height as i32 + 1;
  if result_width <= 0 || result_height <= 0 {
    return None;
  }

  let template_mean = patch_mean(template, 0, 0, template.width, template.height);
  let mut template_var = 0.0;
  for y in 0..template.height {
    for x in 0..template.width {
      let d = template.value(x, y) as f64 - template_mean;
      template_var += d * d;
    }
  }

  let mut best_score = f64::MIN;
  let mut best_offset = Pixel::new(0, 0);

  for oy in 0..result_height {
    for ox in 0..result_width {
      let px = (zone.left() + ox) as usize;
      let py = (zone.top() + oy) as usize;
      let score = ncc_at(frame, px, py, template, template_mean, template_var);
      if score > best_score {
        best_score = score;
        best_offset = Pixel::new(ox, oy);
      }
    }
  }

  Some((best_offset, best_score))
}

fn patch_mean(image: &Image, ax: usize, ay: usize, width: usize, height: usize) -> f64 {
  let mut sum = 0.0;
  for y in 0..height {
    for x in 0..width {
      sum += image.value(ax + x, ay + y) as f64;
    }
  }
  sum / (width * height) as f64
}

fn ncc_at(
  frame: &Image,
  px: usize,
  py: usize,
  template: &Image,
  template_mean: f64,
  template_var: f64,
) -> f64 {
  let patch_mean = patch_mean(frame, px, py, template.width, template.height);

  let mut covariance = 0.0;
  let mut patch_var = 0.0;
  for y in 0..template.height {
    for x in 0..template.width {
      let f = frame.value(px + x, py + y) as f64 - patch_mean;
      let t = template.value(x, y) as f64 - template_mean;
      covariance += f * t;
      patch_var += f * f;
    }
  }

  let denominator = (patch_var * template_var).sqrt();
  if denominator <= f64::EPSILON {
    // Flat patch or flat template; correlation is undefined there.
    return 0.0;
  }
  covariance / denominator
}

#[cfg(test)]
mod tests {
  use super::*;

  // Frame with a textured blob at (bx, by) over a flat background.
  fn frame_with_blob(bx: usize, by: usize) -> Image {
    let mut frame = Image::new(120, 120);
    for y in 0..24 {
      for x in 0..24 {
        frame.set_value(bx + x, by + y, ((x * 7 + y * 13) % 200 + 30) as u8);
      }
    }
    frame
  }

  fn tracker() -> BlockTracker {
    // 120/20 = 6, floored to the 20px minimum; search window 80x80.
    BlockTracker::new(Size::new(120, 120), TrackingParams::default())
  }

  #[test]
  fn test_block_sizing() {
    let small = tracker();
    assert_eq!(small.block_size(), Size::new(20, 20));
    assert_eq!(small.search_window_size(), Size::new(80, 80));

    let large = BlockTracker::new(Size::new(1920, 1080), TrackingParams::default());
    assert_eq!(large.block_size(), Size::new(96, 54));
    assert_eq!(large.search_window_size(), Size::new(384, 216));
  }

  #[test]
  fn test_tracks_known_shift() {
    let tracker = tracker();
    let frame0 = frame_with_blob(40, 40);
    // Blob center is at (52, 52).
    let origin = tracker.create_track_point(true, 52, 52, 1.0, 0, Some(&frame0), &[]);
    assert!(origin.template.is_some());

    for (dx, dy) in [(0, 0), (3, 2), (-7, 5), (12, -9)] {
      let frame1 = frame_with_blob((40 + dx) as usize, (40 + dy) as usize);
      let (matched, point) = tracker.track(&[origin.clone()], Some(&frame1), 100);
      assert!(matched, "shift ({}, {})", dx, dy);
      assert!((point.x - (52 + dx)).abs() <= 1, "x {} for shift {}", point.x, dx);
      assert!((point.y - (52 + dy)).abs() <= 1, "y {} for shift {}", point.y, dy);
      assert!(point.similarity > 0.9);
      assert_eq!(point.t, 100);
    }
  }

  #[test]
  fn test_matches_through_brightness_shift_and_noise() {
    use rand::{RngCore, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    let tracker = tracker();
    let frame0 = frame_with_blob(40, 40);
    let origin = tracker.create_track_point(true, 52, 52, 1.0, 0, Some(&frame0), &[]);

    // Same scene a frame later: shifted, uniformly brighter and noisy. The
    // mean-reduced correlation still finds it where plain correlation or SSD
    // would read the brightness change as motion.
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let mut frame1 = frame_with_blob(43, 42);
    for value in frame1.data.iter_mut() {
      *value = value.saturating_add(20 + (rng.next_u32() % 8) as u8);
    }

    let (matched, point) = tracker.track(&[origin], Some(&frame1), 40);
    assert!(matched);
    assert!((point.x - 55).abs() <= 1);
    assert!((point.y - 54).abs() <= 1);
  }

  #[test]
  fn test_no_match_reports_search_center() {
    let tracker = tracker();
    let frame0 = frame_with_blob(40, 40);
    let origin = tracker.create_track_point(true, 52, 52, 1.0, 0, Some(&frame0), &[]);

    // Nothing resembling the template anywhere.
    let empty = Image::new(120, 120);
    let (matched, point) = tracker.track(&[origin], Some(&empty), 100);
    assert!(!matched);
    assert_eq!((point.x, point.y), (52, 52));
    assert_eq!(point.similarity, 0.0);
  }

  #[test]
  fn test_missing_template_degrades() {
    let tracker = tracker();
    let orphan = tracker.create_orphan_track_point(30, 30, 0);
    let frame = frame_with_blob(40, 40);

    let (matched, point) = tracker.track(&[orphan], Some(&frame), 50);
    assert!(!matched);
    assert_eq!((point.x, point.y), (30, 30));

    // Missing frame degrades the same way.
    let with_template = tracker.create_track_point(true, 52, 52, 1.0, 0, Some(&frame), &[]);
    let (matched, point) = tracker.track(&[with_template], None, 50);
    assert!(!matched);
    assert_eq!((point.x, point.y), (52, 52));
  }

  #[test]
  fn test_template_kept_on_strong_match() {
    let tracker = tracker();
    let frame = frame_with_blob(40, 40);
    let origin = tracker.create_track_point(true, 52, 52, 1.0, 0, Some(&frame), &[]);
    let previous = vec![origin.clone()];

    // Above the update threshold: the previous template is copied through.
    let strong = tracker.create_track_point(false, 55, 54, 0.95, 10, Some(&frame), &previous);
    assert_eq!(strong.template, origin.template);

    // Below it: a fresh crop at the new location.
    let weak = tracker.create_track_point(false, 55, 54, 0.6, 10, Some(&frame), &previous);
    assert_eq!(weak.template, Some(frame.crop_clamped(55, 54, tracker.block_size())));
    assert!(weak.template != origin.template);
  }

  #[test]
  fn test_manual_always_recrops() {
    let tracker = tracker();
    let frame = frame_with_blob(40, 40);
    let origin = tracker.create_track_point(true, 52, 52, 1.0, 0, Some(&frame), &[]);
    let previous = vec![origin];

    let manual = tracker.create_track_point(true, 60, 60, 0.99, 10, Some(&frame), &previous);
    assert_eq!(manual.similarity, 1.0);
    assert!(manual.is_reference);
    assert_eq!(manual.template, Some(frame.crop_clamped(60, 60, tracker.block_size())));
  }

  #[test]
  fn test_match_near_border_clips_search_zone() {
    let tracker = tracker();
    let frame0 = frame_with_blob(2, 2);
    // Blob center near the corner; search zone gets clipped hard.
    let origin = tracker.create_track_point(true, 14, 14, 1.0, 0, Some(&frame0), &[]);
    let frame1 = frame_with_blob(6, 5);
    let (matched, point) = tracker.track(&[origin], Some(&frame1), 10);
    assert!(matched);
    assert!((point.x - 18).abs() <= 1);
    assert!((point.y - 17).abs() <= 1);
  }
}
