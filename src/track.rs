use crate::all::*;

// A tracked trajectory: the ordered list of points, the keyframe markers
// attached to it, and the display state. The matching itself is delegated to
// the `Tracker`. The trajectory is in one of three views (complete, focused
// on a section, label only) and one of two statuses. In edit status dragging
// the target moves the point's coordinates; in interactive status dragging
// seeks the closest point in time instead.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackView {
  Complete,
  Focus,
  Label,
}

impl TrackView {
  pub fn name(&self) -> &'static str {
    match self {
      TrackView::Complete => "Complete",
      TrackView::Focus => "Focus",
      TrackView::Label => "Label",
    }
  }

  pub fn parse(name: &str) -> Option<TrackView> {
    match name {
      "Complete" => Some(TrackView::Complete),
      "Focus" => Some(TrackView::Focus),
      "Label" => Some(TrackView::Label),
      _ => None,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackStatus {
  Edit,
  Interactive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtraData {
  None,
  TotalDistance,
  Speed,
  Acceleration,
}

impl ExtraData {
  pub fn name(&self) -> &'static str {
    match self {
      ExtraData::None => "None",
      ExtraData::TotalDistance => "TotalDistance",
      ExtraData::Speed => "Speed",
      ExtraData::Acceleration => "Acceleration",
    }
  }

  pub fn parse(name: &str) -> Option<ExtraData> {
    match name {
      "None" => Some(ExtraData::None),
      "TotalDistance" => Some(ExtraData::TotalDistance),
      "Speed" => Some(ExtraData::Speed),
      "Acceleration" => Some(ExtraData::Acceleration),
      _ => None,
    }
  }
}

// Hit test results.
pub const HIT_MISS: i32 = -1;
pub const HIT_TRAJECTORY: i32 = 0;
pub const HIT_TARGET: i32 = 1;
pub const HIT_MAIN_LABEL: i32 = 2;
pub const HIT_KEYFRAME_LABEL_BASE: i32 = 3;

const DEFAULT_CROSS_RADIUS: i32 = 4;
// Number of frames over which the global fading spans, after the end point.
const ALLOWED_FRAMES_OVER: i64 = 12;
// Number of frames of the focus section.
const FOCUS_FADING_FRAMES: i64 = 30;

const BASE_ALPHA: f64 = 224.0;
const AFTER_CURRENT_ALPHA: f64 = 64.0;
const EDIT_MODE_ALPHA: f64 = 128.0;
const LABEL_FOLLOWS_TRACK_ALPHA: f64 = 80.0;

const CURVE_FLATTEN_STEPS: usize = 8;

pub struct Track {
  pub view: TrackView,
  pub status: TrackStatus,
  pub extra_data: ExtraData,
  pub begin_timestamp: i64,
  pub end_timestamp: i64,
  pub label: String,
  pub style: TrackStyle,
  pub positions: Vec<TrackPoint>,
  pub keyframe_labels: Vec<KeyframeLabel>,
  pub main_label: KeyframeLabel,
  pub fading: Fading,
  pub tracker: Box<dyn Tracker>,
  // No point could be captured at creation time.
  pub untrackable: bool,
  // Archive import did not produce a usable trajectory.
  pub invalid: bool,
  // Called with an absolute timestamp when an interactive gesture asks the
  // player to jump to another frame.
  pub on_seek: Option<Box<dyn FnMut(i64)>>,
  // Copy of the parent document's keyframe markers, refreshed through
  // `set_keyframes`.
  keyframes: Vec<Keyframe>,
  // Bounding box diagonal of the trajectory, used to normalize timestamps
  // against pixel distances in interactive manipulation.
  flat_distance: i64,
  current_point: usize,
  current_timestamp: i64,
  moving_handler: i32,
}

impl Track {
  // Start a trajectory from the user's first click. `t` is absolute.
  pub fn new(origin: Pixel, t: i64, frame: &Image, params: TrackingParams) -> Track {
    let tracker = Box::new(BlockTracker::new(frame.size(), params));
    let first = tracker.create_track_point(true, origin[0], origin[1], 1.0, 0, Some(frame), &[]);
    let untrackable = first.template.is_none();
    Track::assemble(tracker, first, origin, t, untrackable)
  }

  // Shell for archive import: the first point has no template, it is rebuilt
  // from the video when the point is next edited.
  pub fn from_size(origin: Pixel, t: i64, image_size: Size, params: TrackingParams) -> Track {
    let tracker = Box::new(BlockTracker::new(image_size, params));
    let first = tracker.create_orphan_track_point(origin[0], origin[1], 0);
    Track::assemble(tracker, first, origin, t, false)
  }

  fn assemble(
    tracker: Box<dyn Tracker>,
    first: TrackPoint,
    origin: Pixel,
    t: i64,
    untrackable: bool,
  ) -> Track {
    let style = TrackStyle::default();
    let mut main_label = KeyframeLabel::new(origin, style.color);
    main_label.set_text("Label");

    // The fading reference is the last point; the trajectory only fades
    // after it, never before.
    let fading = Fading::new(i64::MAX, ALLOWED_FRAMES_OVER);

    Track {
      view: TrackView::Complete,
      status: TrackStatus::Edit,
      extra_data: ExtraData::None,
      begin_timestamp: t,
      end_timestamp: t,
      label: String::from("Label"),
      style,
      positions: vec![first],
      keyframe_labels: vec![],
      main_label,
      fading,
      tracker,
      untrackable,
      invalid: false,
      on_seek: None,
      keyframes: vec![],
      flat_distance: 0,
      current_point: 0,
      current_timestamp: t,
      moving_handler: HIT_MISS,
    }
  }

  pub fn set_average_timestamps_per_frame(&mut self, value: i64) {
    self.fading.average_timestamps_per_frame = i64::max(1, value);
  }

  pub fn set_color(&mut self, color: Rgba) {
    self.style.color = color;
    self.main_label.back_color = color.with_alpha(160);
  }

  pub fn set_style(&mut self, style: TrackStyle) {
    self.style = style;
    self.main_label.back_color = style.color.with_alpha(160);
  }

  pub fn set_extra_data(&mut self, extra_data: ExtraData) {
    self.extra_data = extra_data;
    self.integrate_keyframes();
  }

  pub fn stop_tracking(&mut self) {
    self.status = TrackStatus::Interactive;
  }

  // Re-enable coordinate editing. Only ever by explicit user action.
  pub fn restart_tracking(&mut self) {
    self.status = TrackStatus::Edit;
  }

  // ---------------------------------------------------------------------
  // Tracking.

  // Match the previous point in the current frame. New points are only ever
  // appended here; the user can only move existing ones. The caller advances
  // at most one frame past the last tracked point, so a timestamp at or
  // before the last point is ignored.
  pub fn track_current_position(&mut self, timestamp: i64, frame: Option<&Image>) {
    let last_t = match self.positions.last() {
      Some(last) => last.t,
      None => return,
    };
    if timestamp <= self.begin_timestamp + last_t {
      return;
    }

    let (matched, point) =
      self.tracker.track(&self.positions, frame, timestamp - self.begin_timestamp);

    // The point is kept even when matching failed, but tracking stops there.
    self.positions.push(point);
    if !matched {
      self.stop_tracking();
    }

    self.end_timestamp = self.positions[self.positions.len() - 1].t + self.begin_timestamp;
    self.compute_flat_distance();
    self.integrate_keyframes();
  }

  // The user moved an existing point by hand; rebuild the tracking data
  // stored in it so the next match starts from the new location.
  pub fn update_track_point(&mut self, frame: &Image) {
    if self.positions.len() < 2 || self.current_point >= self.positions.len() {
      return;
    }

    let (x, y, t) = {
      let current = &self.positions[self.current_point];
      (current.x, current.y, current.t)
    };

    self.positions[self.current_point].reset_track_data();
    let rebuilt =
      self.tracker.create_track_point(true, x, y, 1.0, t, Some(frame), &self.positions);
    self.positions[self.current_point] = rebuilt;

    // Re-attach the label bound to this point, if any.
    let absolute = t + self.begin_timestamp;
    for kl in &mut self.keyframe_labels {
      if kl.timestamp == absolute {
        kl.set_attach(Pixel::new(x, y), true);
      }
    }
  }

  // ---------------------------------------------------------------------
  // Trajectory surgery (delete end of track and its undo).

  // Remove every point after the one closest to the timestamp.
  pub fn chop_trajectory(&mut self, timestamp: i64) {
    if self.positions.is_empty() {
      return;
    }
    self.current_point = self.find_closest_point(timestamp);
    if self.current_point < self.positions.len() - 1 {
      self.positions.truncate(self.current_point + 1);
    }
    self.end_timestamp = self.positions[self.positions.len() - 1].t + self.begin_timestamp;
    self.integrate_keyframes();
  }

  // The points `chop_trajectory(timestamp)` would discard, for undo.
  pub fn get_end_of_track(&self, timestamp: i64) -> Vec<TrackPoint> {
    let closest = self.find_closest_point(timestamp);
    self.positions[closest + 1..].to_vec()
  }

  // Revival of discarded points. Some points may have been re-tracked in the
  // meantime; the insertion point is matched by timestamp and any overlap is
  // trimmed before appending.
  pub fn append_points(&mut self, _timestamp: i64, points: Vec<TrackPoint>) {
    if points.is_empty() || self.positions.is_empty() {
      return;
    }

    let mut matched = self.positions.len() - 1;
    while self.positions[matched].t >= points[0].t && matched > 0 {
      matched -= 1;
    }
    if matched < self.positions.len() - 1 {
      self.positions.truncate(matched + 1);
    }
    self.positions.extend(points);

    self.end_timestamp = self.positions[self.positions.len() - 1].t + self.begin_timestamp;
    self.compute_flat_distance();
    self.integrate_keyframes();
  }

  // ---------------------------------------------------------------------
  // Keyframe labels.

  pub fn set_keyframes(&mut self, keyframes: &[Keyframe]) {
    self.keyframes = keyframes.to_vec();
    self.integrate_keyframes();
  }

  // Resynchronize the keyframe labels against the marker list: markers in
  // the trajectory interval get a label attached to the nearest point,
  // already known ones keep their custom position, out-of-range ones are
  // dropped. Must run again after every structural change to the positions
  // or to the marker list.
  pub fn integrate_keyframes(&mut self) {
    if self.positions.is_empty() {
      return;
    }

    let mut matched = vec![false; self.keyframe_labels.len()];
    let last_absolute = self.positions[self.positions.len() - 1].t + self.begin_timestamp;

    for i in 0..self.keyframes.len() {
      let position = self.keyframes[i].position;
      // Strictly after the begin timestamp: the marker created along with
      // the track itself is not labeled.
      if position <= self.begin_timestamp || position > last_absolute {
        continue;
      }

      let known = self
        .keyframe_labels
        .iter()
        .position(|kl| kl.timestamp == position);

      if let Some(j) = known {
        matched[j] = true;
        // Known marker, refresh the title in case it changed.
        let title = self.keyframes[i].title.clone();
        self.keyframe_labels[j].set_text(&title);
      }
      else {
        let attach_index = self.find_closest_point(position);
        let attach_point = self.positions[attach_index].point();
        let mut kl = KeyframeLabel::new(attach_point, Rgba::BLACK);
        kl.attach_index = attach_index;
        kl.timestamp = self.positions[attach_index].t + self.begin_timestamp;
        kl.set_text(&self.keyframes[i].title);
        self.keyframe_labels.push(kl);
      }
    }

    // Remove the labels whose marker is gone, in reverse so the indices
    // stay valid.
    for i in (0..matched.len()).rev() {
      if !matched[i] {
        self.keyframe_labels.remove(i);
      }
    }
  }

  // ---------------------------------------------------------------------
  // Queries.

  // Index of the point closest in time to an absolute timestamp. Ties
  // resolve to the lowest index; callers rely on that at exact midpoints.
  pub fn find_closest_point(&self, timestamp: i64) -> usize {
    let mut min_err = i64::MAX;
    let mut closest = 0;
    for (i, p) in self.positions.iter().enumerate() {
      let err = (p.t + self.begin_timestamp - timestamp).abs();
      if err < min_err {
        min_err = err;
        closest = i;
      }
    }
    closest
  }

  pub fn current_point_index(&self) -> usize {
    self.current_point
  }

  fn compute_flat_distance(&mut self) {
    // Flat distance of the bounding box rather than the summed segment
    // lengths, otherwise the normalization is biased towards time.
    let mut smallest_top = i32::MAX;
    let mut smallest_left = i32::MAX;
    let mut highest_bottom = -1;
    let mut highest_right = -1;

    for p in &self.positions {
      smallest_left = i32::min(smallest_left, p.x);
      highest_right = i32::max(highest_right, p.x);
      smallest_top = i32::min(smallest_top, p.y);
      highest_bottom = i32::max(highest_bottom, p.y);
    }

    let w = (highest_right - smallest_left) as f64;
    let h = (highest_bottom - smallest_top) as f64;
    self.flat_distance = (w * w + h * h).sqrt() as i64;
  }

  // ---------------------------------------------------------------------
  // User manipulation.

  pub fn move_drawing(&mut self, dx: i32, dy: i32) {
    if self.status == TrackStatus::Edit {
      if self.moving_handler == HIT_TARGET {
        self.move_cursor(dx, dy);
      }
    }
    else if self.moving_handler > HIT_TARGET {
      self.move_label_to(dx, dy, self.moving_handler);
    }
  }

  // Moving the target or moving along the trajectory while interactive
  // seeks the closest frame instead of editing coordinates.
  pub fn move_handle(&mut self, point: Pixel, handle: i32) {
    if self.status == TrackStatus::Interactive
      && (handle == HIT_TRAJECTORY || handle == HIT_TARGET)
    {
      self.move_cursor(point[0], point[1]);
    }
  }

  // Result: -1 miss, 0 trajectory, 1 target, 2 main label, 3+ keyframe
  // label. Labels are tested first so one lying on the curve stays movable.
  // A trajectory hit while interactive immediately seeks the closest frame;
  // callers rely on the side effect for click-to-jump.
  pub fn hit_test(&mut self, point: Pixel, timestamp: i64) -> i32 {
    let mut result = HIT_MISS;

    if self.positions.is_empty() {
      self.moving_handler = result;
      return result;
    }

    if timestamp >= self.begin_timestamp && timestamp <= self.end_timestamp {
      self.current_point = self.find_closest_point(timestamp);
      self.current_timestamp = timestamp;

      if self.status == TrackStatus::Interactive {
        result = self.is_on_keyframes_labels(point);
      }

      if result == HIT_MISS {
        let current = self.positions[self.current_point].point();
        let target_rect = if self.status == TrackStatus::Edit {
          self.tracker.edit_rectangle(current)
        }
        else {
          box_around(current, DEFAULT_CROSS_RADIUS + 3)
        };

        if target_rect.contains(point) {
          result = HIT_TARGET;
        }
        else {
          result = self.hit_test_trajectory(point);
        }
      }
    }

    if result == HIT_TRAJECTORY && self.status == TrackStatus::Interactive {
      // Instantly jump to the frame.
      self.move_cursor(point[0], point[1]);
    }

    self.moving_handler = result;
    result
  }

  fn hit_test_trajectory(&self, point: Pixel) -> i32 {
    let start = self.first_visible_point();
    let end = self.last_visible_point();
    // A curve needs at least two points; anything less is a miss.
    if end <= start {
      return HIT_MISS;
    }

    let points: Vec<Pixel> = self.positions[start..=end].iter().map(|p| p.point()).collect();
    let flattened = flatten_curve(&points, 0.5, CURVE_FLATTEN_STEPS);
    let half_width = (self.style.line_size + 7) as f64 / 2.0;
    if distance_to_polyline(point, &flattened) <= half_width {
      HIT_TRAJECTORY
    }
    else {
      HIT_MISS
    }
  }

  fn is_on_keyframes_labels(&self, point: Pixel) -> i32 {
    if self.view == TrackView::Label {
      if self.main_label.hit_test(point) {
        return HIT_MAIN_LABEL;
      }
      return HIT_MISS;
    }

    // Even outside label view the main label is visible while the extra
    // data (distance, speed) is displayed.
    if self.extra_data != ExtraData::None && self.main_label.hit_test(point) {
      return HIT_MAIN_LABEL;
    }

    let reference = self.positions[self.current_point].t + self.begin_timestamp;
    for (i, kl) in self.keyframe_labels.iter().enumerate() {
      let visible = self.view == TrackView::Complete
        || self.fading.is_visible(reference, kl.timestamp, FOCUS_FADING_FRAMES);
      if visible && kl.hit_test(point) {
        return HIT_KEYFRAME_LABEL_BASE + i as i32;
      }
    }

    HIT_MISS
  }

  fn move_cursor(&mut self, x: i32, y: i32) {
    if self.status == TrackStatus::Edit {
      // Delta values; the template is rebuilt at mouse up.
      self.positions[self.current_point].x += x;
      self.positions[self.current_point].y += y;
      return;
    }

    if self.positions.len() < 2 {
      return;
    }

    // Find the closest point in (x, y, t). The time axis is not in pixel
    // units, so it is first normalized by the trajectory flat distance.
    let time_total = self.positions[self.positions.len() - 1].t - self.positions[0].t;
    let scale_factor = time_total as f64 / self.flat_distance as f64;

    let mut min_distance = f64::MAX;
    let mut closest = 0;
    for (i, p) in self.positions.iter().enumerate() {
      let time_distance =
        (self.current_timestamp - self.begin_timestamp - p.t) as f64;
      let normalized_time = (time_distance / scale_factor).trunc();
      let dx = (x - p.x) as f64;
      let dy = (y - p.y) as f64;
      let distance = (dx * dx + dy * dy + normalized_time * normalized_time).sqrt();
      if distance < min_distance {
        min_distance = distance;
        closest = i;
      }
    }

    let target = self.positions[closest].t + self.begin_timestamp;
    if let Some(on_seek) = &mut self.on_seek {
      on_seek(target);
    }
  }

  fn move_label_to(&mut self, dx: i32, dy: i32, label_number: i32) {
    if self.status == TrackStatus::Edit || self.view != TrackView::Label {
      if self.extra_data != ExtraData::None && label_number == HIT_MAIN_LABEL {
        self.main_label.move_label(dx, dy);
      }
      else {
        let index = (label_number - HIT_KEYFRAME_LABEL_BASE) as usize;
        if index < self.keyframe_labels.len() {
          self.keyframe_labels[index].move_label(dx, dy);
        }
      }
    }
    else {
      self.main_label.move_label(dx, dy);
    }
  }

  // ---------------------------------------------------------------------
  // Drawing.

  pub fn draw(
    &mut self,
    canvas: &mut dyn Canvas,
    transformer: &CoordinateSystem,
    calibration: &CalibrationHelper,
    current_timestamp: i64,
  ) {
    if current_timestamp < self.begin_timestamp || self.positions.is_empty() {
      return;
    }
    self.current_timestamp = current_timestamp;

    // The reference frame is the last point and fading only applies after
    // it, never before the end of the trajectory.
    let mut opacity = 1.0;
    if self.status == TrackStatus::Interactive && current_timestamp > self.end_timestamp {
      self.fading.reference_timestamp = self.end_timestamp;
      opacity = self.fading.opacity_factor(current_timestamp);
    }
    if opacity <= 0.0 {
      return;
    }

    self.current_point = self.find_closest_point(current_timestamp);

    if self.positions.len() > 1 {
      if self.status == TrackStatus::Interactive && self.view != TrackView::Label {
        self.draw_keyframes_titles(canvas, transformer, calibration, opacity);
      }

      let first = self.first_visible_point();
      let last = self.last_visible_point();
      if self.status == TrackStatus::Interactive && self.view == TrackView::Complete {
        self.draw_trajectory(canvas, transformer, first, self.current_point, true, opacity);
        self.draw_trajectory(canvas, transformer, self.current_point, last, false, opacity);
      }
      else {
        self.draw_trajectory(canvas, transformer, first, last, false, opacity);
      }
    }

    if opacity == 1.0 && self.view != TrackView::Label {
      self.draw_marker(canvas, transformer);
    }

    // Search boxes, only while editing.
    if self.status == TrackStatus::Edit && opacity == 1.0 {
      let current = self.positions[self.current_point].point();
      self.tracker.draw(canvas, current, transformer, self.style.color, opacity);
    }

    if self.status == TrackStatus::Interactive
      && (self.view == TrackView::Label || self.extra_data != ExtraData::None)
    {
      self.draw_main_label(canvas, transformer, calibration, opacity);
    }
  }

  fn draw_trajectory(
    &self,
    canvas: &mut dyn Canvas,
    transformer: &CoordinateSystem,
    start: usize,
    end: usize,
    before: bool,
    opacity: f64,
  ) {
    if end <= start {
      return;
    }
    let points: Vec<Pixel> = self.positions[start..=end]
      .iter()
      .map(|p| transformer.transform(p.point()))
      .collect();

    let pen = self.track_pen(opacity, before);
    // Tension 0.5 for the classic smooth curve.
    canvas.draw_curve(&pen, &points, 0.5);

    if self.style.shape.show_steps() {
      let step_pen = Pen::new(pen.color, 2);
      let margin = (pen.width as f64 * 1.5) as i32;
      for p in &points {
        canvas.draw_ellipse(&step_pen, box_around(*p, margin));
      }
    }
  }

  // Segments before the current point are drawn at full alpha, segments
  // after it dimmed, except in edit status where everything is dim.
  fn track_pen(&self, opacity: f64, before: bool) -> Pen {
    let alpha = if self.status == TrackStatus::Edit {
      EDIT_MODE_ALPHA
    }
    else {
      match self.view {
        TrackView::Complete => {
          if before { opacity * BASE_ALPHA } else { AFTER_CURRENT_ALPHA }
        },
        TrackView::Focus => opacity * BASE_ALPHA,
        TrackView::Label => opacity * LABEL_FOLLOWS_TRACK_ALPHA,
      }
    };

    let mut pen = Pen::new(self.style.color.with_alpha(alpha as u8), self.style.line_size);
    pen.dashed = self.style.shape.dashed();
    pen
  }

  fn draw_marker(&self, canvas: &mut dyn Canvas, transformer: &CoordinateSystem) {
    let radius = DEFAULT_CROSS_RADIUS;
    let location = transformer.transform(self.positions[self.current_point].point());

    if self.status == TrackStatus::Edit {
      // Little cross.
      let pen = Pen::new(self.style.color, 1);
      canvas.draw_line(
        &pen,
        Pixel::new(location[0], location[1] - radius),
        Pixel::new(location[0], location[1] + radius),
      );
      canvas.draw_line(
        &pen,
        Pixel::new(location[0] - radius, location[1]),
        Pixel::new(location[0] + radius, location[1]),
      );
    }
    else {
      // Crash test dummy style target.
      let rect = box_around(location, radius);
      canvas.fill_arc(Rgba::BLACK, rect, 0.0, 90.0);
      canvas.fill_arc(Rgba::WHITE, rect, 90.0, 90.0);
      canvas.fill_arc(Rgba::BLACK, rect, 180.0, 90.0);
      canvas.fill_arc(Rgba::WHITE, rect, 270.0, 90.0);
      canvas.draw_ellipse(&Pen::new(Rgba::WHITE, 1), box_around(location, radius + 2));
    }
  }

  fn draw_keyframes_titles(
    &mut self,
    canvas: &mut dyn Canvas,
    transformer: &CoordinateSystem,
    calibration: &CalibrationHelper,
    opacity: f64,
  ) {
    let reference = self.positions[self.current_point].t + self.begin_timestamp;

    // When extra data is displayed the labels show it instead of the titles.
    let texts: Vec<Option<String>> = self
      .keyframe_labels
      .iter()
      .map(|kl| {
        if self.extra_data != ExtraData::None {
          Some(self.extra_data_text(kl.attach_index, calibration))
        }
        else {
          None
        }
      })
      .collect();

    let view = self.view;
    let fading = &self.fading;
    for (kl, text) in self.keyframe_labels.iter_mut().zip(texts) {
      // In focus view only the labels inside the focus section show.
      let visible = view == TrackView::Complete
        || fading.is_visible(reference, kl.timestamp, FOCUS_FADING_FRAMES);
      if !visible {
        continue;
      }
      if let Some(text) = text {
        kl.set_text(&text);
      }
      kl.draw(canvas, transformer, opacity);
    }
  }

  fn draw_main_label(
    &mut self,
    canvas: &mut dyn Canvas,
    transformer: &CoordinateSystem,
    calibration: &CalibrationHelper,
    opacity: f64,
  ) {
    // The main label is only drawn at full opacity.
    if opacity != 1.0 {
      return;
    }

    let text = if self.view == TrackView::Label {
      self.label.clone()
    }
    else {
      self.extra_data_text(self.current_point, calibration)
    };

    let attach = self.positions[self.current_point].point();
    self.main_label.set_attach(attach, true);
    self.main_label.set_text(&text);
    self.main_label.draw(canvas, transformer, opacity);
  }

  fn first_visible_point(&self) -> usize {
    let focus = FOCUS_FADING_FRAMES as usize;
    if (self.view != TrackView::Complete || self.status == TrackStatus::Edit)
      && self.current_point > focus
    {
      self.current_point - focus
    }
    else {
      0
    }
  }

  fn last_visible_point(&self) -> usize {
    let focus = FOCUS_FADING_FRAMES as usize;
    if (self.view != TrackView::Complete || self.status == TrackStatus::Edit)
      && self.current_point + focus < self.positions.len() - 1
    {
      self.current_point + focus
    }
    else {
      self.positions.len() - 1
    }
  }

  // ---------------------------------------------------------------------
  // Extra data (distance, speed).

  pub fn extra_data_text(&self, index: usize, calibration: &CalibrationHelper) -> String {
    match self.extra_data {
      ExtraData::TotalDistance => self.distance_text(0, index, calibration),
      ExtraData::Speed => self.speed_text(index as isize - 1, index, calibration),
      // Acceleration display is not derived yet.
      ExtraData::Acceleration => String::new(),
      ExtraData::None => String::new(),
    }
  }

  // Distance along the trajectory between two point indices.
  fn distance_text(&self, p1: usize, p2: usize, calibration: &CalibrationHelper) -> String {
    if self.positions.is_empty() {
      return String::new();
    }
    if p1 >= self.positions.len() || p2 >= self.positions.len() || p2 < p1 {
      return calibration.length_text(0.0);
    }

    let mut pixel_distance_total = 0.0;
    for i in p1..p2 {
      pixel_distance_total += pixel_distance(
        self.positions[i].point(),
        self.positions[i + 1].point(),
      );
    }
    calibration.length_text(pixel_distance_total)
  }

  // Instant speed at p2: distance from p1 to p2 over the elapsed frames.
  fn speed_text(&self, p1: isize, p2: usize, calibration: &CalibrationHelper) -> String {
    if self.positions.is_empty() {
      return String::new();
    }

    let frames = p2 as isize - p1;
    if p1 >= 0
      && (p1 as usize) < self.positions.len() - 1
      && p2 > p1 as usize
      && p2 < self.positions.len()
    {
      calibration.speed_text(
        self.positions[p1 as usize].point(),
        self.positions[p2].point(),
        frames as i32,
      )
    }
    else {
      // Not computable, render as zero.
      calibration.speed_text(self.positions[0].point(), self.positions[0].point(), 0)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn textured_frame() -> Image {
    let mut frame = Image::new(200, 200);
    for y in 0..200 {
      for x in 0..200 {
        // Aperiodic so the matcher has a unique best position.
        frame.set_value(x, y, ((x * x + y * y) % 251) as u8);
      }
    }
    frame
  }

  fn track_with_points(ts: &[i64]) -> Track {
    let frame = textured_frame();
    let mut track = Track::new(Pixel::new(100, 100), 100, &frame, TrackingParams::default());
    // Synthetic straight trajectory, one point per timestamp.
    for (i, t) in ts.iter().skip(1).enumerate() {
      let mut p = TrackPoint::new(100 + (i as i32 + 1) * 10, 100, *t);
      p.similarity = 1.0;
      track.positions.push(p);
    }
    track.end_timestamp = track.positions.last().unwrap().t + track.begin_timestamp;
    track
  }

  #[test]
  fn test_find_closest_point_prefers_first_on_tie() {
    let track = track_with_points(&[0, 10, 20]);
    // Absolute 115 is equidistant from 110 and 120: lowest index wins.
    assert_eq!(track.find_closest_point(115), 1);
  }

  #[test]
  fn test_find_closest_point_midpoint() {
    let track = track_with_points(&[0, 10, 20]);
    assert_eq!(track.find_closest_point(114), 1);
    assert_eq!(track.find_closest_point(116), 2);
    assert_eq!(track.find_closest_point(0), 0);
    assert_eq!(track.find_closest_point(10_000), 2);
  }

  #[test]
  fn test_chop_append_round_trip() {
    let mut track = track_with_points(&[0, 10, 20, 30, 40]);
    let original: Vec<(i32, i64)> = track.positions.iter().map(|p| (p.x, p.t)).collect();

    let removed = track.get_end_of_track(120);
    assert_eq!(removed.len(), 2);
    track.chop_trajectory(120);
    assert_eq!(track.positions.len(), 3);
    assert_eq!(track.end_timestamp, 120);

    track.append_points(120, removed);
    let restored: Vec<(i32, i64)> = track.positions.iter().map(|p| (p.x, p.t)).collect();
    assert_eq!(restored, original);
    assert_eq!(track.end_timestamp, 140);
  }

  #[test]
  fn test_append_trims_overlap() {
    let mut track = track_with_points(&[0, 10, 20, 30]);
    let removed = track.get_end_of_track(110);
    track.chop_trajectory(110);

    // One point got re-tracked in the meantime at the same timestamp.
    let mut replacement = TrackPoint::new(999, 999, 20);
    replacement.similarity = 1.0;
    track.positions.push(replacement);

    track.append_points(110, removed);
    let ts: Vec<i64> = track.positions.iter().map(|p| p.t).collect();
    assert_eq!(ts, vec![0, 10, 20, 30]);
    // The stale re-added point was trimmed in favor of the undo data.
    assert_eq!(track.positions[2].x, 120);
  }

  #[test]
  fn test_track_current_position_appends_and_guards() {
    let frame = textured_frame();
    let mut track = Track::new(Pixel::new(100, 100), 1000, &frame, TrackingParams::default());
    assert_eq!(track.status, TrackStatus::Edit);

    // Same timestamp as the last point: ignored.
    track.track_current_position(1000, Some(&frame));
    assert_eq!(track.positions.len(), 1);

    // Next frame, static scene: the point is found where it was.
    track.track_current_position(1040, Some(&frame));
    assert_eq!(track.positions.len(), 2);
    assert_eq!(track.status, TrackStatus::Edit);
    assert!((track.positions[1].x - 100).abs() <= 1);
    assert_eq!(track.positions[1].t, 40);
    assert_eq!(track.end_timestamp, 1040);

    // A frame with nothing matching stops the tracking but keeps the point.
    let blank = Image::new(200, 200);
    track.track_current_position(1080, Some(&blank));
    assert_eq!(track.positions.len(), 3);
    assert_eq!(track.status, TrackStatus::Interactive);
  }

  #[test]
  fn test_status_transitions_are_explicit() {
    let frame = textured_frame();
    let mut track = Track::new(Pixel::new(100, 100), 0, &frame, TrackingParams::default());
    track.stop_tracking();
    assert_eq!(track.status, TrackStatus::Interactive);
    // No automatic way back.
    track.track_current_position(40, Some(&frame));
    assert_eq!(track.status, TrackStatus::Interactive);
    track.restart_tracking();
    assert_eq!(track.status, TrackStatus::Edit);
  }

  #[test]
  fn test_integrate_keyframes_add_and_remove() {
    let mut track = track_with_points(&[0, 10, 20]);

    track.set_keyframes(&[Keyframe::new(111, "apex")]);
    assert_eq!(track.keyframe_labels.len(), 1);
    assert_eq!(track.keyframe_labels[0].attach_index, 1);
    assert_eq!(track.keyframe_labels[0].timestamp, 110);
    assert_eq!(track.keyframe_labels[0].text, "apex");

    // Markers outside (begin, end] never get labels.
    track.set_keyframes(&[
      Keyframe::new(111, "apex"),
      Keyframe::new(100, "start"),
      Keyframe::new(500, "later"),
    ]);
    assert_eq!(track.keyframe_labels.len(), 1);

    // Removing the marker removes the label on the next pass.
    track.set_keyframes(&[]);
    assert!(track.keyframe_labels.is_empty());
  }

  #[test]
  fn test_integrate_keyframes_after_chop() {
    let mut track = track_with_points(&[0, 10, 20, 30]);
    track.set_keyframes(&[Keyframe::new(130, "end")]);
    assert_eq!(track.keyframe_labels.len(), 1);

    // Chopping the tail drops the now out-of-range label.
    track.chop_trajectory(110);
    assert!(track.keyframe_labels.is_empty());
  }

  #[test]
  fn test_draw_before_begin_is_noop() {
    let mut track = track_with_points(&[0, 10, 20]);
    let mut canvas = RecordingCanvas::new();
    let cs = CoordinateSystem::new(Size::new(200, 200));
    let calibration = CalibrationHelper::default();
    track.draw(&mut canvas, &cs, &calibration, 50);
    assert!(canvas.ops.is_empty());
  }

  #[test]
  fn test_draw_complete_interactive_splits_curve() {
    let mut track = track_with_points(&[0, 10, 20, 30]);
    track.stop_tracking();
    let mut canvas = RecordingCanvas::new();
    let cs = CoordinateSystem::new(Size::new(200, 200));
    let calibration = CalibrationHelper::default();

    track.draw(&mut canvas, &cs, &calibration, 110);
    let curves = canvas.curves();
    assert_eq!(curves.len(), 2);

    // Before segment at base alpha, after segment dimmed.
    if let DrawOp::Curve { pen, points, tension } = curves[0] {
      assert_eq!(pen.color.a, 224);
      assert_eq!(points.len(), 2);
      assert_eq!(*tension, 0.5);
    }
    if let DrawOp::Curve { pen, points, .. } = curves[1] {
      assert_eq!(pen.color.a, 64);
      assert_eq!(points.len(), 3);
    }
  }

  #[test]
  fn test_draw_fades_only_after_end() {
    let mut track = track_with_points(&[0, 10, 20]);
    track.stop_tracking();
    let mut canvas = RecordingCanvas::new();
    let cs = CoordinateSystem::new(Size::new(200, 200));
    let calibration = CalibrationHelper::default();

    // Half way into the 12 frame fade window past the end.
    track.draw(&mut canvas, &cs, &calibration, 126);
    let curves = canvas.curves();
    assert!(!curves.is_empty());
    if let DrawOp::Curve { pen, .. } = curves[0] {
      let expected = ((1.0 - 6.0 / 12.0) * BASE_ALPHA) as u8;
      assert_eq!(pen.color.a, expected);
    }

    // Beyond the window nothing is drawn at all.
    let mut canvas = RecordingCanvas::new();
    track.draw(&mut canvas, &cs, &calibration, 120 + 13);
    assert!(canvas.ops.is_empty());
  }

  #[test]
  fn test_draw_edit_shows_search_boxes() {
    let mut track = track_with_points(&[0, 10, 20]);
    let mut canvas = RecordingCanvas::new();
    let cs = CoordinateSystem::new(Size::new(200, 200));
    let calibration = CalibrationHelper::default();

    track.draw(&mut canvas, &cs, &calibration, 100);
    // Cross marker (2 lines) plus search and template rectangles.
    let lines = canvas.ops.iter().filter(|op| matches!(op, DrawOp::Line { .. })).count();
    let rects = canvas.ops.iter().filter(|op| matches!(op, DrawOp::Rectangle { .. })).count();
    assert_eq!(lines, 2);
    assert_eq!(rects, 2);
  }

  #[test]
  fn test_hit_test_target_and_trajectory() {
    let mut track = track_with_points(&[0, 10, 20, 30]);
    track.stop_tracking();

    // On the current point: target handle.
    assert_eq!(track.hit_test(Pixel::new(100, 100), 100), HIT_TARGET);

    // On the curve between points, far from the target: trajectory, and the
    // embedded seek fires.
    let seeks = std::rc::Rc::new(std::cell::RefCell::new(vec![]));
    let sink = seeks.clone();
    track.on_seek = Some(Box::new(move |ts| sink.borrow_mut().push(ts)));
    assert_eq!(track.hit_test(Pixel::new(125, 100), 100), HIT_TRAJECTORY);
    assert_eq!(seeks.borrow().len(), 1);

    // Clearly off everything.
    assert_eq!(track.hit_test(Pixel::new(50, 180), 100), HIT_MISS);

    // Outside the time range of the track.
    assert_eq!(track.hit_test(Pixel::new(100, 100), 500), HIT_MISS);
  }

  #[test]
  fn test_hit_test_labels_have_priority() {
    let mut track = track_with_points(&[0, 10, 20]);
    track.stop_tracking();
    track.set_keyframes(&[Keyframe::new(111, "apex")]);

    // Materialize the label boxes.
    let mut canvas = RecordingCanvas::new();
    let cs = CoordinateSystem::new(Size::new(200, 200));
    let calibration = CalibrationHelper::default();
    track.draw(&mut canvas, &cs, &calibration, 110);

    let inside = track.keyframe_labels[0].background().center();
    assert_eq!(track.hit_test(inside, 110), HIT_KEYFRAME_LABEL_BASE);
  }

  #[test]
  fn test_move_drawing_edits_current_point() {
    let mut track = track_with_points(&[0, 10, 20]);
    assert_eq!(track.hit_test(Pixel::new(100, 100), 100), HIT_TARGET);
    track.move_drawing(5, -3);
    assert_eq!(track.positions[0].x, 105);
    assert_eq!(track.positions[0].y, 97);
  }

  #[test]
  fn test_update_track_point_rebuilds_template() {
    let frame = textured_frame();
    let mut track = Track::new(Pixel::new(100, 100), 0, &frame, TrackingParams::default());
    track.track_current_position(40, Some(&frame));
    assert!(track.positions.len() > 1);

    // Simulate a manual drag of the current point.
    track.current_point = 1;
    track.positions[1].x = 60;
    track.positions[1].y = 70;
    track.update_track_point(&frame);

    let rebuilt = &track.positions[1];
    assert!(rebuilt.is_reference);
    assert_eq!(rebuilt.similarity, 1.0);
    assert_eq!(
      rebuilt.template,
      Some(frame.crop_clamped(60, 70, Size::new(20, 20))),
    );
  }

  #[test]
  fn test_extra_data_text() {
    let track_points = [0i64, 10, 20];
    let mut track = track_with_points(&track_points);
    let calibration = CalibrationHelper::default();

    track.extra_data = ExtraData::TotalDistance;
    // Points are 10 px apart along x.
    assert_eq!(track.extra_data_text(2, &calibration), "20 px");

    track.extra_data = ExtraData::Speed;
    assert_eq!(track.extra_data_text(1, &calibration), "10 px/f");
    // Speed at the first point is not computable.
    assert_eq!(track.extra_data_text(0, &calibration), "0 px/f");

    track.extra_data = ExtraData::Acceleration;
    assert_eq!(track.extra_data_text(2, &calibration), "");
  }
}
