use crate::all::*;

// One tracked position of a trajectory. Besides the coordinates and the
// timestamp (relative to the first point of the track), the point carries the
// tracker's working data: the cached template patch used to find the point in
// the next frame, and the correlation score of the match that produced it.
//
// Points reconstructed from the archive have no template; it is rebuilt from
// the video frame on the next manual edit.
#[derive(Clone)]
pub struct TrackPoint {
  pub x: i32,
  pub y: i32,
  // Timestamp relative to the first point of the track.
  pub t: i64,
  pub template: Option<Image>,
  pub similarity: f64,
  // Set for points placed or adjusted by hand.
  pub is_reference: bool,
}

impl TrackPoint {
  pub fn new(x: i32, y: i32, t: i64) -> TrackPoint {
    TrackPoint {
      x,
      y,
      t,
      template: None,
      similarity: 0.0,
      is_reference: false,
    }
  }

  pub fn point(&self) -> Pixel {
    Pixel::new(self.x, self.y)
  }

  // Drop the tracker working data. Used when the user manually moves the
  // point; the template no longer matches the stored coordinates.
  pub fn reset_track_data(&mut self) {
    self.template = None;
    self.similarity = 0.0;
  }

  pub fn to_text(&self) -> String {
    format!("{};{};{}", self.x, self.y, self.t)
  }

  // Parse the "x;y;t" encoding. Malformed input yields (0, 0, 0) rather than
  // an error; the archive loader treats such a point as suspect but keeps
  // the rest of the document.
  pub fn from_text(text: &str) -> TrackPoint {
    let mut split = text.split(';');
    let parsed = (|| {
      let x = split.next()?.trim().parse::<i32>().ok()?;
      let y = split.next()?.trim().parse::<i32>().ok()?;
      let t = split.next()?.trim().parse::<i64>().ok()?;
      Some((x, y, t))
    })();

    match parsed {
      Some((x, y, t)) => TrackPoint::new(x, y, t),
      None => TrackPoint::new(0, 0, 0),
    }
  }
}

impl fmt::Debug for TrackPoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TrackPoint")
      .field("x", &self.x)
      .field("y", &self.y)
      .field("t", &self.t)
      .field("similarity", &self.similarity)
      .field("has_template", &self.template.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_text_round_trip() {
    let p = TrackPoint::new(120, -45, 4004);
    assert_eq!(p.to_text(), "120;-45;4004");
    let q = TrackPoint::from_text(&p.to_text());
    assert_eq!((q.x, q.y, q.t), (120, -45, 4004));
  }

  #[test]
  fn test_parse_fallback() {
    for text in ["", "12;34", "a;b;c", "12.5;3;4"] {
      let p = TrackPoint::from_text(text);
      assert_eq!((p.x, p.y, p.t), (0, 0, 0), "input {:?}", text);
    }
    // Trailing fields are ignored, first three parsed.
    let p = TrackPoint::from_text("1;2;3;junk");
    assert_eq!((p.x, p.y, p.t), (1, 2, 3));
  }

  #[test]
  fn test_reset_track_data() {
    let mut p = TrackPoint::new(1, 2, 3);
    p.template = Some(Image::new(4, 4));
    p.similarity = 0.9;
    p.reset_track_data();
    assert!(p.template.is_none());
    assert_eq!(p.similarity, 0.0);
  }
}
