use crate::all::*;

// The core never touches a real drawing surface. Rendering goes through this
// trait with screen-space coordinates produced by the coordinate system; the
// host is free to back it with any 2d API that has lines, ellipses and text.

#[derive(Clone, Debug, PartialEq)]
pub struct Pen {
  pub color: Rgba,
  pub width: i32,
  pub dashed: bool,
}

impl Pen {
  pub fn new(color: Rgba, width: i32) -> Pen {
    Pen { color, width, dashed: false }
  }
}

pub trait Canvas {
  fn draw_line(&mut self, pen: &Pen, a: Pixel, b: Pixel);
  fn draw_rectangle(&mut self, pen: &Pen, rect: Rect);
  fn draw_ellipse(&mut self, pen: &Pen, rect: Rect);
  fn fill_ellipse(&mut self, color: Rgba, rect: Rect);
  // Pie slice of the ellipse inscribed in `rect`, angles in degrees.
  fn fill_arc(&mut self, color: Rgba, rect: Rect, start: f64, sweep: f64);
  // Smooth curve through all the points, cardinal spline style.
  fn draw_curve(&mut self, pen: &Pen, points: &[Pixel], tension: f64);
  fn fill_rounded_rectangle(&mut self, color: Rgba, rect: Rect, radius: i32);
  fn draw_text(&mut self, text: &str, color: Rgba, origin: Pixel, font_size: f64);
  fn measure_text(&mut self, text: &str, font_size: f64) -> Size;
}

// Sample a cardinal spline through the control points into a polyline.
// Tension 0.5 gives the classic Catmull-Rom curve. Surfaces without a native
// spline primitive can draw the returned segments; the hit testing below
// uses the same expansion so what is hit is what was drawn.
pub fn flatten_curve(points: &[Pixel], tension: f64, steps: usize) -> Vec<Pixel> {
  if points.len() < 2 || steps == 0 {
    return points.to_vec();
  }

  let p = |i: isize| -> Vector2d {
    let i = i.clamp(0, points.len() as isize - 1) as usize;
    to_f64(&points[i])
  };

  let mut out = Vec::with_capacity((points.len() - 1) * steps + 1);
  out.push(points[0]);

  for i in 0..points.len() as isize - 1 {
    let p0 = p(i);
    let p1 = p(i + 1);
    let m0 = (p1 - p(i - 1)) * tension;
    let m1 = (p(i + 2) - p0) * tension;

    for s in 1..=steps {
      let t = s as f64 / steps as f64;
      let t2 = t * t;
      let t3 = t2 * t;
      let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
      let h10 = t3 - 2.0 * t2 + t;
      let h01 = -2.0 * t3 + 3.0 * t2;
      let h11 = t3 - t2;
      let q = p0 * h00 + m0 * h10 + p1 * h01 + m1 * h11;
      out.push(Pixel::new(q[0].round() as i32, q[1].round() as i32));
    }
  }
  out
}

// Distance from a point to the closest segment of a polyline.
pub fn distance_to_polyline(p: Pixel, polyline: &[Pixel]) -> f64 {
  let mut best = f64::MAX;
  let pf = to_f64(&p);
  for w in polyline.windows(2) {
    let a = to_f64(&w[0]);
    let b = to_f64(&w[1]);
    let ab = b - a;
    let len2 = ab.dot(&ab);
    let t = if len2 == 0.0 { 0.0 } else { ((pf - a).dot(&ab) / len2).clamp(0.0, 1.0) };
    let closest = a + ab * t;
    best = f64::min(best, (pf - closest).norm());
  }
  best
}

// Surface that records the primitives instead of rasterizing them. Used by
// the tests and handy for dumping what a frame would have drawn.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
  Line { pen: Pen, a: Pixel, b: Pixel },
  Rectangle { pen: Pen, rect: Rect },
  Ellipse { pen: Pen, rect: Rect },
  FillEllipse { color: Rgba, rect: Rect },
  FillArc { color: Rgba, rect: Rect, start: f64, sweep: f64 },
  Curve { pen: Pen, points: Vec<Pixel>, tension: f64 },
  RoundedRectangle { color: Rgba, rect: Rect, radius: i32 },
  Text { text: String, color: Rgba, origin: Pixel, font_size: f64 },
}

#[derive(Default)]
pub struct RecordingCanvas {
  pub ops: Vec<DrawOp>,
}

impl RecordingCanvas {
  pub fn new() -> RecordingCanvas {
    RecordingCanvas { ops: vec![] }
  }

  pub fn curves(&self) -> Vec<&DrawOp> {
    self.ops.iter().filter(|op| matches!(op, DrawOp::Curve { .. })).collect()
  }
}

impl Canvas for RecordingCanvas {
  fn draw_line(&mut self, pen: &Pen, a: Pixel, b: Pixel) {
    self.ops.push(DrawOp::Line { pen: pen.clone(), a, b });
  }

  fn draw_rectangle(&mut self, pen: &Pen, rect: Rect) {
    self.ops.push(DrawOp::Rectangle { pen: pen.clone(), rect });
  }

  fn draw_ellipse(&mut self, pen: &Pen, rect: Rect) {
    self.ops.push(DrawOp::Ellipse { pen: pen.clone(), rect });
  }

  fn fill_ellipse(&mut self, color: Rgba, rect: Rect) {
    self.ops.push(DrawOp::FillEllipse { color, rect });
  }

  fn fill_arc(&mut self, color: Rgba, rect: Rect, start: f64, sweep: f64) {
    self.ops.push(DrawOp::FillArc { color, rect, start, sweep });
  }

  fn draw_curve(&mut self, pen: &Pen, points: &[Pixel], tension: f64) {
    self.ops.push(DrawOp::Curve { pen: pen.clone(), points: points.to_vec(), tension });
  }

  fn fill_rounded_rectangle(&mut self, color: Rgba, rect: Rect, radius: i32) {
    self.ops.push(DrawOp::RoundedRectangle { color, rect, radius });
  }

  fn draw_text(&mut self, text: &str, color: Rgba, origin: Pixel, font_size: f64) {
    self.ops.push(DrawOp::Text { text: text.to_string(), color, origin, font_size });
  }

  fn measure_text(&mut self, text: &str, font_size: f64) -> Size {
    // Rough monospace estimate, deterministic for tests.
    let width = (text.chars().count() as f64 * font_size * 0.6).ceil() as i32;
    let height = (font_size * 1.2).ceil() as i32;
    Size::new(i32::max(width, 1), height)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_flatten_passes_through_control_points() {
    let points = vec![
      Pixel::new(0, 0),
      Pixel::new(10, 20),
      Pixel::new(30, 5),
      Pixel::new(45, 40),
    ];
    let flat = flatten_curve(&points, 0.5, 8);
    for p in &points {
      assert!(flat.contains(p), "{:?} not on flattened curve", p);
    }
    assert_eq!(flat.len(), 3 * 8 + 1);
  }

  #[test]
  fn test_flatten_degenerate() {
    let single = vec![Pixel::new(3, 4)];
    assert_eq!(flatten_curve(&single, 0.5, 8), single);
  }

  #[test]
  fn test_distance_to_polyline() {
    let line = vec![Pixel::new(0, 0), Pixel::new(10, 0)];
    assert_eq!(distance_to_polyline(Pixel::new(5, 3), &line), 3.0);
    assert_eq!(distance_to_polyline(Pixel::new(-4, 0), &line), 4.0);
    assert_eq!(distance_to_polyline(Pixel::new(10, 0), &line), 0.0);
  }
}
