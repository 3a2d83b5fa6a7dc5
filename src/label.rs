use crate::all::*;

// A user-marked timestamp of interest in the parent video, independent of any
// trajectory. The document owns the list; tracks only read it.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe {
  pub position: i64,
  pub title: String,
}

impl Keyframe {
  pub fn new(position: i64, title: &str) -> Keyframe {
    Keyframe { position, title: title.to_string() }
  }
}

// A mini label made of an attach point on the trajectory and a small movable
// text box. Used for keyframe markers along the track and for the main label
// that follows the current point. Coordinates are image space; the box size
// is refreshed from the measured text just before drawing.
#[derive(Clone, Debug)]
pub struct KeyframeLabel {
  pub timestamp: i64,
  // Index of the track point the label is attached to.
  pub attach_index: usize,
  pub text: String,
  pub back_color: Rgba,
  attach_location: Pixel,
  background: Rect,
}

const LABEL_FONT_SIZE: f64 = 8.0;

impl KeyframeLabel {
  pub fn new(attach_point: Pixel, color: Rgba) -> KeyframeLabel {
    KeyframeLabel {
      timestamp: 0,
      attach_index: 0,
      text: String::from("Label"),
      back_color: color.with_alpha(160),
      attach_location: attach_point,
      background: Rect::new(attach_point[0] - 20, attach_point[1] - 50, 0, 0),
    }
  }

  pub fn attach_location(&self) -> Pixel {
    self.attach_location
  }

  pub fn background(&self) -> Rect {
    self.background
  }

  pub fn set_text(&mut self, text: &str) {
    self.text = text.to_string();
  }

  // Move the attach point; the box follows when `move_label` is set, so a
  // label keeps its position relative to the point it annotates.
  pub fn set_attach(&mut self, point: Pixel, move_label: bool) {
    let dx = point[0] - self.attach_location[0];
    let dy = point[1] - self.attach_location[1];
    self.attach_location = point;
    if move_label {
      self.background = self.background.translated(dx, dy);
    }
  }

  pub fn set_label_position(&mut self, location: Pixel) {
    self.background.x = location[0];
    self.background.y = location[1];
  }

  pub fn move_label(&mut self, dx: i32, dy: i32) {
    self.background = self.background.translated(dx, dy);
  }

  pub fn hit_test(&self, point: Pixel) -> bool {
    !self.background.is_empty() && self.background.contains(point)
  }

  pub fn draw(
    &mut self,
    canvas: &mut dyn Canvas,
    transformer: &CoordinateSystem,
    opacity: f64,
  ) {
    let back = self.back_color.with_alpha((opacity * 255.0) as u8);
    let connector = Pen::new(self.back_color.with_alpha((opacity * 64.0) as u8), 1);
    let foreground = self.back_color.contrast().with_alpha((opacity * 255.0) as u8);

    // Keep the hit box in sync with the rendered text.
    let text_size = canvas.measure_text(&self.text, LABEL_FONT_SIZE);
    self.background.width = text_size.width;
    self.background.height = text_size.height;

    let attach = transformer.transform(self.attach_location);
    let center = transformer.transform(self.background.center());
    canvas.fill_ellipse(back, box_around(attach, 2));
    canvas.draw_line(&connector, attach, center);

    let location = transformer.transform(self.background.location());
    let font_size = LABEL_FONT_SIZE * transformer.scale();
    let size = canvas.measure_text(&self.text, font_size);
    let rect = Rect::new(location[0], location[1], size.width, size.height);
    canvas.fill_rounded_rectangle(back, rect, size.height / 4);
    canvas.draw_text(&self.text, foreground, rect.location(), font_size);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_attach_moves_label() {
    let mut label = KeyframeLabel::new(Pixel::new(100, 100), Rgba::SEA_GREEN);
    let before = label.background().location();

    label.set_attach(Pixel::new(110, 105), true);
    let after = label.background().location();
    assert_eq!(after - before, Pixel::new(10, 5));

    // Without move_label the box stays put.
    label.set_attach(Pixel::new(200, 200), false);
    assert_eq!(label.background().location(), after);
    assert_eq!(label.attach_location(), Pixel::new(200, 200));
  }

  #[test]
  fn test_hit_test_requires_drawn_box() {
    let mut label = KeyframeLabel::new(Pixel::new(100, 100), Rgba::SEA_GREEN);
    // Box has no size until first drawn.
    assert!(!label.hit_test(Pixel::new(80, 50)));

    let mut canvas = RecordingCanvas::new();
    let cs = CoordinateSystem::new(Size::new(640, 480));
    label.set_text("speed");
    label.draw(&mut canvas, &cs, 1.0);

    let inside = label.background().center();
    assert!(label.hit_test(inside));
    assert!(!label.hit_test(Pixel::new(0, 0)));
  }
}
