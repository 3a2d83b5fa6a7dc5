use crate::all::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}

impl Rgba {
  pub const BLACK: Rgba = Rgba { r: 0, g: 0, b: 0, a: 255 };
  pub const WHITE: Rgba = Rgba { r: 255, g: 255, b: 255, a: 255 };
  pub const SEA_GREEN: Rgba = Rgba { r: 46, g: 139, b: 87, a: 255 };

  pub fn new(r: u8, g: u8, b: u8) -> Rgba {
    Rgba { r, g, b, a: 255 }
  }

  pub fn with_alpha(&self, a: u8) -> Rgba {
    Rgba { a, ..*self }
  }

  // Black or white, whichever reads better over this color.
  pub fn contrast(&self) -> Rgba {
    let luma = 0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64;
    if luma > 128.0 { Rgba::BLACK } else { Rgba::WHITE }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackShape {
  Solid,
  Dash,
  SolidSteps,
  DashSteps,
}

impl TrackShape {
  pub fn dashed(&self) -> bool {
    matches!(self, TrackShape::Dash | TrackShape::DashSteps)
  }

  // Whether each tracked point gets a small circle along the curve.
  pub fn show_steps(&self) -> bool {
    matches!(self, TrackShape::SolidSteps | TrackShape::DashSteps)
  }

  pub fn name(&self) -> &'static str {
    match self {
      TrackShape::Solid => "Solid",
      TrackShape::Dash => "Dash",
      TrackShape::SolidSteps => "SolidSteps",
      TrackShape::DashSteps => "DashSteps",
    }
  }

  pub fn parse(name: &str) -> Option<TrackShape> {
    match name {
      "Solid" => Some(TrackShape::Solid),
      "Dash" => Some(TrackShape::Dash),
      "SolidSteps" => Some(TrackShape::SolidSteps),
      "DashSteps" => Some(TrackShape::DashSteps),
      _ => None,
    }
  }
}

// Decoration of one trajectory. A plain value object; the track exposes
// setters that keep dependent elements (the main label back color) in sync.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackStyle {
  pub color: Rgba,
  pub line_size: i32,
  pub shape: TrackShape,
}

impl Default for TrackStyle {
  fn default() -> TrackStyle {
    TrackStyle {
      color: Rgba::SEA_GREEN,
      line_size: 3,
      shape: TrackShape::Solid,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_shape_names_round_trip() {
    for shape in [
      TrackShape::Solid,
      TrackShape::Dash,
      TrackShape::SolidSteps,
      TrackShape::DashSteps,
    ] {
      assert_eq!(TrackShape::parse(shape.name()), Some(shape));
    }
    assert_eq!(TrackShape::parse("Wavy"), None);
  }

  #[test]
  fn test_contrast() {
    assert_eq!(Rgba::WHITE.contrast(), Rgba::BLACK);
    assert_eq!(Rgba::BLACK.contrast(), Rgba::WHITE);
    assert_eq!(Rgba::new(20, 30, 40).contrast(), Rgba::WHITE);
  }
}
