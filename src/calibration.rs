use crate::all::*;

use serde::{Deserialize, Serialize};

// Pixel to real world conversion. The user calibrates the scene by giving a
// line drawing a real length, which fixes `pixel_to_unit`; speeds also need
// the real-action frame rate, which may differ from the video frame rate for
// high speed cameras.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthUnit {
  Centimeters,
  Meters,
  Inches,
  Feet,
  Yards,
  Pixels,
}

impl LengthUnit {
  pub fn abbreviation(&self) -> &'static str {
    match self {
      LengthUnit::Centimeters => "cm",
      LengthUnit::Meters => "m",
      LengthUnit::Inches => "in",
      LengthUnit::Feet => "ft",
      LengthUnit::Yards => "yd",
      LengthUnit::Pixels => "px",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedUnit {
  FeetPerSecond,
  MetersPerSecond,
  KilometersPerHour,
  MilesPerHour,
  Knots,
  PixelsPerFrame,
}

impl SpeedUnit {
  pub fn abbreviation(&self) -> &'static str {
    match self {
      SpeedUnit::FeetPerSecond => "ft/s",
      SpeedUnit::MetersPerSecond => "m/s",
      SpeedUnit::KilometersPerHour => "km/h",
      SpeedUnit::MilesPerHour => "mph",
      SpeedUnit::Knots => "kn",
      SpeedUnit::PixelsPerFrame => "px/f",
    }
  }
}

#[derive(Clone, Debug)]
pub struct CalibrationHelper {
  pub length_unit: LengthUnit,
  // Real world units per pixel, from the user's line calibration.
  pub pixel_to_unit: f64,
  pub speed_unit: SpeedUnit,
  // Origin of the user coordinate system; (-1, -1) when unset.
  pub coordinates_origin: Pixel,
  // Frames per second of the real action, which takes high speed cameras
  // into account and may differ from the video frame rate.
  pub frames_per_seconds: f64,
}

impl Default for CalibrationHelper {
  fn default() -> CalibrationHelper {
    CalibrationHelper {
      length_unit: LengthUnit::Pixels,
      pixel_to_unit: 1.0,
      speed_unit: SpeedUnit::PixelsPerFrame,
      coordinates_origin: Pixel::new(-1, -1),
      frames_per_seconds: 25.0,
    }
  }
}

impl CalibrationHelper {
  pub fn is_origin_set(&self) -> bool {
    self.coordinates_origin[0] >= 0 && self.coordinates_origin[1] >= 0
  }

  pub fn length_abbreviation(&self) -> &'static str {
    self.length_unit.abbreviation()
  }

  pub fn length_in_user_unit(&self, pixel_length: f64) -> f64 {
    pixel_length * self.pixel_to_unit
  }

  // Point in the user coordinate system: origin relative, Y up.
  pub fn point_in_user_unit(&self, p: Pixel) -> Vector2d {
    let x = self.length_in_user_unit((p[0] - self.coordinates_origin[0]) as f64);
    let y = self.length_in_user_unit((self.coordinates_origin[1] - p[1]) as f64);
    Vector2d::new(x, y)
  }

  // Length with the unit abbreviation. Two digits of precision except for
  // pixels.
  pub fn length_text(&self, pixel_length: f64) -> String {
    if self.length_unit == LengthUnit::Pixels {
      format!("{:.0} {}", pixel_length, self.length_abbreviation())
    }
    else {
      format!(
        "{:.2} {}",
        self.length_in_user_unit(pixel_length),
        self.length_abbreviation(),
      )
    }
  }

  // Speed between two points with the unit abbreviation. `frames` is the
  // frame count between the two measurements.
  pub fn speed_text(&self, p1: Pixel, p2: Pixel, frames: i32) -> String {
    if p1 == p2 || frames == 0 {
      return format!("0 {}", self.speed_unit.abbreviation());
    }

    // The user may prefer a speed unit that is unusable because the video
    // was never calibrated. Fall back to px/f without touching the stored
    // preference.
    let mut unit = self.speed_unit;
    if self.length_unit == LengthUnit::Pixels && self.speed_unit != SpeedUnit::PixelsPerFrame {
      unit = SpeedUnit::PixelsPerFrame;
    }

    let speed = self.speed_in_user_unit(p1, p2, frames, unit);
    if unit == SpeedUnit::PixelsPerFrame {
      format!("{:.0} {}", speed, unit.abbreviation())
    }
    else {
      format!("{:.2} {}", speed, unit.abbreviation())
    }
  }

  fn speed_in_user_unit(&self, p1: Pixel, p2: Pixel, frames: i32, unit: SpeedUnit) -> f64 {
    if p1 == p2 {
      return 0.0;
    }

    let pixel_length = pixel_distance(p1, p2);
    let unit_length = self.length_in_user_unit(pixel_length);
    let speed_length = self.convert_length_for_speed_unit(unit_length, self.length_unit, unit);
    let speed = self.convert_to_speed_unit(speed_length, frames, unit);

    debug!(
      "Pixel conversion for speed. Input: {:.2} px over {} frames, length: {:.2} {}, converted: {:.2}, speed: {:.2} {}",
      pixel_length, frames,
      unit_length, self.length_abbreviation(),
      speed_length, speed, unit.abbreviation(),
    );

    speed
  }

  // Convert a length between user units, e.g. the scene was calibrated in
  // centimeters and the speed is wanted in km/h. Standard ratios:
  // 1 inch = 0.0254 m, 1 foot = 0.3048 m, 1 yard = 0.9144 m,
  // 1 mile = 1609.344 m, 1 nautical mile = 1852 m.
  pub fn convert_length_for_speed_unit(
    &self,
    length: f64,
    length_unit: LengthUnit,
    speed_unit: SpeedUnit,
  ) -> f64 {
    match length_unit {
      LengthUnit::Centimeters => match speed_unit {
        SpeedUnit::FeetPerSecond => length / 30.48,
        SpeedUnit::MetersPerSecond => length / 100.0,
        SpeedUnit::KilometersPerHour => length / 100_000.0,
        SpeedUnit::MilesPerHour => length / 160_934.4,
        SpeedUnit::Knots => length / 185_200.0,
        SpeedUnit::PixelsPerFrame => length / self.pixel_to_unit,
      },
      LengthUnit::Meters => match speed_unit {
        SpeedUnit::FeetPerSecond => length / 0.3048,
        SpeedUnit::MetersPerSecond => length,
        SpeedUnit::KilometersPerHour => length / 1000.0,
        SpeedUnit::MilesPerHour => length / 1609.344,
        SpeedUnit::Knots => length / 1852.0,
        SpeedUnit::PixelsPerFrame => length / self.pixel_to_unit,
      },
      LengthUnit::Inches => match speed_unit {
        SpeedUnit::FeetPerSecond => length / 12.0,
        SpeedUnit::MetersPerSecond => length / 39.3700787,
        SpeedUnit::KilometersPerHour => length / 39_370.0787,
        SpeedUnit::MilesPerHour => length / 63_360.0,
        SpeedUnit::Knots => length / 72_913.3858,
        SpeedUnit::PixelsPerFrame => length / self.pixel_to_unit,
      },
      LengthUnit::Feet => match speed_unit {
        SpeedUnit::FeetPerSecond => length,
        SpeedUnit::MetersPerSecond => length / 3.2808399,
        SpeedUnit::KilometersPerHour => length / 3280.8399,
        SpeedUnit::MilesPerHour => length / 5280.0,
        SpeedUnit::Knots => length / 6076.11549,
        SpeedUnit::PixelsPerFrame => length / self.pixel_to_unit,
      },
      LengthUnit::Yards => match speed_unit {
        SpeedUnit::FeetPerSecond => length * 3.0,
        SpeedUnit::MetersPerSecond => length / 1.0936133,
        SpeedUnit::KilometersPerHour => length / 1093.6133,
        SpeedUnit::MilesPerHour => length / 1760.0,
        SpeedUnit::Knots => length / 2025.37183,
        SpeedUnit::PixelsPerFrame => length / self.pixel_to_unit,
      },
      LengthUnit::Pixels => {
        // The image is not calibrated; only px/f is computable.
        if speed_unit != SpeedUnit::PixelsPerFrame {
          error!("Cannot compute speed: image is not calibrated and speed is required in real world units.");
          0.0
        }
        else {
          length
        }
      },
    }
  }

  // From a length per `frames` frames to the time base of the speed unit.
  fn convert_to_speed_unit(&self, raw_speed: f64, frames: i32, speed_unit: SpeedUnit) -> f64 {
    let per_second = raw_speed / frames as f64 * self.frames_per_seconds;
    match speed_unit {
      SpeedUnit::FeetPerSecond | SpeedUnit::MetersPerSecond => per_second,
      SpeedUnit::KilometersPerHour | SpeedUnit::MilesPerHour | SpeedUnit::Knots => {
        per_second * 3600.0
      },
      SpeedUnit::PixelsPerFrame => raw_speed / frames as f64,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_length_conversion_constants() {
    let calibration = CalibrationHelper::default();

    // 100 cm is 1 m.
    let meters = calibration.convert_length_for_speed_unit(
      100.0, LengthUnit::Centimeters, SpeedUnit::MetersPerSecond,
    );
    assert!((meters - 1.0).abs() < 1e-9);

    // 1 mile is 1609.344 m.
    let miles = calibration.convert_length_for_speed_unit(
      1609.344, LengthUnit::Meters, SpeedUnit::MilesPerHour,
    );
    assert!((miles - 1.0).abs() < 1e-3);

    let feet = calibration.convert_length_for_speed_unit(
      0.3048, LengthUnit::Meters, SpeedUnit::FeetPerSecond,
    );
    assert!((feet - 1.0).abs() < 1e-9);

    let yards_to_feet = calibration.convert_length_for_speed_unit(
      1.0, LengthUnit::Yards, SpeedUnit::FeetPerSecond,
    );
    assert!((yards_to_feet - 3.0).abs() < 1e-9);
  }

  #[test]
  fn test_uncalibrated_speed_falls_back_to_pixels() {
    let mut calibration = CalibrationHelper::default();
    calibration.speed_unit = SpeedUnit::MetersPerSecond;

    // The preference is not usable without calibration; px/f is substituted
    // and the preference itself is left alone.
    let text = calibration.speed_text(Pixel::new(0, 0), Pixel::new(30, 40), 2);
    assert_eq!(text, "25 px/f");
    assert_eq!(calibration.speed_unit, SpeedUnit::MetersPerSecond);
  }

  #[test]
  fn test_speed_in_real_units() {
    let mut calibration = CalibrationHelper::default();
    calibration.length_unit = LengthUnit::Meters;
    calibration.pixel_to_unit = 0.01; // 1 px is 1 cm.
    calibration.speed_unit = SpeedUnit::MetersPerSecond;
    calibration.frames_per_seconds = 25.0;

    // 100 px over 1 frame: 1 m per frame, 25 m/s.
    let text = calibration.speed_text(Pixel::new(0, 0), Pixel::new(100, 0), 1);
    assert_eq!(text, "25.00 m/s");

    calibration.speed_unit = SpeedUnit::KilometersPerHour;
    let text = calibration.speed_text(Pixel::new(0, 0), Pixel::new(100, 0), 1);
    assert_eq!(text, "90.00 km/h");
  }

  #[test]
  fn test_degenerate_speed_is_zero() {
    let calibration = CalibrationHelper::default();
    assert_eq!(calibration.speed_text(Pixel::new(5, 5), Pixel::new(5, 5), 3), "0 px/f");
    assert_eq!(calibration.speed_text(Pixel::new(0, 0), Pixel::new(5, 5), 0), "0 px/f");
  }

  #[test]
  fn test_length_text_precision() {
    let mut calibration = CalibrationHelper::default();
    assert_eq!(calibration.length_text(12.345), "12 px");

    calibration.length_unit = LengthUnit::Meters;
    calibration.pixel_to_unit = 0.5;
    assert_eq!(calibration.length_text(12.3), "6.15 m");
  }

  #[test]
  fn test_point_in_user_unit_flips_y() {
    let mut calibration = CalibrationHelper::default();
    calibration.coordinates_origin = Pixel::new(10, 100);
    let p = calibration.point_in_user_unit(Pixel::new(30, 60));
    assert_eq!(p, Vector2d::new(20.0, 40.0));
  }
}
