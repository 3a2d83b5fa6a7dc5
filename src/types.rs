// Eigen-like aliases.
pub type Vector2d = nalgebra::Vector2::<f64>;
pub type Pixel = nalgebra::Vector2::<i32>;

pub fn from_f64(p: &Vector2d) -> Pixel {
  Pixel::new(p[0] as i32, p[1] as i32)
}

pub fn to_f64(p: &Pixel) -> Vector2d {
  Vector2d::new(p[0] as f64, p[1] as f64)
}

// Integer width/height pair, image or screen space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
  pub width: i32,
  pub height: i32,
}

impl Size {
  pub fn new(width: i32, height: i32) -> Size {
    Size { width, height }
  }
}

// Axis-aligned integer rectangle. Top-left origin like the image buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
  pub x: i32,
  pub y: i32,
  pub width: i32,
  pub height: i32,
}

impl Rect {
  pub fn new(x: i32, y: i32, width: i32, height: i32) -> Rect {
    Rect { x, y, width, height }
  }

  pub fn empty() -> Rect {
    Rect { x: 0, y: 0, width: 0, height: 0 }
  }

  pub fn from_size(size: Size) -> Rect {
    Rect { x: 0, y: 0, width: size.width, height: size.height }
  }

  pub fn is_empty(&self) -> bool {
    self.width <= 0 || self.height <= 0
  }

  pub fn left(&self) -> i32 { self.x }
  pub fn top(&self) -> i32 { self.y }
  pub fn right(&self) -> i32 { self.x + self.width }
  pub fn bottom(&self) -> i32 { self.y + self.height }

  pub fn location(&self) -> Pixel {
    Pixel::new(self.x, self.y)
  }

  pub fn size(&self) -> Size {
    Size::new(self.width, self.height)
  }

  pub fn center(&self) -> Pixel {
    Pixel::new(self.x + self.width / 2, self.y + self.height / 2)
  }

  pub fn contains(&self, p: Pixel) -> bool {
    p[0] >= self.x && p[0] < self.right() && p[1] >= self.y && p[1] < self.bottom()
  }

  pub fn intersect(&self, other: &Rect) -> Rect {
    let x = i32::max(self.x, other.x);
    let y = i32::max(self.y, other.y);
    let right = i32::min(self.right(), other.right());
    let bottom = i32::min(self.bottom(), other.bottom());
    if right <= x || bottom <= y {
      return Rect::empty();
    }
    Rect { x, y, width: right - x, height: bottom - y }
  }

  pub fn translated(&self, dx: i32, dy: i32) -> Rect {
    Rect { x: self.x + dx, y: self.y + dy, ..*self }
  }
}

// Square box of the given radius around a point.
pub fn box_around(p: Pixel, radius: i32) -> Rect {
  Rect::new(p[0] - radius, p[1] - radius, radius * 2, radius * 2)
}

// Rectangle of the given size centered on a point.
pub fn box_of_size(p: Pixel, size: Size) -> Rect {
  Rect::new(p[0] - size.width / 2, p[1] - size.height / 2, size.width, size.height)
}

pub fn pixel_distance(p1: Pixel, p2: Pixel) -> f64 {
  let dx = (p1[0] - p2[0]) as f64;
  let dy = (p1[1] - p2[1]) as f64;
  (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_intersect() {
    let a = Rect::new(-10, -10, 80, 80);
    let b = Rect::new(0, 0, 100, 100);
    assert_eq!(a.intersect(&b), Rect::new(0, 0, 70, 70));
    assert_eq!(b.intersect(&a), Rect::new(0, 0, 70, 70));

    let c = Rect::new(200, 200, 10, 10);
    assert!(b.intersect(&c).is_empty());
  }

  #[test]
  fn test_boxes() {
    assert_eq!(box_around(Pixel::new(5, 5), 2), Rect::new(3, 3, 4, 4));
    assert_eq!(
      box_of_size(Pixel::new(50, 40), Size::new(100, 80)),
      Rect::new(0, 0, 100, 80),
    );
  }

  #[test]
  fn test_contains() {
    let r = Rect::new(0, 0, 10, 10);
    assert!(r.contains(Pixel::new(0, 0)));
    assert!(r.contains(Pixel::new(9, 9)));
    assert!(!r.contains(Pixel::new(10, 9)));
  }
}
