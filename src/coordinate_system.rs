use crate::all::*;

// Maps between the coordinate system of the original image and the one of the
// rendered view, which may be stretched to fit the display surface and zoomed
// into a sub window of the image. Drawing data is stored in image space; the
// renderer asks for the transform, mouse input goes through the inverse.
//
// All conversions truncate toward zero. Rounding would drift differently at
// some zoom levels and existing files depend on the truncated positions.
#[derive(Clone, Debug)]
pub struct CoordinateSystem {
  // Display scale factor relative to the original image size.
  pub stretch: f64,
  // User-directed magnification, 1.0 or more.
  pub zoom: f64,
  // Allow the zoom window to leave the image bounds.
  pub free_move: bool,
  // Sub rectangle of the original image currently shown when zoomed.
  zoom_window: Rect,
  original_size: Size,
}

impl CoordinateSystem {
  pub fn new(size: Size) -> CoordinateSystem {
    CoordinateSystem {
      stretch: 1.0,
      zoom: 1.0,
      free_move: false,
      zoom_window: Rect::from_size(size),
      original_size: size,
    }
  }

  // Barebone system with no stretch and no zoom at the current image size.
  pub fn identity(&self) -> CoordinateSystem {
    CoordinateSystem::new(self.original_size)
  }

  pub fn scale(&self) -> f64 {
    self.stretch * self.zoom
  }

  pub fn zooming(&self) -> bool {
    self.zoom > 1.0
  }

  pub fn zoom_window(&self) -> Rect {
    self.zoom_window
  }

  pub fn location(&self) -> Pixel {
    self.zoom_window.location()
  }

  pub fn set_original_size(&mut self, size: Size) {
    self.original_size = size;
  }

  pub fn reset(&mut self) {
    self.stretch = 1.0;
    self.zoom = 1.0;
    self.zoom_window = Rect::empty();
  }

  pub fn reinit_zoom(&mut self) {
    self.zoom = 1.0;
    self.zoom_window = Rect::from_size(self.original_size);
  }

  // Recompute the zoom window for the current zoom factor, keeping the center.
  pub fn relocate_zoom_window(&mut self) {
    self.relocate_zoom_window_at(self.zoom_window.center());
  }

  pub fn relocate_zoom_window_at(&mut self, center: Pixel) {
    let new_width = (self.original_size.width as f64 / self.zoom) as i32;
    let new_height = (self.original_size.height as f64 / self.zoom) as i32;

    let mut new_left = center[0] - new_width / 2;
    let mut new_top = center[1] - new_height / 2;

    if !self.free_move {
      if new_left < 0 { new_left = 0 }
      if new_left + new_width >= self.original_size.width {
        new_left = self.original_size.width - new_width;
      }
      if new_top < 0 { new_top = 0 }
      if new_top + new_height >= self.original_size.height {
        new_top = self.original_size.height - new_height;
      }
    }

    self.zoom_window = Rect::new(new_left, new_top, new_width, new_height);
  }

  // Pan the zoom window by an image-space delta, keeping the zoom factor.
  pub fn move_zoom_window(&mut self, dx: f64, dy: f64) {
    let mut new_left = (self.zoom_window.left() as f64 - dx) as i32;
    let mut new_top = (self.zoom_window.top() as f64 - dy) as i32;

    if !self.free_move {
      if new_left < 0 { new_left = 0 }
      if new_top < 0 { new_top = 0 }
      if new_left + self.zoom_window.width >= self.original_size.width {
        new_left = self.original_size.width - self.zoom_window.width;
      }
      if new_top + self.zoom_window.height >= self.original_size.height {
        new_top = self.original_size.height - self.zoom_window.height;
      }
    }

    self.zoom_window = Rect::new(
      new_left,
      new_top,
      self.zoom_window.width,
      self.zoom_window.height,
    );
  }

  // Image space to screen space. Zoom and translate, then stretch.
  pub fn transform(&self, point: Pixel) -> Pixel {
    let zoomed_x = (point[0] - self.zoom_window.left()) as f64 * self.zoom;
    let zoomed_y = (point[1] - self.zoom_window.top()) as f64 * self.zoom;
    Pixel::new(
      (zoomed_x * self.stretch) as i32,
      (zoomed_y * self.stretch) as i32,
    )
  }

  // Screen space back to image space, exact inverse of `transform`.
  pub fn untransform(&self, point: Pixel) -> Pixel {
    let unstretched_x = point[0] as f64 / self.stretch;
    let unstretched_y = point[1] as f64 / self.stretch;
    Pixel::new(
      (self.zoom_window.left() as f64 + unstretched_x / self.zoom) as i32,
      (self.zoom_window.top() as f64 + unstretched_y / self.zoom) as i32,
    )
  }

  // Scale-only variant for lengths.
  pub fn transform_length(&self, length: i32) -> i32 {
    (length as f64 * self.stretch * self.zoom) as i32
  }

  pub fn transform_size(&self, size: Size) -> Size {
    Size::new(
      self.transform_length(size.width),
      self.transform_length(size.height),
    )
  }

  pub fn transform_rect(&self, rect: Rect) -> Rect {
    let location = self.transform(rect.location());
    let size = self.transform_size(rect.size());
    Rect::new(location[0], location[1], size.width, size.height)
  }
}
