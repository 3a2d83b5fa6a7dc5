// Point tracking for video motion analysis: template matching trackers, the
// trajectory state machine, image/screen coordinate transforms and the
// calibrated measurement helpers. The host application supplies decoded
// frames and a drawing surface; everything here stays UI-free.

pub mod all;
pub mod block_tracker;
pub mod calibration;
pub mod canvas;
pub mod coordinate_system;
pub mod fading;
pub mod image;
pub mod kva;
pub mod label;
pub mod session;
pub mod style;
pub mod track;
pub mod track_point;
pub mod tracker;
pub mod types;
pub mod util;
