/// Video sources, frame measurements, and the face detection backend for camcoach.

pub mod brightness;
pub mod camera;
pub mod detector;
pub mod error;
pub mod image;
pub mod inference;
pub mod resize;
pub mod scale;

pub use brightness::average_luma;
pub use error::VisionError;
