/// Configuration, types, and shared structures for camcoach.
///
/// This crate contains the frame and face types, the detector/source
/// traits, and the configuration logic shared across the workspace.

pub mod config;
pub mod error;
pub mod face;
pub mod frame;
pub mod traits;

pub use config::CoachConfig;
pub use error::{CoreError, DetectError};
pub use face::{BoundingBox, Expression, ExpressionScores, FaceDetection, Gender, Point};
pub use frame::{AudioFrame, FrameBuffer, FrameMeasurement};
