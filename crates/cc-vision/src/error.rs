use thiserror::Error;

/// Errors originating from the vision module.
#[derive(Error, Debug)]
pub enum VisionError {
    /// The frame has no decoded pixel data yet. Retry on the next tick.
    #[error("Frame pas encore décodée")]
    NotReady,

    /// The camera could not be opened (missing device, permission, no ffmpeg).
    #[error("Caméra indisponible : {0}")]
    CameraUnavailable(String),

    /// A still image could not be loaded.
    #[error("Image illisible : {0}")]
    Image(String),
}
