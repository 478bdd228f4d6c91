use std::sync::Arc;

use crate::error::DetectError;
use crate::face::FaceDetection;
use crate::frame::FrameBuffer;

/// Fournit des frames vidéo au pipeline.
///
/// Implémenté par : `CameraSource`, `ImageSource`.
///
/// # Example
/// ```
/// use cc_core::traits::Source;
/// use cc_core::frame::FrameBuffer;
/// use std::sync::Arc;
///
/// struct DummySource;
/// impl Source for DummySource {
///     fn next_frame(&mut self) -> Option<Arc<FrameBuffer>> { None }
///     fn native_size(&self) -> (u32, u32) { (0, 0) }
///     fn is_live(&self) -> bool { false }
/// }
/// ```
pub trait Source: Send + 'static {
    /// Retourne la prochaine frame disponible.
    ///
    /// Ne bloque JAMAIS. `None` si aucune frame n'a encore été décodée.
    fn next_frame(&mut self) -> Option<Arc<FrameBuffer>>;

    /// Dimensions natives de la source.
    fn native_size(&self) -> (u32, u32);

    /// Indique si la source est live (caméra) ou statique (image).
    fn is_live(&self) -> bool;

    /// Raison de l'arrêt de la source, si elle a échoué.
    fn failure(&mut self) -> Option<&str> {
        None
    }
}

/// Black-box face detection, landmarks, expression and age/gender inference.
///
/// Coordinates in the result are in pixels of the frame that was passed in.
/// Implementations may block; callers run them on a worker thread.
///
/// # Example
/// ```
/// use cc_core::traits::FaceDetector;
/// use cc_core::frame::FrameBuffer;
/// use cc_core::face::FaceDetection;
/// use cc_core::error::DetectError;
///
/// struct NoFaces;
/// impl FaceDetector for NoFaces {
///     fn detect(&mut self, _frame: &FrameBuffer) -> Result<Vec<FaceDetection>, DetectError> {
///         Ok(Vec::new())
///     }
///     fn name(&self) -> &'static str { "none" }
/// }
/// ```
pub trait FaceDetector: Send + 'static {
    /// Run all models on one frame.
    ///
    /// # Errors
    /// Returns a [`DetectError`] when the backend fails or answers garbage.
    fn detect(&mut self, frame: &FrameBuffer) -> Result<Vec<FaceDetection>, DetectError>;

    /// Nom lisible pour le debug/UI.
    fn name(&self) -> &'static str;
}
