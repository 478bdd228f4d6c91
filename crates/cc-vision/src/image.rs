use std::path::Path;
use std::sync::Arc;

use cc_core::frame::FrameBuffer;
use cc_core::traits::Source;

use crate::error::VisionError;

/// Source d'image statique. Retourne toujours la même frame.
///
/// Stands in for the camera when rehearsing with a photo.
///
/// # Example
/// ```no_run
/// use cc_vision::image::ImageSource;
/// use std::path::Path;
/// let source = ImageSource::new(Path::new("portrait.png")).unwrap();
/// ```
pub struct ImageSource {
    frame: Arc<FrameBuffer>,
}

impl ImageSource {
    /// Load an image from disk and create a source.
    ///
    /// # Errors
    /// Returns an error if the image cannot be loaded.
    pub fn new(path: &Path) -> Result<Self, VisionError> {
        Ok(Self {
            frame: Arc::new(load_image(path)?),
        })
    }

    /// Wrap an already decoded frame.
    #[must_use]
    pub fn from_frame(frame: FrameBuffer) -> Self {
        Self {
            frame: Arc::new(frame),
        }
    }
}

impl Source for ImageSource {
    fn next_frame(&mut self) -> Option<Arc<FrameBuffer>> {
        Some(Arc::clone(&self.frame))
    }

    fn native_size(&self) -> (u32, u32) {
        (self.frame.width, self.frame.height)
    }

    fn is_live(&self) -> bool {
        false
    }
}

/// Décode une image (PNG, JPEG, BMP) en RGBA.
///
/// # Errors
/// Returns [`VisionError::Image`] if the file cannot be read or decoded.
pub fn load_image(path: &Path) -> Result<FrameBuffer, VisionError> {
    let img = image::open(path)
        .map_err(|e| VisionError::Image(format!("{} : {e}", path.display())))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(FrameBuffer {
        data: rgba.into_raw(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_png_as_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();

        let mut source = ImageSource::new(&path).unwrap();
        assert_eq!(source.native_size(), (3, 2));
        assert!(!source.is_live());
        let frame = source.next_frame().unwrap();
        assert_eq!(frame.pixel(2, 1), (10, 20, 30, 255));
    }

    #[test]
    fn missing_file_is_an_image_error() {
        let err = ImageSource::new(Path::new("/nonexistent/face.png")).err().unwrap();
        assert!(matches!(err, VisionError::Image(_)));
    }
}
