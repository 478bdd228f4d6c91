use anyhow::{Context, Result};
use cc_core::error::CoreError;
use cc_core::frame::FrameBuffer;
use fast_image_resize::images::Image;
use fast_image_resize::{PixelType, ResizeOptions, Resizer as FirResizer};

/// Resizer réutilisable wrappant fast_image_resize.
///
/// Shrinks camera frames to the detector input width before inference.
///
/// # Example
/// ```
/// use cc_vision::resize::Resizer;
/// let r = Resizer::new();
/// ```
pub struct Resizer {
    inner: FirResizer,
    options: ResizeOptions,
    /// Scratch copy of the source (fast_image_resize wants `&mut` on it).
    src_buf: Vec<u8>,
}

impl Resizer {
    /// Create a new resizer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: FirResizer::new(),
            options: ResizeOptions::new(),
            src_buf: Vec::new(),
        }
    }

    /// Resize `src` into `dst`. Dimensions of `dst` determine output size.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidDimensions`] if either buffer does not
    /// match its dimensions, or the resize error itself.
    ///
    /// # Example
    /// ```
    /// use cc_vision::resize::Resizer;
    /// use cc_core::frame::FrameBuffer;
    /// let mut r = Resizer::new();
    /// let src = FrameBuffer::new(100, 100);
    /// let mut dst = FrameBuffer::new(50, 50);
    /// r.resize_into(&src, &mut dst).unwrap();
    /// ```
    pub fn resize_into(&mut self, src: &FrameBuffer, dst: &mut FrameBuffer) -> Result<()> {
        for fb in [src, &*dst] {
            if fb.pixel_count() == 0 || fb.data.len() != fb.pixel_count() * 4 {
                return Err(CoreError::InvalidDimensions {
                    width: fb.width,
                    height: fb.height,
                }
                .into());
            }
        }
        if src.width == dst.width && src.height == dst.height {
            dst.data.copy_from_slice(&src.data);
            return Ok(());
        }

        self.src_buf.clear();
        self.src_buf.extend_from_slice(&src.data);

        let src_image =
            Image::from_slice_u8(src.width, src.height, &mut self.src_buf, PixelType::U8x4)
                .context("Invalid source dimensions")?;

        let mut dst_image =
            Image::from_slice_u8(dst.width, dst.height, &mut dst.data, PixelType::U8x4)
                .context("Invalid destination dimensions")?;

        self.inner
            .resize(&src_image, &mut dst_image, Some(&self.options))
            .context("Resize failed")?;

        Ok(())
    }

    /// Downscale `src` so its width is at most `max_width`, keeping aspect.
    ///
    /// Returns `None` when the frame is already small enough.
    ///
    /// # Errors
    /// Returns an error if the resize fails.
    ///
    /// # Example
    /// ```
    /// use cc_vision::resize::Resizer;
    /// use cc_core::frame::FrameBuffer;
    /// let mut r = Resizer::new();
    /// let small = r.fit_width(&FrameBuffer::new(640, 360), 320).unwrap().unwrap();
    /// assert_eq!((small.width, small.height), (320, 180));
    /// assert!(r.fit_width(&FrameBuffer::new(200, 100), 320).unwrap().is_none());
    /// ```
    pub fn fit_width(&mut self, src: &FrameBuffer, max_width: u32) -> Result<Option<FrameBuffer>> {
        let Some((w, h)) = fit_dimensions(src.width, src.height, max_width) else {
            return Ok(None);
        };
        let mut dst = FrameBuffer::new(w, h);
        self.resize_into(src, &mut dst)?;
        Ok(Some(dst))
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Target size for a width cap, `None` if no downscale is needed.
#[must_use]
pub fn fit_dimensions(width: u32, height: u32, max_width: u32) -> Option<(u32, u32)> {
    if max_width == 0 || width <= max_width || height == 0 {
        return None;
    }
    let h = (u64::from(height) * u64::from(max_width) / u64::from(width)).max(1) as u32;
    Some((max_width, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_dimensions_keeps_aspect() {
        assert_eq!(fit_dimensions(1280, 720, 416), Some((416, 234)));
        assert_eq!(fit_dimensions(416, 234, 416), None);
        assert_eq!(fit_dimensions(4000, 1, 100), Some((100, 1)));
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let mut r = Resizer::new();
        let mut short = FrameBuffer::new(8, 8);
        short.data.truncate(10);
        let mut dst = FrameBuffer::new(4, 4);
        let err = r.resize_into(&short, &mut dst).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InvalidDimensions { width: 8, height: 8 })
        ));
        let mut empty = FrameBuffer::new(0, 4);
        assert!(r.resize_into(&FrameBuffer::new(4, 4), &mut empty).is_err());
    }

    #[test]
    fn uniform_frame_stays_uniform() {
        let mut r = Resizer::new();
        let src = FrameBuffer::filled(64, 32, [80, 90, 100, 255]);
        let dst = r.fit_width(&src, 16).unwrap().unwrap();
        assert_eq!((dst.width, dst.height), (16, 8));
        let (r, g, b, _) = dst.pixel(7, 3);
        for (got, want) in [(r, 80u8), (g, 90), (b, 100)] {
            assert!(got.abs_diff(want) <= 1, "{got} vs {want}");
        }
    }
}
