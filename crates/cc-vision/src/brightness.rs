use cc_core::frame::FrameBuffer;
use rayon::prelude::*;

use crate::error::VisionError;

/// Channel weights in hundredths: 0.34 R + 0.50 G + 0.16 B.
const WEIGHT_R: u32 = 34;
const WEIGHT_G: u32 = 50;
const WEIGHT_B: u32 = 16;

/// Below this many pixels the parallel split costs more than it saves.
const PAR_THRESHOLD: usize = 64 * 1024;

/// Luma d'un pixel, en centièmes (0..=25500). Alpha ignoré.
#[inline(always)]
fn luma_centi(px: &[u8]) -> u64 {
    u64::from(u32::from(px[0]) * WEIGHT_R + u32::from(px[1]) * WEIGHT_G + u32::from(px[2]) * WEIGHT_B)
}

/// Luma of one pixel on the 0–255 scale.
///
/// # Example
/// ```
/// use cc_vision::brightness::pixel_luma;
/// assert_eq!(pixel_luma(255, 255, 255), 255.0);
/// assert_eq!(pixel_luma(100, 0, 0), 34.0);
/// ```
#[must_use]
pub fn pixel_luma(r: u8, g: u8, b: u8) -> f32 {
    luma_centi(&[r, g, b]) as f32 / 100.0
}

/// Average luma over every pixel of the frame.
///
/// The sum is accumulated in integer hundredths, so the result does not
/// depend on how the work is split.
///
/// # Errors
/// Returns [`VisionError::NotReady`] when the frame holds no decoded data
/// yet; the caller skips this tick and tries again on the next one.
///
/// # Example
/// ```
/// use cc_core::frame::FrameBuffer;
/// use cc_vision::brightness::average_luma;
/// let frame = FrameBuffer::filled(4, 4, [120, 120, 120, 255]);
/// assert_eq!(average_luma(&frame).unwrap(), 120.0);
/// assert!(average_luma(&FrameBuffer::default()).is_err());
/// ```
pub fn average_luma(frame: &FrameBuffer) -> Result<f32, VisionError> {
    if !frame.is_ready() {
        return Err(VisionError::NotReady);
    }
    let pixels = frame.pixel_count();
    let data = &frame.data[..pixels * 4];

    let sum: u64 = if pixels >= PAR_THRESHOLD {
        data.par_chunks_exact(4).map(luma_centi).sum()
    } else {
        data.chunks_exact(4).map(luma_centi).sum()
    };

    Ok((sum as f64 / (pixels as f64 * 100.0)) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_frames_average_to_their_level() {
        for level in [0u8, 99, 100, 149, 150, 255] {
            let frame = FrameBuffer::filled(8, 6, [level, level, level, 255]);
            assert_eq!(average_luma(&frame).unwrap(), f32::from(level));
        }
    }

    #[test]
    fn weights_favour_green() {
        let red = FrameBuffer::filled(2, 2, [200, 0, 0, 255]);
        let green = FrameBuffer::filled(2, 2, [0, 200, 0, 255]);
        let blue = FrameBuffer::filled(2, 2, [0, 0, 200, 255]);
        assert_eq!(average_luma(&red).unwrap(), 68.0);
        assert_eq!(average_luma(&green).unwrap(), 100.0);
        assert_eq!(average_luma(&blue).unwrap(), 32.0);
    }

    #[test]
    fn alpha_is_ignored() {
        let opaque = FrameBuffer::filled(3, 3, [50, 60, 70, 255]);
        let clear = FrameBuffer::filled(3, 3, [50, 60, 70, 0]);
        assert_eq!(average_luma(&opaque).unwrap(), average_luma(&clear).unwrap());
    }

    #[test]
    fn large_frame_matches_sequential_sum() {
        let mut frame = FrameBuffer::new(640, 360);
        for (i, px) in frame.data.chunks_exact_mut(4).enumerate() {
            px[0] = (i % 256) as u8;
            px[1] = (i / 7 % 256) as u8;
            px[2] = (i / 13 % 256) as u8;
        }
        let expected: u64 = frame.data.chunks_exact(4).map(luma_centi).sum();
        let expected = (expected as f64 / (640.0 * 360.0 * 100.0)) as f32;
        assert_eq!(average_luma(&frame).unwrap(), expected);
    }

    #[test]
    fn undecoded_frame_is_not_ready() {
        let mut frame = FrameBuffer::new(10, 10);
        frame.data.clear();
        assert!(matches!(average_luma(&frame), Err(VisionError::NotReady)));
    }
}
