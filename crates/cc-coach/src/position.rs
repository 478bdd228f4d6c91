use cc_core::face::Point;

use crate::feedback::{JUST_RIGHT, Tone, Verdict};

/// Face placement verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionVerdict {
    Centered,
    OffCenter,
}

impl Verdict for PositionVerdict {
    fn label(self) -> &'static str {
        match self {
            PositionVerdict::Centered => JUST_RIGHT,
            PositionVerdict::OffCenter => "🚫 Off-center",
        }
    }

    fn tone(self) -> Tone {
        match self {
            PositionVerdict::Centered => Tone::Ok,
            PositionVerdict::OffCenter => Tone::Warn,
        }
    }
}

/// Central band of a surface as fractions of its width and height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CenterBand {
    pub min: f32,
    pub max: f32,
}

impl CenterBand {
    /// Pixel range `[min·len, max·len]` along one axis.
    #[must_use]
    pub fn range(self, len: u32) -> (f32, f32) {
        let len = len as f32;
        (len * self.min, len * self.max)
    }
}

/// `Centered` when `point` lies inside the band on both axes, bounds inclusive.
///
/// `surface` is the size of the surface the point is expressed in.
///
/// # Example
/// ```
/// use cc_coach::position::{classify_position, CenterBand, PositionVerdict};
/// use cc_core::face::Point;
/// let band = CenterBand { min: 0.4, max: 0.6 };
/// assert_eq!(classify_position(Point::new(320.0, 180.0), (640, 360), band), PositionVerdict::Centered);
/// assert_eq!(classify_position(Point::new(100.0, 180.0), (640, 360), band), PositionVerdict::OffCenter);
/// ```
#[must_use]
pub fn classify_position(point: Point, surface: (u32, u32), band: CenterBand) -> PositionVerdict {
    let (x0, x1) = band.range(surface.0);
    let (y0, y1) = band.range(surface.1);
    if (x0..=x1).contains(&point.x) && (y0..=y1).contains(&point.y) {
        PositionVerdict::Centered
    } else {
        PositionVerdict::OffCenter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAND: CenterBand = CenterBand { min: 0.4, max: 0.6 };

    #[test]
    fn band_edges_are_inclusive() {
        let size = (500, 500);
        assert_eq!(classify_position(Point::new(200.0, 200.0), size, BAND), PositionVerdict::Centered);
        assert_eq!(classify_position(Point::new(300.0, 300.0), size, BAND), PositionVerdict::Centered);
        assert_eq!(classify_position(Point::new(199.9, 250.0), size, BAND), PositionVerdict::OffCenter);
        assert_eq!(classify_position(Point::new(250.0, 300.1), size, BAND), PositionVerdict::OffCenter);
    }

    #[test]
    fn both_axes_must_be_centered() {
        let size = (640, 480);
        assert_eq!(classify_position(Point::new(320.0, 10.0), size, BAND), PositionVerdict::OffCenter);
        assert_eq!(classify_position(Point::new(10.0, 240.0), size, BAND), PositionVerdict::OffCenter);
    }

    #[test]
    fn nan_point_is_off_center() {
        assert_eq!(
            classify_position(Point::new(f32::NAN, 240.0), (640, 480), BAND),
            PositionVerdict::OffCenter
        );
    }
}
