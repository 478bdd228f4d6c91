use cc_core::config::Thresholds;

use crate::feedback::{JUST_RIGHT, Tone, Verdict, WAITING};

/// Voice volume verdict.
///
/// `Idle` is the state before any level fell inside one of the bands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VolumeVerdict {
    #[default]
    Idle,
    TooQuiet,
    Acceptable,
    TooLoud,
}

impl Verdict for VolumeVerdict {
    fn label(self) -> &'static str {
        match self {
            VolumeVerdict::Idle => WAITING,
            VolumeVerdict::TooQuiet => "🚫 Too quiet",
            VolumeVerdict::Acceptable => JUST_RIGHT,
            VolumeVerdict::TooLoud => "🚫 Too loud",
        }
    }

    fn tone(self) -> Tone {
        match self {
            VolumeVerdict::Idle => Tone::Idle,
            VolumeVerdict::Acceptable => Tone::Ok,
            VolumeVerdict::TooQuiet | VolumeVerdict::TooLoud => Tone::Warn,
        }
    }
}

/// Classify an average spectrum level.
///
/// Bands: `(quiet_above, ok_from)` too quiet, `[ok_from, loud_from)`
/// acceptable, `[loud_from, loud_below)` too loud. Anything outside
/// (silence, clipping) returns `None` and the caller keeps its last verdict.
///
/// # Example
/// ```
/// use cc_coach::volume::{classify_volume, VolumeVerdict};
/// use cc_core::config::Thresholds;
/// let t = Thresholds::default();
/// assert_eq!(classify_volume(85.0, &t), Some(VolumeVerdict::Acceptable));
/// assert_eq!(classify_volume(60.0, &t), None);
/// ```
#[must_use]
pub fn classify_volume(level: f32, thresholds: &Thresholds) -> Option<VolumeVerdict> {
    let t = thresholds;
    if t.volume_quiet_above < level && level < t.volume_ok_from {
        Some(VolumeVerdict::TooQuiet)
    } else if t.volume_ok_from <= level && level < t.volume_loud_from {
        Some(VolumeVerdict::Acceptable)
    } else if t.volume_loud_from <= level && level < t.volume_loud_below {
        Some(VolumeVerdict::TooLoud)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands() {
        let t = Thresholds::default();
        assert_eq!(classify_volume(75.0, &t), Some(VolumeVerdict::TooQuiet));
        assert_eq!(classify_volume(85.0, &t), Some(VolumeVerdict::Acceptable));
        assert_eq!(classify_volume(110.0, &t), Some(VolumeVerdict::TooLoud));
        assert_eq!(classify_volume(60.0, &t), None);
    }

    #[test]
    fn band_edges() {
        let t = Thresholds::default();
        assert_eq!(classify_volume(70.0, &t), None);
        assert_eq!(classify_volume(80.0, &t), Some(VolumeVerdict::Acceptable));
        assert_eq!(classify_volume(100.0, &t), Some(VolumeVerdict::TooLoud));
        assert_eq!(classify_volume(120.0, &t), None);
        assert_eq!(classify_volume(f32::NAN, &t), None);
    }
}
