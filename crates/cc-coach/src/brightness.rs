use cc_core::config::Thresholds;

use crate::feedback::{JUST_RIGHT, Tone, Verdict};

/// Lighting verdict from the average luma.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrightnessVerdict {
    TooDark,
    Acceptable,
    TooBright,
}

impl Verdict for BrightnessVerdict {
    fn label(self) -> &'static str {
        match self {
            BrightnessVerdict::TooDark => "🚫 Too dark",
            BrightnessVerdict::Acceptable => JUST_RIGHT,
            BrightnessVerdict::TooBright => "🚫 Too bright",
        }
    }

    fn tone(self) -> Tone {
        match self {
            BrightnessVerdict::Acceptable => Tone::Ok,
            _ => Tone::Warn,
        }
    }
}

/// `luma < dark_below` → too dark, `luma >= bright_from` → too bright.
///
/// # Example
/// ```
/// use cc_coach::brightness::{classify_brightness, BrightnessVerdict};
/// use cc_core::config::Thresholds;
/// let t = Thresholds::default();
/// assert_eq!(classify_brightness(100.0, &t), BrightnessVerdict::Acceptable);
/// ```
#[must_use]
pub fn classify_brightness(luma: f32, thresholds: &Thresholds) -> BrightnessVerdict {
    if luma < thresholds.brightness_dark_below {
        BrightnessVerdict::TooDark
    } else if luma >= thresholds.brightness_bright_from {
        BrightnessVerdict::TooBright
    } else {
        BrightnessVerdict::Acceptable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries() {
        let t = Thresholds::default();
        assert_eq!(classify_brightness(99.0, &t), BrightnessVerdict::TooDark);
        assert_eq!(classify_brightness(99.99, &t), BrightnessVerdict::TooDark);
        assert_eq!(classify_brightness(100.0, &t), BrightnessVerdict::Acceptable);
        assert_eq!(classify_brightness(149.0, &t), BrightnessVerdict::Acceptable);
        assert_eq!(classify_brightness(150.0, &t), BrightnessVerdict::TooBright);
        assert_eq!(classify_brightness(255.0, &t), BrightnessVerdict::TooBright);
        assert_eq!(classify_brightness(0.0, &t), BrightnessVerdict::TooDark);
    }

    #[test]
    fn thresholds_are_configurable() {
        let t = Thresholds {
            brightness_dark_below: 50.0,
            brightness_bright_from: 60.0,
            ..Thresholds::default()
        };
        assert_eq!(classify_brightness(55.0, &t), BrightnessVerdict::Acceptable);
        assert_eq!(classify_brightness(99.0, &t), BrightnessVerdict::TooBright);
    }
}
