use std::fmt;

/// Display style of a verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    /// Nothing to fix. Default text color.
    Ok,
    /// Needs attention. Rendered red.
    Warn,
    /// No measurement yet.
    Idle,
}

/// A verdict ready for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Feedback {
    pub label: &'static str,
    pub tone: Tone,
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

pub(crate) const JUST_RIGHT: &str = "✅ Just right";
pub(crate) const WAITING: &str = "… waiting";

/// Common face of every classifier output.
///
/// # Example
/// ```
/// use cc_coach::{Tone, Verdict};
/// use cc_coach::brightness::BrightnessVerdict;
/// let fb = BrightnessVerdict::TooDark.feedback();
/// assert_eq!(fb.tone, Tone::Warn);
/// assert_eq!(fb.to_string(), "🚫 Too dark");
/// ```
pub trait Verdict: Copy {
    /// Text shown in the panel.
    fn label(self) -> &'static str;

    /// Display style.
    fn tone(self) -> Tone;

    fn feedback(self) -> Feedback {
        Feedback {
            label: self.label(),
            tone: self.tone(),
        }
    }
}

/// Feedback for a verdict that may not have been computed yet.
#[must_use]
pub fn feedback_or_idle<V: Verdict>(verdict: Option<V>) -> Feedback {
    verdict.map_or(
        Feedback {
            label: WAITING,
            tone: Tone::Idle,
        },
        Verdict::feedback,
    )
}
