use cc_core::face::{Expression, ExpressionScores};

use crate::feedback::{JUST_RIGHT, Tone, Verdict};

/// Facial expression verdict: smiling reads as relaxed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpressionVerdict {
    Relaxed,
    TooStiff,
}

impl Verdict for ExpressionVerdict {
    fn label(self) -> &'static str {
        match self {
            ExpressionVerdict::Relaxed => JUST_RIGHT,
            ExpressionVerdict::TooStiff => "🚫 Too stiff",
        }
    }

    fn tone(self) -> Tone {
        match self {
            ExpressionVerdict::Relaxed => Tone::Ok,
            ExpressionVerdict::TooStiff => Tone::Warn,
        }
    }
}

/// Dominant expression and its verdict, `None` if no score was reported.
///
/// Ties go to the class listed first in [`Expression::ALL`].
///
/// # Example
/// ```
/// use cc_coach::expression::{classify_expression, ExpressionVerdict};
/// use cc_core::face::{Expression, ExpressionScores};
/// let scores = ExpressionScores::from_pairs([(Expression::Happy, 0.4), (Expression::Neutral, 0.4), (Expression::Sad, 0.2)]);
/// let (dominant, verdict) = classify_expression(&scores).unwrap();
/// assert_eq!(dominant, Expression::Neutral);
/// assert_eq!(verdict, ExpressionVerdict::TooStiff);
/// ```
#[must_use]
pub fn classify_expression(scores: &ExpressionScores) -> Option<(Expression, ExpressionVerdict)> {
    let (dominant, _) = scores.dominant()?;
    let verdict = if dominant == Expression::Happy {
        ExpressionVerdict::Relaxed
    } else {
        ExpressionVerdict::TooStiff
    };
    Some((dominant, verdict))
}
