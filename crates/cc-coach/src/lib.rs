/// Coaching verdicts for camcoach.
///
/// Stateless classifiers turn one measurement into a verdict; the
/// [`CoachSession`] owns the little state that survives between ticks
/// (running max volume, spectral history, last verdicts, stream status).

pub mod brightness;
pub mod expression;
pub mod feedback;
pub mod position;
pub mod session;
pub mod volume;

pub use feedback::{Feedback, Tone, Verdict};
pub use session::{CoachSession, StreamStatus};
