// Microphone capture, byte-spectrum analysis, and loudness tracking for camcoach.

pub mod analyser;
pub mod capture;
pub mod error;
pub mod history;
pub mod state;
pub mod volume;

pub use analyser::ByteAnalyser;
pub use error::AudioError;
pub use history::SpectralHistory;
pub use volume::{RollingMax, mean_level};
