use std::collections::VecDeque;
use std::time::Duration;

use crate::volume::mean_level;

/// Fenêtre glissante de spectres pour la courbe d'historique audio.
///
/// Capacité fixe ; le plus ancien spectre est évincé quand elle est
/// dépassée. Jamais persistée.
///
/// # Example
/// ```
/// use cc_audio::history::SpectralHistory;
/// let mut history = SpectralHistory::with_capacity(2);
/// history.push(&[10, 10]);
/// history.push(&[20, 20]);
/// history.push(&[30, 30]);
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.averages().collect::<Vec<_>>(), vec![20.0, 30.0]);
/// ```
#[derive(Clone, Debug)]
pub struct SpectralHistory {
    frames: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl SpectralHistory {
    /// History holding at most `capacity` snapshots (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Capacity covering `duration` at `cadence_hz` snapshots per second.
    ///
    /// # Example
    /// ```
    /// use cc_audio::history::SpectralHistory;
    /// use std::time::Duration;
    /// let history = SpectralHistory::from_duration(Duration::from_secs(5), 60);
    /// assert_eq!(history.capacity(), 300);
    /// ```
    #[must_use]
    pub fn from_duration(duration: Duration, cadence_hz: u32) -> Self {
        let frames = (duration.as_secs_f64() * f64::from(cadence_hz)).round() as usize;
        Self::with_capacity(frames)
    }

    /// Append the newest snapshot, evicting the oldest on overflow.
    pub fn push(&mut self, bins: &[u8]) {
        // Recycle the evicted allocation when the window is full
        let mut slot = if self.frames.len() >= self.capacity {
            self.frames.pop_front().unwrap_or_default()
        } else {
            Vec::with_capacity(bins.len())
        };
        slot.clear();
        slot.extend_from_slice(bins);
        self.frames.push_back(slot);
    }

    /// Mean bin magnitude of each snapshot, oldest first.
    pub fn averages(&self) -> impl ExactSizeIterator<Item = f32> + '_ {
        self.frames.iter().map(|f| mean_level(f))
    }

    /// Newest snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<&[u8]> {
        self.frames.back().map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
