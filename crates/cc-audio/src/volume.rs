/// Mean of byte-scale frequency bins, the loudness figure used for feedback.
///
/// Returns 0.0 for an empty slice.
///
/// # Example
/// ```
/// use cc_audio::volume::mean_level;
/// assert_eq!(mean_level(&[10, 20, 30]), 20.0);
/// assert_eq!(mean_level(&[]), 0.0);
/// ```
#[must_use]
pub fn mean_level(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|&b| u32::from(b)).sum();
    sum as f32 / bins.len() as f32
}

/// Plus grand niveau observé depuis le début de la session.
///
/// Pas de décroissance ni de fenêtre : la valeur ne redescend qu'au
/// `reset()` (redémarrage de session).
///
/// # Example
/// ```
/// use cc_audio::volume::RollingMax;
/// let mut max = RollingMax::new();
/// assert_eq!(max.observe(12.0), Some(12.0));
/// assert_eq!(max.observe(8.0), None);
/// assert_eq!(max.max(), Some(12.0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RollingMax {
    max: Option<f32>,
}

impl RollingMax {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample.
    ///
    /// Returns the new maximum when the sample raised it (the first valid
    /// sample always does), `None` otherwise. Negative and NaN samples are
    /// ignored.
    pub fn observe(&mut self, sample: f32) -> Option<f32> {
        if sample.is_nan() || sample < 0.0 {
            return None;
        }
        match self.max {
            Some(current) if sample <= current => None,
            _ => {
                self.max = Some(sample);
                self.max
            }
        }
    }

    /// Current maximum, `None` before the first sample.
    #[must_use]
    pub fn max(&self) -> Option<f32> {
        self.max
    }

    pub fn reset(&mut self) {
        self.max = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_becomes_max_even_when_zero() {
        let mut max = RollingMax::new();
        assert_eq!(max.max(), None);
        assert_eq!(max.observe(0.0), Some(0.0));
        assert_eq!(max.max(), Some(0.0));
    }

    #[test]
    fn tracks_true_maximum_monotonically() {
        let samples = [3.0, 1.0, 7.5, 7.5, 2.0, 9.0, 0.0, 8.9];
        let mut max = RollingMax::new();
        let mut prev = f32::MIN;
        for (i, &s) in samples.iter().enumerate() {
            max.observe(s);
            let current = max.max().unwrap();
            let truth = samples[..=i].iter().copied().fold(f32::MIN, f32::max);
            assert_eq!(current, truth);
            assert!(current >= prev);
            prev = current;
        }
    }

    #[test]
    fn equal_sample_does_not_emit() {
        let mut max = RollingMax::new();
        max.observe(5.0);
        assert_eq!(max.observe(5.0), None);
    }

    #[test]
    fn ignores_invalid_samples_and_resets() {
        let mut max = RollingMax::new();
        assert_eq!(max.observe(f32::NAN), None);
        assert_eq!(max.observe(-1.0), None);
        assert_eq!(max.max(), None);
        max.observe(40.0);
        max.reset();
        assert_eq!(max.max(), None);
        assert_eq!(max.observe(1.0), Some(1.0));
    }
}
