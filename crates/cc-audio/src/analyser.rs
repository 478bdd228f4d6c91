use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

/// Byte-scale frequency analyser.
///
/// Blackman-windowed real FFT, magnitudes smoothed over time, converted to
/// decibels and mapped linearly from `[min_db, max_db]` onto `0..=255`.
/// An FFT of size N yields N/2 bins.
///
/// Pre-allocates the FFT plan and scratch buffers for a zero-allocation hot path.
///
/// # Example
/// ```
/// use cc_audio::analyser::ByteAnalyser;
/// let mut analyser = ByteAnalyser::new(256, 0.8, -100.0, -30.0);
/// let bins = analyser.process(&[0.0; 256]);
/// assert_eq!(bins.len(), 128);
/// assert!(bins.iter().all(|&b| b == 0));
/// ```
pub struct ByteAnalyser {
    fft_size: usize,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    plan: Arc<dyn RealToComplex<f32>>,
    /// Blackman window coefficients.
    window: Vec<f32>,
    /// Smoothed linear magnitudes, one per output bin.
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl ByteAnalyser {
    /// Create an analyser.
    ///
    /// # Panics
    /// Panics if `fft_size` is smaller than 2.
    #[must_use]
    pub fn new(fft_size: usize, smoothing: f32, min_db: f32, max_db: f32) -> Self {
        assert!(fft_size >= 2, "FFT size must be >= 2");

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(fft_size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        let n = fft_size as f32;
        let tau = 2.0 * std::f32::consts::PI;
        let window = (0..fft_size)
            .map(|i| {
                let x = i as f32 / n;
                0.42 - 0.5 * (tau * x).cos() + 0.08 * (2.0 * tau * x).cos()
            })
            .collect();

        let bins = fft_size / 2;
        Self {
            fft_size,
            smoothing: smoothing.clamp(0.0, 0.99),
            min_db,
            max_db: max_db.max(min_db + 1.0),
            input_buf,
            spectrum_buf,
            scratch,
            plan,
            window,
            smoothed: vec![0.0; bins],
            bytes: vec![0; bins],
        }
    }

    /// Analyse the most recent `fft_size` samples of `samples`.
    ///
    /// Shorter input is zero-padded at the front (oldest side).
    pub fn process(&mut self, samples: &[f32]) -> &[u8] {
        let n = self.fft_size;
        let take = samples.len().min(n);
        let recent = &samples[samples.len() - take..];
        let pad = n - take;

        // Copy and window
        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < pad {
                0.0
            } else {
                recent[i - pad] * self.window[i]
            };
        }

        // Forward FFT
        if self
            .plan
            .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
            .is_err()
        {
            log::warn!("FFT: taille de buffer inattendue, frame ignorée");
            return &self.bytes;
        }

        let scale = 255.0 / (self.max_db - self.min_db);
        let tau = self.smoothing;
        for ((c, smoothed), byte) in self
            .spectrum_buf
            .iter()
            .zip(self.smoothed.iter_mut())
            .zip(self.bytes.iter_mut())
        {
            let magnitude = c.norm() / n as f32;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
            *byte = if *smoothed > 0.0 {
                let db = 20.0 * smoothed.log10();
                (scale * (db - self.min_db)).clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }

        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_bin: usize, n: usize, amplitude: f32) -> Vec<f32> {
        (0..n)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq_bin as f32 * i as f32 / n as f32).sin()
            })
            .collect()
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let mut analyser = ByteAnalyser::new(256, 0.0, -100.0, -30.0);
        let bins = analyser.process(&sine(16, 256, 0.01)).to_vec();
        let (peak, _) = bins
            .iter()
            .enumerate()
            .max_by_key(|&(_, b)| *b)
            .unwrap();
        assert_eq!(peak, 16);
        assert!(bins[16] > bins[15] && bins[16] > bins[17]);
        assert!(bins[100] < bins[16]);
    }

    #[test]
    fn loud_input_saturates() {
        let mut analyser = ByteAnalyser::new(256, 0.0, -100.0, -30.0);
        let bins = analyser.process(&sine(16, 256, 0.9));
        assert_eq!(bins[16], 255);
    }

    #[test]
    fn smoothing_lags_behind_input() {
        let mut fast = ByteAnalyser::new(256, 0.0, -100.0, -30.0);
        let mut slow = ByteAnalyser::new(256, 0.9, -100.0, -30.0);
        let quiet = sine(8, 256, 0.001);
        let a = fast.process(&quiet)[8];
        let b = slow.process(&quiet)[8];
        assert!(b < a, "smoothed response {b} should trail raw {a}");
    }

    #[test]
    fn short_input_is_zero_padded() {
        let mut analyser = ByteAnalyser::new(64, 0.0, -100.0, -30.0);
        let bins = analyser.process(&[0.0; 10]);
        assert_eq!(bins.len(), 32);
        assert!(bins.iter().all(|&b| b == 0));
    }
}
