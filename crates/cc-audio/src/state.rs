use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use cc_core::config::AudioConfig;
use cc_core::frame::AudioFrame;
use triple_buffer::TripleBuffer;

use crate::analyser::ByteAnalyser;
use crate::capture::AudioCapture;
use crate::error::AudioError;
use crate::volume::mean_level;

/// Handle on the running microphone analysis.
///
/// Dropping the handle stops the analysis thread (and with it the capture stream).
pub struct AudioHandle {
    output: triple_buffer::Output<AudioFrame>,
    stop: Arc<AtomicBool>,
    sample_rate: u32,
}

impl AudioHandle {
    /// Latest analysed frame. Check `seq` to skip frames already seen.
    pub fn latest(&mut self) -> &AudioFrame {
        self.output.read()
    }

    /// Sample rate of the capture device.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Spawn the audio analysis thread from microphone capture.
///
/// # Errors
/// Returns an error if audio capture fails to initialize (no device,
/// permission denied, unsupported format) or the thread cannot be spawned.
pub fn spawn_audio_thread(config: &AudioConfig) -> Result<AudioHandle, AudioError> {
    let mut capture = AudioCapture::start_default()?;
    let sample_rate = capture.sample_rate();

    let (mut buf_input, buf_output) = TripleBuffer::new(&AudioFrame::default()).split();
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);
    let config = config.clone();

    thread::Builder::new()
        .name("cc-audio".to_string())
        .spawn(move || {
            run_analysis_loop(&mut buf_input, &config, &stop_flag, &mut |out| {
                capture.read_samples(out);
            });
            log::info!("Thread audio terminé");
        })
        .map_err(|e| AudioError::Thread(e.to_string()))?;

    Ok(AudioHandle {
        output: buf_output,
        stop,
        sample_rate,
    })
}

/// Core analysis loop for capture mode.
///
/// Keeps the most recent `fft_size` samples and publishes one `AudioFrame`
/// per cadence tick until `stop` is raised.
fn run_analysis_loop(
    buf_input: &mut triple_buffer::Input<AudioFrame>,
    config: &AudioConfig,
    stop: &AtomicBool,
    read_fn: &mut dyn FnMut(&mut Vec<f32>),
) {
    let fft_size = config.fft_size;
    let mut analyser = ByteAnalyser::new(fft_size, config.smoothing, config.min_db, config.max_db);
    let mut window: Vec<f32> = Vec::with_capacity(fft_size * 4);
    let mut seq = 0u64;

    let period = Duration::from_secs_f64(1.0 / f64::from(config.cadence_hz.max(1)));

    while !stop.load(Ordering::Relaxed) {
        let started = Instant::now();
        read_fn(&mut window);

        // Garder uniquement la fenêtre la plus récente
        if window.len() > fft_size {
            window.drain(..window.len() - fft_size);
        }

        let bins = analyser.process(&window);
        seq += 1;
        buf_input.write(AudioFrame {
            bins: bins.to_vec(),
            level: mean_level(bins),
            seq,
        });

        // Le travail de l'itération compte dans la période
        thread::sleep(period.saturating_sub(started.elapsed()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_loop_publishes_frames_until_stopped() {
        let (mut input, mut output) = TripleBuffer::new(&AudioFrame::default()).split();
        let config = AudioConfig {
            cadence_hz: 240,
            ..AudioConfig::default()
        };
        let stop = AtomicBool::new(false);
        let mut calls = 0;
        run_analysis_loop(&mut input, &config, &stop, &mut |out| {
            calls += 1;
            out.extend(std::iter::repeat_n(0.0, 100));
            if calls == 5 {
                stop.store(true, Ordering::Relaxed);
            }
        });
        let frame = output.read();
        assert_eq!(frame.seq, 5);
        assert_eq!(frame.bins.len(), config.fft_size / 2);
        assert_eq!(frame.level, 0.0);
    }

    #[test]
    fn cadence_includes_work_time() {
        let (mut input, _output) = TripleBuffer::new(&AudioFrame::default()).split();
        let config = AudioConfig {
            cadence_hz: 10,
            ..AudioConfig::default()
        };
        let stop = AtomicBool::new(false);
        let mut calls = 0;
        let started = Instant::now();
        run_analysis_loop(&mut input, &config, &stop, &mut |out| {
            calls += 1;
            thread::sleep(Duration::from_millis(60));
            out.extend(std::iter::repeat_n(0.0, 100));
            if calls == 4 {
                stop.store(true, Ordering::Relaxed);
            }
        });
        // 4 périodes de 100 ms, pas 4 × (100 + 60)
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(390), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(560), "{elapsed:?}");
    }
}
