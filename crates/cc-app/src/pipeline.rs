use std::time::Duration;

use cc_audio::state::{AudioHandle, spawn_audio_thread};
use cc_coach::StreamStatus;
use cc_core::config::CoachConfig;
use cc_core::traits::Source;
use cc_vision::camera::CameraSource;
use cc_vision::detector::{ExternalDetector, verify_models};
use cc_vision::image::ImageSource;
use cc_vision::inference::InferenceWorker;

use crate::cli::Cli;

/// Start the video source: still image if `--image` was given, camera otherwise.
///
/// A failure is returned as the stream status instead of aborting, so
/// audio and the rest of the UI keep running.
pub fn start_source(cli: &Cli, config: &CoachConfig) -> (Option<Box<dyn Source>>, StreamStatus) {
    if let Some(path) = &cli.image {
        return match ImageSource::new(path) {
            Ok(source) => {
                log::info!("Image chargée : {}", path.display());
                (Some(Box::new(source)), StreamStatus::Starting)
            }
            Err(e) => {
                log::error!("{e}");
                (None, StreamStatus::Failed(e.to_string()))
            }
        };
    }

    match CameraSource::open(&config.camera) {
        Ok(source) => {
            log::info!("Caméra ouverte : {}", config.camera.device);
            (Some(Box::new(source)), StreamStatus::Starting)
        }
        Err(e) => {
            log::error!("{e}");
            (None, StreamStatus::Failed(e.to_string()))
        }
    }
}

/// Start microphone analysis, unless disabled.
pub fn start_audio(config: &CoachConfig) -> (Option<AudioHandle>, StreamStatus) {
    if !config.audio.enabled {
        return (None, StreamStatus::Disabled);
    }
    match spawn_audio_thread(&config.audio) {
        Ok(handle) => {
            log::info!("Micro ouvert à {} Hz", handle.sample_rate());
            (Some(handle), StreamStatus::Starting)
        }
        Err(e) => {
            log::error!("Audio non disponible : {e}");
            (None, StreamStatus::Failed(e.to_string()))
        }
    }
}

/// Check the model directory and start the detector backend on its worker.
///
/// No configured command means detection is off.
pub fn start_detector(config: &CoachConfig) -> (Option<InferenceWorker>, StreamStatus) {
    let d = &config.detection;
    if d.command.is_empty() {
        log::info!("Aucun backend de détection configuré");
        return (None, StreamStatus::Disabled);
    }

    let started = verify_models(&d.model_dir)
        .and_then(|()| ExternalDetector::spawn(&d.command, &d.model_dir))
        .and_then(|detector| {
            InferenceWorker::spawn(
                Box::new(detector),
                d.input_width,
                Duration::from_millis(d.timeout_ms),
            )
        });

    match started {
        Ok(worker) => (Some(worker), StreamStatus::Starting),
        Err(e) => {
            log::error!("{e}");
            (None, StreamStatus::Failed(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn missing_image_fails_video_only() {
        let cli = Cli::parse_from(["camcoach", "--image", "/nonexistent/face.png"]);
        let (source, status) = start_source(&cli, &CoachConfig::default());
        assert!(source.is_none());
        assert!(status.is_failed());
    }

    #[test]
    fn disabled_streams_report_disabled() {
        let mut config = CoachConfig::default();
        config.audio.enabled = false;
        let (audio, status) = start_audio(&config);
        assert!(audio.is_none());
        assert_eq!(status, StreamStatus::Disabled);

        let (worker, status) = start_detector(&config);
        assert!(worker.is_none());
        assert_eq!(status, StreamStatus::Disabled);
    }

    #[test]
    fn missing_models_fail_detection() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CoachConfig::default();
        config.detection.model_dir = dir.path().to_path_buf();
        config.detection.command = vec!["true".to_string()];
        let (worker, status) = start_detector(&config);
        assert!(worker.is_none());
        let StreamStatus::Failed(reason) = status else {
            panic!("expected failure");
        };
        assert!(reason.contains("tiny_face_detector"), "{reason}");
    }
}
