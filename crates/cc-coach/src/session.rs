use std::fmt;
use std::time::Duration;

use cc_audio::history::SpectralHistory;
use cc_audio::volume::RollingMax;
use cc_core::config::{CoachConfig, Thresholds};
use cc_core::error::DetectError;
use cc_core::face::{Expression, FaceDetection};
use cc_core::frame::{AudioFrame, FrameBuffer, FrameMeasurement};
use cc_vision::brightness::average_luma;
use cc_vision::error::VisionError;
use cc_vision::scale::resize_results;

use crate::brightness::{BrightnessVerdict, classify_brightness};
use crate::expression::{ExpressionVerdict, classify_expression};
use crate::position::{CenterBand, PositionVerdict, classify_position};
use crate::volume::{VolumeVerdict, classify_volume};

/// State of one input stream as shown to the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StreamStatus {
    /// Not started yet, or waiting for its first data.
    #[default]
    Starting,
    /// Delivering data.
    Live,
    /// Turned off by configuration or CLI.
    Disabled,
    /// Failed; the reason is displayed.
    Failed(String),
}

impl StreamStatus {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, StreamStatus::Failed(_))
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamStatus::Starting => f.write_str("starting"),
            StreamStatus::Live => f.write_str("live"),
            StreamStatus::Disabled => f.write_str("off"),
            StreamStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Status of the three independent pipelines.
#[derive(Clone, Debug, Default)]
pub struct Streams {
    pub video: StreamStatus,
    pub audio: StreamStatus,
    pub detection: StreamStatus,
}

/// Last verdict of every classifier.
///
/// Position and expression stay `None` until a face is seen, then keep
/// their value while no face is detected. Volume starts `Idle` and keeps
/// its value while the level is outside every band.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Verdicts {
    pub position: Option<PositionVerdict>,
    pub expression: Option<ExpressionVerdict>,
    pub volume: VolumeVerdict,
    pub brightness: Option<BrightnessVerdict>,
}

/// Everything the coaching overlay remembers between ticks.
///
/// Owned by the UI thread. [`CoachSession::reset`] starts a new session
/// (running max and history cleared) without touching stream status.
///
/// # Example
/// ```
/// use cc_coach::CoachSession;
/// use cc_core::config::CoachConfig;
/// use cc_core::frame::AudioFrame;
/// let mut session = CoachSession::new(&CoachConfig::default());
/// session.on_audio_frame(&AudioFrame { bins: vec![85; 128], level: 85.0, seq: 1 });
/// assert_eq!(session.max_volume(), Some(85.0));
/// ```
pub struct CoachSession {
    thresholds: Thresholds,
    max_volume: RollingMax,
    history: SpectralHistory,
    last_audio_seq: u64,
    measurement: FrameMeasurement,
    dominant: Option<(Expression, f32)>,
    verdicts: Verdicts,
    /// Detections in display coordinates.
    faces: Vec<FaceDetection>,
    display_size: (u32, u32),
    streams: Streams,
}

impl CoachSession {
    #[must_use]
    pub fn new(config: &CoachConfig) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            max_volume: RollingMax::new(),
            history: history_for(config),
            last_audio_seq: 0,
            measurement: FrameMeasurement::default(),
            dominant: None,
            verdicts: Verdicts::default(),
            faces: Vec::new(),
            display_size: (config.camera.width, config.camera.height),
            streams: Streams::default(),
        }
    }

    /// Start over: forget the running max, the history and every verdict.
    pub fn reset(&mut self) {
        self.max_volume.reset();
        self.history.clear();
        self.measurement = FrameMeasurement::default();
        self.dominant = None;
        self.verdicts = Verdicts::default();
        self.faces.clear();
        log::info!("Session réinitialisée");
    }

    /// Take new thresholds and history length after a config reload.
    ///
    /// The history is only rebuilt (and emptied) when its capacity changes.
    pub fn apply_config(&mut self, config: &CoachConfig) {
        self.thresholds = config.thresholds.clone();
        let history = history_for(config);
        if history.capacity() != self.history.capacity() {
            self.history = history;
        }
    }

    /// Size of the surface the video is presented on.
    ///
    /// Detections are rescaled to it and the position readout uses its pixels.
    pub fn set_display_size(&mut self, size: (u32, u32)) {
        self.display_size = size;
    }

    /// Feed one analysed audio frame. Frames already seen are ignored.
    ///
    /// Returns `true` when the frame was new.
    pub fn on_audio_frame(&mut self, frame: &AudioFrame) -> bool {
        if frame.seq == 0 || frame.seq == self.last_audio_seq {
            return false;
        }
        self.last_audio_seq = frame.seq;
        self.history.push(&frame.bins);
        self.measurement.loudness = Some(frame.level);
        if let Some(max) = self.max_volume.observe(frame.level) {
            log::trace!("Nouveau volume max : {max:.2}");
        }
        if let Some(verdict) = classify_volume(frame.level, &self.thresholds) {
            self.verdicts.volume = verdict;
        }
        self.streams.audio = StreamStatus::Live;
        true
    }

    /// Measure the brightness of a video frame.
    ///
    /// # Errors
    /// [`VisionError::NotReady`] when the frame has no pixels yet; nothing
    /// is updated and the next frame is measured as usual.
    pub fn on_video_frame(&mut self, frame: &FrameBuffer) -> Result<f32, VisionError> {
        let luma = average_luma(frame)?;
        self.measurement.brightness = Some(luma);
        self.verdicts.brightness = Some(classify_brightness(luma, &self.thresholds));
        // Une panne reste affichée : seule une nouvelle source la lève
        if !self.streams.video.is_failed() {
            self.streams.video = StreamStatus::Live;
        }
        Ok(luma)
    }

    /// Take a detection result expressed in `frame_size` pixels.
    ///
    /// The first face drives position and expression; without a face the
    /// previous verdicts stay.
    pub fn on_detections(&mut self, detections: &[FaceDetection], frame_size: (u32, u32)) {
        self.faces = resize_results(detections, frame_size, self.display_size);
        self.measurement.face_count = self.faces.len();
        self.measurement.face = self.faces.first().cloned();
        self.streams.detection = StreamStatus::Live;

        let Some(face) = self.faces.first() else {
            return;
        };
        if let Some(anchor) = face.anchor() {
            let band = CenterBand {
                min: self.thresholds.center_band_min,
                max: self.thresholds.center_band_max,
            };
            self.verdicts.position = Some(classify_position(anchor, self.display_size, band));
        }
        if let Some((dominant, verdict)) = classify_expression(&face.expressions) {
            self.dominant = face.expressions.get(dominant).map(|c| (dominant, c));
            self.verdicts.expression = Some(verdict);
        }
    }

    /// Record a failed detection tick.
    ///
    /// Protocol errors only affect the tick; anything else stops detection.
    pub fn on_detection_error(&mut self, err: &DetectError) {
        if matches!(err, DetectError::Protocol(_)) {
            log::warn!("Tick de détection ignoré : {err}");
        } else {
            log::error!("Détection arrêtée : {err}");
            self.streams.detection = StreamStatus::Failed(err.to_string());
        }
    }

    #[must_use]
    pub fn measurement(&self) -> &FrameMeasurement {
        &self.measurement
    }

    #[must_use]
    pub fn verdicts(&self) -> Verdicts {
        self.verdicts
    }

    /// Dominant expression of the first face and its confidence.
    #[must_use]
    pub fn dominant_expression(&self) -> Option<(Expression, f32)> {
        self.dominant
    }

    /// Running maximum of the average loudness.
    #[must_use]
    pub fn max_volume(&self) -> Option<f32> {
        self.max_volume.max()
    }

    #[must_use]
    pub fn history(&self) -> &SpectralHistory {
        &self.history
    }

    /// Faces of the last detection, in display coordinates.
    #[must_use]
    pub fn faces(&self) -> &[FaceDetection] {
        &self.faces
    }

    #[must_use]
    pub fn display_size(&self) -> (u32, u32) {
        self.display_size
    }

    #[must_use]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    #[must_use]
    pub fn streams(&self) -> &Streams {
        &self.streams
    }

    pub fn streams_mut(&mut self) -> &mut Streams {
        &mut self.streams
    }
}

fn history_for(config: &CoachConfig) -> SpectralHistory {
    SpectralHistory::from_duration(
        Duration::from_secs_f32(config.audio.history_secs.max(0.0)),
        config.audio.cadence_hz,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_core::face::{BoundingBox, ExpressionScores, NOSE_BRIDGE_LANDMARK, Point};

    fn audio(seq: u64, level: f32) -> AudioFrame {
        AudioFrame {
            bins: vec![level as u8; 128],
            level,
            seq,
        }
    }

    fn face_with_anchor(anchor: Point, scores: &[(Expression, f32)]) -> FaceDetection {
        let mut landmarks = vec![Point::default(); 68];
        landmarks[NOSE_BRIDGE_LANDMARK] = anchor;
        FaceDetection {
            bbox: BoundingBox {
                x: anchor.x - 50.0,
                y: anchor.y - 50.0,
                width: 100.0,
                height: 100.0,
                score: 0.9,
            },
            landmarks,
            expressions: ExpressionScores::from_pairs(scores.iter().copied()),
            age: Some(30.0),
            gender: None,
            gender_probability: 0.0,
        }
    }

    fn session() -> CoachSession {
        let mut s = CoachSession::new(&CoachConfig::default());
        s.set_display_size((640, 360));
        s
    }

    #[test]
    fn running_max_tracks_true_maximum() {
        let mut s = session();
        let levels = [3.0, 90.0, 12.0, 90.0, 140.0, 0.5, 139.0];
        let mut truth = f32::MIN;
        for (i, level) in levels.into_iter().enumerate() {
            s.on_audio_frame(&audio(i as u64 + 1, level));
            truth = truth.max(level);
            assert_eq!(s.max_volume(), Some(truth));
        }
    }

    #[test]
    fn duplicate_audio_frames_are_skipped() {
        let mut s = session();
        assert!(!s.on_audio_frame(&AudioFrame::default()));
        assert!(s.on_audio_frame(&audio(1, 85.0)));
        assert!(!s.on_audio_frame(&audio(1, 85.0)));
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn volume_out_of_band_keeps_previous_verdict() {
        let mut s = session();
        assert_eq!(s.verdicts().volume, VolumeVerdict::Idle);
        s.on_audio_frame(&audio(1, 60.0));
        assert_eq!(s.verdicts().volume, VolumeVerdict::Idle);
        s.on_audio_frame(&audio(2, 75.0));
        assert_eq!(s.verdicts().volume, VolumeVerdict::TooQuiet);
        s.on_audio_frame(&audio(3, 85.0));
        assert_eq!(s.verdicts().volume, VolumeVerdict::Acceptable);
        s.on_audio_frame(&audio(4, 110.0));
        assert_eq!(s.verdicts().volume, VolumeVerdict::TooLoud);
        s.on_audio_frame(&audio(5, 60.0));
        assert_eq!(s.verdicts().volume, VolumeVerdict::TooLoud);
    }

    #[test]
    fn history_is_bounded_by_configured_window() {
        let mut config = CoachConfig::default();
        config.audio.history_secs = 0.05;
        config.audio.cadence_hz = 100;
        let mut s = CoachSession::new(&config);
        assert_eq!(s.history().capacity(), 5);
        for seq in 1..=6 {
            s.on_audio_frame(&audio(seq, seq as f32));
        }
        assert_eq!(s.history().len(), 5);
        let averages: Vec<f32> = s.history().averages().collect();
        assert_eq!(averages, vec![2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn brightness_verdicts_at_boundaries() {
        let mut s = session();
        for (level, expected) in [
            (99, BrightnessVerdict::TooDark),
            (100, BrightnessVerdict::Acceptable),
            (149, BrightnessVerdict::Acceptable),
            (150, BrightnessVerdict::TooBright),
        ] {
            let frame = FrameBuffer::filled(16, 9, [level, level, level, 255]);
            assert_eq!(s.on_video_frame(&frame).unwrap(), f32::from(level));
            assert_eq!(s.verdicts().brightness, Some(expected));
        }
    }

    #[test]
    fn undecoded_frame_is_skipped() {
        let mut s = session();
        s.on_video_frame(&FrameBuffer::filled(4, 4, [120, 120, 120, 255])).unwrap();
        assert!(matches!(
            s.on_video_frame(&FrameBuffer::default()),
            Err(VisionError::NotReady)
        ));
        assert_eq!(s.measurement().brightness, Some(120.0));
        assert_eq!(s.verdicts().brightness, Some(BrightnessVerdict::Acceptable));
    }

    #[test]
    fn centered_face_then_off_center() {
        let mut s = session();
        let centered = face_with_anchor(Point::new(320.0, 180.0), &[(Expression::Happy, 0.9)]);
        s.on_detections(&[centered], (640, 360));
        assert_eq!(s.verdicts().position, Some(PositionVerdict::Centered));
        assert_eq!(s.verdicts().expression, Some(ExpressionVerdict::Relaxed));
        assert_eq!(s.dominant_expression(), Some((Expression::Happy, 0.9)));

        let left = face_with_anchor(Point::new(40.0, 180.0), &[(Expression::Neutral, 0.8)]);
        s.on_detections(&[left], (640, 360));
        assert_eq!(s.verdicts().position, Some(PositionVerdict::OffCenter));
        assert_eq!(s.verdicts().expression, Some(ExpressionVerdict::TooStiff));
    }

    #[test]
    fn detections_are_rescaled_to_display() {
        let mut s = session();
        // Inference ran on a half-size frame
        let face = face_with_anchor(Point::new(160.0, 90.0), &[]);
        s.on_detections(&[face], (320, 180));
        assert_eq!(s.faces()[0].anchor(), Some(Point::new(320.0, 180.0)));
        assert_eq!(s.verdicts().position, Some(PositionVerdict::Centered));
        assert_eq!(s.verdicts().expression, None);
    }

    #[test]
    fn tie_breaks_to_neutral_in_session() {
        let mut s = session();
        let face = face_with_anchor(
            Point::new(320.0, 180.0),
            &[(Expression::Happy, 0.4), (Expression::Neutral, 0.4), (Expression::Sad, 0.2)],
        );
        for _ in 0..3 {
            s.on_detections(std::slice::from_ref(&face), (640, 360));
            assert_eq!(s.dominant_expression(), Some((Expression::Neutral, 0.4)));
        }
    }

    #[test]
    fn no_face_keeps_last_verdicts() {
        let mut s = session();
        let face = face_with_anchor(Point::new(320.0, 180.0), &[(Expression::Happy, 1.0)]);
        s.on_detections(&[face], (640, 360));
        s.on_detections(&[], (640, 360));
        assert_eq!(s.measurement().face_count, 0);
        assert!(s.measurement().face.is_none());
        assert_eq!(s.verdicts().position, Some(PositionVerdict::Centered));
    }

    #[test]
    fn reset_clears_session_state() {
        let mut s = session();
        s.on_audio_frame(&audio(1, 110.0));
        s.streams_mut().video = StreamStatus::Failed("no camera".into());
        s.reset();
        assert_eq!(s.max_volume(), None);
        assert!(s.history().is_empty());
        assert_eq!(s.verdicts(), Verdicts::default());
        assert!(s.streams().video.is_failed());

        // Same seq after reset is still a duplicate of what the analyser sent
        assert!(!s.on_audio_frame(&audio(1, 110.0)));
        assert!(s.on_audio_frame(&audio(2, 50.0)));
        assert_eq!(s.max_volume(), Some(50.0));
    }

    #[test]
    fn late_frame_does_not_hide_video_failure() {
        let mut s = session();
        s.streams_mut().video = StreamStatus::Failed("ffmpeg exited".into());
        s.on_video_frame(&FrameBuffer::filled(4, 4, [120, 120, 120, 255]))
            .unwrap();
        assert_eq!(
            s.streams().video,
            StreamStatus::Failed("ffmpeg exited".into())
        );
    }

    #[test]
    fn detection_errors_map_to_status() {
        let mut s = session();
        s.on_detection_error(&DetectError::Protocol("garbage".into()));
        assert!(!s.streams().detection.is_failed());
        s.on_detection_error(&DetectError::Timeout(2000));
        assert_eq!(
            s.streams().detection,
            StreamStatus::Failed("Détection expirée après 2000 ms".into())
        );
    }

    #[test]
    fn config_reload_updates_thresholds() {
        let mut s = session();
        let mut config = CoachConfig::default();
        config.thresholds.volume_ok_from = 60.0;
        config.thresholds.volume_quiet_above = 50.0;
        s.on_audio_frame(&audio(1, 85.0));
        s.apply_config(&config);
        assert_eq!(s.history().len(), 1);
        s.on_audio_frame(&audio(2, 65.0));
        assert_eq!(s.verdicts().volume, VolumeVerdict::Acceptable);
    }
}
