use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use arc_swap::ArcSwap;
use cc_audio::state::AudioHandle;
use cc_coach::{CoachSession, StreamStatus};
use cc_core::config::CoachConfig;
use cc_core::frame::FrameBuffer;
use cc_core::traits::Source;
use cc_render::fps::{FpsCounter, frame_budget};
use cc_render::ui::{DrawContext, ViewOptions};
use cc_vision::error::VisionError;
use cc_vision::inference::{InferenceWorker, SubmitOutcome};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;

/// Attente max du résultat d'inférence par frame pour une image fixe.
const STILL_WAIT: Duration = Duration::from_millis(10);

/// Media handles started by the pipeline, with the status of each stream.
pub struct Inputs {
    pub source: Option<Box<dyn Source>>,
    pub video_status: StreamStatus,
    pub audio: Option<AudioHandle>,
    pub audio_status: StreamStatus,
    pub detector: Option<InferenceWorker>,
    pub detection_status: StreamStatus,
    /// Short description of the video source.
    pub source_label: String,
}

/// Main application struct holding all state.
pub struct App {
    /// Config courante (lecture via arc-swap, écrite par le hot-reload).
    config: Arc<ArcSwap<CoachConfig>>,
    /// Dernière config appliquée à la session.
    applied: Arc<CoachConfig>,
    session: CoachSession,
    source: Option<Box<dyn Source>>,
    audio: Option<AudioHandle>,
    detector: Option<InferenceWorker>,
    current_frame: Option<Arc<FrameBuffer>>,
    source_label: String,
    view: ViewOptions,
    fps_counter: FpsCounter,
    last_detection: Option<Instant>,
    /// Image fixe déjà analysée : inutile de relancer la détection.
    still_detected: bool,
    /// Incrémenté à chaque redémarrage de session.
    generation: u64,
    /// Génération de la requête en cours d'inférence.
    submitted_generation: u64,
    quitting: bool,
}

impl App {
    #[must_use]
    pub fn new(config: Arc<ArcSwap<CoachConfig>>, inputs: Inputs) -> Self {
        let applied = config.load_full();
        let mut session = CoachSession::new(&applied);
        if let Some(source) = &inputs.source {
            session.set_display_size(source.native_size());
        }
        let streams = session.streams_mut();
        streams.video = inputs.video_status;
        streams.audio = inputs.audio_status;
        streams.detection = inputs.detection_status;

        Self {
            view: ViewOptions::from_config(&applied.ui),
            config,
            applied,
            session,
            source: inputs.source,
            audio: inputs.audio,
            detector: inputs.detector,
            current_frame: None,
            source_label: inputs.source_label,
            fps_counter: FpsCounter::new(60),
            last_detection: None,
            still_detected: false,
            generation: 0,
            submitted_generation: 0,
            quitting: false,
        }
    }

    /// Boucle principale : événements, mesures, rendu.
    ///
    /// # Errors
    /// Returns an error if terminal operations fail.
    pub fn run(&mut self, mut terminal: DefaultTerminal) -> Result<()> {
        let mut last_frame = Instant::now();

        while !self.is_quitting() {
            let budget = frame_budget(self.config.load().ui.target_fps);
            let elapsed = last_frame.elapsed();
            if elapsed < budget {
                // Dormir le temps restant, mais rester réactif aux événements
                if event::poll(budget.saturating_sub(elapsed))? {
                    self.handle_event(&event::read()?);
                }
                continue;
            }
            last_frame = Instant::now();

            while event::poll(Duration::ZERO)? {
                self.handle_event(&event::read()?);
            }

            self.tick(last_frame);

            self.fps_counter.tick();
            let ctx = DrawContext {
                video: self.current_frame.as_deref(),
                fps: &self.fps_counter,
                view: self.view(),
                source: &self.source_label,
                dropped_ticks: self.detector.as_ref().map_or(0, InferenceWorker::dropped),
            };
            let session = self.session();
            terminal.draw(|frame| cc_render::ui::draw(frame, session, &ctx))?;
        }

        Ok(())
    }

    /// One UI frame worth of work: config, audio, video, detection.
    pub fn tick(&mut self, now: Instant) {
        self.apply_config_changes();
        self.sample_audio();
        self.sample_video();
        self.drive_detection(now);
    }

    fn apply_config_changes(&mut self) {
        let latest = self.config.load_full();
        if Arc::ptr_eq(&latest, &self.applied) {
            return;
        }
        self.session.apply_config(&latest);
        let ui = ViewOptions::from_config(&latest.ui);
        self.view = ViewOptions {
            show_help: self.view.show_help,
            ..ui
        };
        self.applied = latest;
        self.still_detected = false;
        log::debug!("Nouvelle config appliquée à la session");
    }

    fn sample_audio(&mut self) {
        if let Some(audio) = &mut self.audio {
            self.session.on_audio_frame(audio.latest());
        }
    }

    fn sample_video(&mut self) {
        let Some(source) = &mut self.source else {
            return;
        };
        if let Some(reason) = source.failure() {
            if !self.session.streams().video.is_failed() {
                log::error!("Caméra arrêtée : {reason}");
                self.session.streams_mut().video = StreamStatus::Failed(reason.to_string());
            }
            // La dernière frame reçue est figée : ne plus la mesurer
            return;
        }
        let Some(frame) = source.next_frame() else {
            return;
        };
        if frame.is_ready() {
            self.session.set_display_size((frame.width, frame.height));
        }
        match self.session.on_video_frame(&frame) {
            Ok(_) | Err(VisionError::NotReady) => {}
            Err(e) => log::warn!("Mesure de luminosité impossible : {e}"),
        }
        self.current_frame = Some(frame);
    }

    fn drive_detection(&mut self, now: Instant) {
        let Some(worker) = &mut self.detector else {
            return;
        };
        let still = self.source.as_ref().is_some_and(|s| !s.is_live());

        // Une image fixe ne change pas : attendre un peu le résultat plutôt que la frame suivante
        let reply = if still { worker.wait(STILL_WAIT) } else { worker.poll() };
        if let Some(reply) = reply {
            match reply {
                Ok(_) if self.submitted_generation != self.generation => {
                    log::debug!("Résultat d'avant le redémarrage ignoré");
                }
                Ok(outcome) => {
                    self.still_detected = still;
                    log::trace!(
                        "{} visage(s) en {} ms",
                        outcome.detections.len(),
                        outcome.elapsed.as_millis()
                    );
                    self.session
                        .on_detections(&outcome.detections, outcome.frame_size);
                }
                Err(e) => self.session.on_detection_error(&e),
            }
        }

        if self.still_detected {
            return;
        }
        let interval = Duration::from_millis(self.applied.detection.interval_ms);
        if self
            .last_detection
            .is_some_and(|t| now.saturating_duration_since(t) < interval)
        {
            return;
        }
        let Some(frame) = self.current_frame.as_ref().filter(|f| f.is_ready()) else {
            return;
        };
        self.last_detection = Some(now);
        match worker.try_submit(Arc::clone(frame)) {
            SubmitOutcome::Submitted => self.submitted_generation = self.generation,
            SubmitOutcome::Busy => log::debug!("Tick de détection ignoré : inférence en cours"),
            SubmitOutcome::Unavailable => {
                if !self.session.streams().detection.is_failed() {
                    self.session.streams_mut().detection =
                        StreamStatus::Failed("worker arrêté".to_string());
                }
            }
        }
    }

    fn handle_event(&mut self, event: &Event) {
        if let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = *event
        {
            self.handle_key(code);
        }
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.quitting = true,
            KeyCode::Esc => {
                if self.view.show_help {
                    self.view.show_help = false;
                } else {
                    self.quitting = true;
                }
            }
            KeyCode::Char('?') => self.view.show_help = !self.view.show_help,
            KeyCode::Char('r') => {
                self.session.reset();
                self.fps_counter.reset();
                self.still_detected = false;
                self.generation += 1;
            }
            KeyCode::Char('l') => self.view.show_landmarks = !self.view.show_landmarks,
            KeyCode::Char('b') => self.view.show_boxes = !self.view.show_boxes,
            KeyCode::Char('h') => self.view.show_history = !self.view.show_history,
            _ => {}
        }
    }

    #[must_use]
    pub fn session(&self) -> &CoachSession {
        &self.session
    }

    #[must_use]
    pub fn view(&self) -> ViewOptions {
        self.view
    }

    #[must_use]
    pub fn is_quitting(&self) -> bool {
        self.quitting
    }
}
