use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Configuration complète de la session de coaching, hot-rechargeable.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use cc_core::config::CoachConfig;
/// let config = CoachConfig::default();
/// assert_eq!(config.ui.target_fps, 30);
/// assert_eq!(config.audio.fft_size, 256);
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CoachConfig {
    pub camera: CameraConfig,
    pub audio: AudioConfig,
    pub detection: DetectionConfig,
    pub thresholds: Thresholds,
    pub ui: UiConfig,
}

/// Camera capture parameters.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CameraConfig {
    /// Device identifier passed to ffmpeg (`/dev/video0`, `0`, `video=...`).
    pub device: String,
    /// Capture width in pixels.
    pub width: u32,
    /// Capture height in pixels.
    pub height: u32,
    /// Capture frame rate.
    pub fps: u32,
}

/// Microphone analysis parameters.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AudioConfig {
    /// Capture the microphone at all.
    pub enabled: bool,
    /// FFT window size (power of two). Bins = fft_size / 2.
    pub fft_size: usize,
    /// Temporal smoothing of bin magnitudes [0.0, 1.0).
    pub smoothing: f32,
    /// Level mapped to byte 0.
    pub min_db: f32,
    /// Level mapped to byte 255.
    pub max_db: f32,
    /// Analyses per second.
    pub cadence_hz: u32,
    /// Length of the spectral history window in seconds.
    pub history_secs: f32,
}

/// Face detection backend parameters.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DetectionConfig {
    /// Directory holding the pretrained model sets.
    pub model_dir: PathBuf,
    /// Backend command line (program + args). Empty = detection disabled.
    pub command: Vec<String>,
    /// Interval between detection ticks.
    pub interval_ms: u64,
    /// Maximum time a single inference may take.
    pub timeout_ms: u64,
    /// Frames wider than this are downscaled before inference. 0 = never.
    pub input_width: u32,
}

/// Empirically tuned feedback thresholds.
///
/// Volume values are on the 0–255 byte spectrum scale, brightness on the
/// 0–255 luma scale, center band bounds as fractions of the display size.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Thresholds {
    /// Too quiet strictly above this level (and below `volume_ok_from`).
    pub volume_quiet_above: f32,
    /// Acceptable from this level (inclusive).
    pub volume_ok_from: f32,
    /// Too loud from this level (inclusive).
    pub volume_loud_from: f32,
    /// Too loud strictly below this level.
    pub volume_loud_below: f32,
    /// Too dark strictly below this luma.
    pub brightness_dark_below: f32,
    /// Too bright from this luma (inclusive).
    pub brightness_bright_from: f32,
    /// Lower bound of the central band (inclusive).
    pub center_band_min: f32,
    /// Upper bound of the central band (inclusive).
    pub center_band_max: f32,
}

/// Terminal UI parameters.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UiConfig {
    /// FPS cible du rendu.
    pub target_fps: u32,
    /// Dessiner les points de repère du visage.
    pub show_landmarks: bool,
    /// Afficher l'historique audio sous la vidéo.
    pub show_history: bool,
    /// Dessiner les boîtes et légendes de détection.
    pub show_boxes: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: default_camera_device().to_string(),
            width: 640,
            height: 360,
            fps: 30,
        }
    }
}

/// Platform default camera identifier for ffmpeg.
#[must_use]
pub fn default_camera_device() -> &'static str {
    if cfg!(target_os = "macos") {
        "0"
    } else if cfg!(target_os = "windows") {
        "video=Integrated Camera"
    } else {
        "/dev/video0"
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fft_size: 256,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
            cadence_hz: 60,
            history_secs: 5.0,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("./models"),
            command: Vec::new(),
            interval_ms: 100,
            timeout_ms: 2000,
            input_width: 416,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            volume_quiet_above: 70.0,
            volume_ok_from: 80.0,
            volume_loud_from: 100.0,
            volume_loud_below: 120.0,
            brightness_dark_below: 100.0,
            brightness_bright_from: 150.0,
            center_band_min: 0.4,
            center_band_max: 0.6,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            show_landmarks: true,
            show_history: true,
            show_boxes: true,
        }
    }
}

impl CoachConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        let c = &mut self.camera;
        c.width = c.width.clamp(16, 3840);
        c.height = c.height.clamp(16, 2160);
        c.fps = c.fps.clamp(1, 60);

        // NaN/inf venant du TOML → valeur par défaut, sinon clamp() panique
        let defaults = Self::default();
        let a = &mut self.audio;
        a.smoothing = finite_or(a.smoothing, defaults.audio.smoothing);
        a.min_db = finite_or(a.min_db, defaults.audio.min_db);
        a.max_db = finite_or(a.max_db, defaults.audio.max_db);
        a.history_secs = finite_or(a.history_secs, defaults.audio.history_secs);
        a.fft_size = a.fft_size.clamp(32, 2048).next_power_of_two();
        a.smoothing = a.smoothing.clamp(0.0, 0.99);
        a.min_db = a.min_db.clamp(-200.0, 0.0);
        a.max_db = a.max_db.clamp(a.min_db + 1.0, 20.0);
        a.cadence_hz = a.cadence_hz.clamp(1, 240);
        a.history_secs = a.history_secs.clamp(0.5, 120.0);

        let d = &mut self.detection;
        d.interval_ms = d.interval_ms.clamp(16, 10_000);
        d.timeout_ms = d.timeout_ms.clamp(d.interval_ms, 60_000);
        if d.input_width != 0 {
            d.input_width = d.input_width.clamp(64, 1920);
        }

        let t = &mut self.thresholds;
        let dt = &defaults.thresholds;
        t.volume_quiet_above = finite_or(t.volume_quiet_above, dt.volume_quiet_above);
        t.volume_ok_from = finite_or(t.volume_ok_from, dt.volume_ok_from);
        t.volume_loud_from = finite_or(t.volume_loud_from, dt.volume_loud_from);
        t.volume_loud_below = finite_or(t.volume_loud_below, dt.volume_loud_below);
        t.brightness_dark_below = finite_or(t.brightness_dark_below, dt.brightness_dark_below);
        t.brightness_bright_from = finite_or(t.brightness_bright_from, dt.brightness_bright_from);
        t.center_band_min = finite_or(t.center_band_min, dt.center_band_min);
        t.center_band_max = finite_or(t.center_band_max, dt.center_band_max);
        t.volume_quiet_above = t.volume_quiet_above.clamp(0.0, 255.0);
        t.volume_ok_from = t.volume_ok_from.clamp(t.volume_quiet_above, 255.0);
        t.volume_loud_from = t.volume_loud_from.clamp(t.volume_ok_from, 255.0);
        t.volume_loud_below = t.volume_loud_below.clamp(t.volume_loud_from, 256.0);
        t.brightness_dark_below = t.brightness_dark_below.clamp(0.0, 255.0);
        t.brightness_bright_from = t.brightness_bright_from.clamp(t.brightness_dark_below, 256.0);
        t.center_band_min = t.center_band_min.clamp(0.0, 1.0);
        t.center_band_max = t.center_band_max.clamp(t.center_band_min, 1.0);

        self.ui.target_fps = self.ui.target_fps.clamp(5, 120);
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    camera: Option<CameraSection>,
    audio: Option<AudioSection>,
    detection: Option<DetectionSection>,
    thresholds: Option<ThresholdSection>,
    ui: Option<UiSection>,
}

#[derive(Deserialize)]
struct CameraSection {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
}

#[derive(Deserialize)]
struct AudioSection {
    enabled: Option<bool>,
    fft_size: Option<usize>,
    smoothing: Option<f32>,
    min_db: Option<f32>,
    max_db: Option<f32>,
    cadence_hz: Option<u32>,
    history_secs: Option<f32>,
}

#[derive(Deserialize)]
struct DetectionSection {
    model_dir: Option<PathBuf>,
    command: Option<Vec<String>>,
    interval_ms: Option<u64>,
    timeout_ms: Option<u64>,
    input_width: Option<u32>,
}

#[derive(Deserialize)]
struct ThresholdSection {
    volume_quiet_above: Option<f32>,
    volume_ok_from: Option<f32>,
    volume_loud_from: Option<f32>,
    volume_loud_below: Option<f32>,
    brightness_dark_below: Option<f32>,
    brightness_bright_from: Option<f32>,
    center_band_min: Option<f32>,
    center_band_max: Option<f32>,
}

#[derive(Deserialize)]
struct UiSection {
    target_fps: Option<u32>,
    show_landmarks: Option<bool>,
    show_history: Option<bool>,
    show_boxes: Option<bool>,
}

/// Overwrite `$dst` with `$src` when the optional value is present.
macro_rules! merge {
    ($dst:expr, $src:expr) => {
        if let Some(v) = $src {
            $dst = v;
        }
    };
}

/// Parse TOML text and merge it over the defaults.
///
/// # Errors
/// Returns an error if the text is not valid TOML for this schema, or
/// [`CoreError::Config`] if `detection.command` names a blank program.
///
/// # Example
/// ```
/// use cc_core::config::parse_config;
/// let config = parse_config("[thresholds]\nvolume_ok_from = 85.0\n").unwrap();
/// assert_eq!(config.thresholds.volume_ok_from, 85.0);
/// assert_eq!(config.thresholds.volume_loud_from, 100.0);
/// ```
pub fn parse_config(content: &str) -> Result<CoachConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;
    let mut config = CoachConfig::default();

    if let Some(c) = file.camera {
        merge!(config.camera.device, c.device);
        merge!(config.camera.width, c.width);
        merge!(config.camera.height, c.height);
        merge!(config.camera.fps, c.fps);
    }
    if let Some(a) = file.audio {
        merge!(config.audio.enabled, a.enabled);
        merge!(config.audio.fft_size, a.fft_size);
        merge!(config.audio.smoothing, a.smoothing);
        merge!(config.audio.min_db, a.min_db);
        merge!(config.audio.max_db, a.max_db);
        merge!(config.audio.cadence_hz, a.cadence_hz);
        merge!(config.audio.history_secs, a.history_secs);
    }
    if let Some(d) = file.detection {
        if let Some(program) = d.command.as_ref().and_then(|c| c.first())
            && program.trim().is_empty()
        {
            return Err(CoreError::Config("detection.command : programme vide".to_string()).into());
        }
        merge!(config.detection.model_dir, d.model_dir);
        merge!(config.detection.command, d.command);
        merge!(config.detection.interval_ms, d.interval_ms);
        merge!(config.detection.timeout_ms, d.timeout_ms);
        merge!(config.detection.input_width, d.input_width);
    }
    if let Some(t) = file.thresholds {
        let dst = &mut config.thresholds;
        merge!(dst.volume_quiet_above, t.volume_quiet_above);
        merge!(dst.volume_ok_from, t.volume_ok_from);
        merge!(dst.volume_loud_from, t.volume_loud_from);
        merge!(dst.volume_loud_below, t.volume_loud_below);
        merge!(dst.brightness_dark_below, t.brightness_dark_below);
        merge!(dst.brightness_bright_from, t.brightness_bright_from);
        merge!(dst.center_band_min, t.center_band_min);
        merge!(dst.center_band_max, t.center_band_max);
    }
    if let Some(u) = file.ui {
        merge!(config.ui.target_fps, u.target_fps);
        merge!(config.ui.show_landmarks, u.show_landmarks);
        merge!(config.ui.show_history, u.show_history);
        merge!(config.ui.show_boxes, u.show_boxes);
    }

    config.clamp_all();
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns [`CoreError::FileNotFound`] if the file does not exist, or an
/// error if it cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use cc_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<CoachConfig> {
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Config invalide : {}", path.display()))
}
