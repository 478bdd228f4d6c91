use std::path::PathBuf;

use cc_core::config::CoachConfig;
use clap::Parser;

/// camcoach: webcam coaching overlay in the terminal.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Image fixe (PNG, JPEG, BMP) à la place de la caméra.
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Camera device passed to ffmpeg (e.g. /dev/video2, 0, "video=My Cam").
    #[arg(long)]
    pub device: Option<String>,

    /// Ne pas capturer le micro.
    #[arg(long, default_value_t = false)]
    pub no_audio: bool,

    /// Detector command line, split on whitespace. `{models}` expands to the model directory.
    #[arg(long)]
    pub detector: Option<String>,

    /// Model directory.
    #[arg(long)]
    pub models: Option<PathBuf>,

    /// Interval between detection ticks, in ms.
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// FPS cible du rendu.
    #[arg(long)]
    pub fps: Option<u32>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Write logs to this file (the terminal belongs to the UI).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded config.
    ///
    /// Also used after every hot reload so the overrides stick.
    pub fn apply_overrides(&self, config: &mut CoachConfig) {
        if let Some(device) = &self.device {
            config.camera.device.clone_from(device);
        }
        if self.no_audio {
            config.audio.enabled = false;
        }
        if let Some(cmd) = &self.detector {
            config.detection.command = cmd.split_whitespace().map(str::to_string).collect();
        }
        if let Some(dir) = &self.models {
            config.detection.model_dir.clone_from(dir);
        }
        if let Some(ms) = self.interval_ms {
            config.detection.interval_ms = ms;
        }
        if let Some(fps) = self.fps {
            config.ui.target_fps = fps;
        }
        config.clamp_all();
    }

    /// Short label for the video source.
    #[must_use]
    pub fn source_label(&self, config: &CoachConfig) -> String {
        match &self.image {
            Some(path) => path.display().to_string(),
            None => config.camera.device.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let cli = Cli::parse_from([
            "camcoach",
            "--device",
            "/dev/video3",
            "--no-audio",
            "--detector",
            "python3 detect.py --models {models}",
            "--models",
            "/opt/models",
            "--interval-ms",
            "250",
            "--fps",
            "500",
        ]);
        let mut config = CoachConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.camera.device, "/dev/video3");
        assert!(!config.audio.enabled);
        assert_eq!(
            config.detection.command,
            vec!["python3", "detect.py", "--models", "{models}"]
        );
        assert_eq!(config.detection.model_dir, PathBuf::from("/opt/models"));
        assert_eq!(config.detection.interval_ms, 250);
        // Clamped
        assert_eq!(config.ui.target_fps, 120);
    }

    #[test]
    fn defaults_leave_config_alone() {
        let cli = Cli::parse_from(["camcoach"]);
        let mut config = CoachConfig::default();
        cli.apply_overrides(&mut config);
        assert!(config.audio.enabled);
        assert!(config.detection.command.is_empty());
        assert_eq!(cli.config, PathBuf::from("config/default.toml"));
        assert_eq!(cli.source_label(&config), config.camera.device);
    }
}
