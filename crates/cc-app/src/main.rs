use std::fs::File;
use std::sync::Arc;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use cc_core::config::{CoachConfig, load_config};
use cc_core::error::CoreError;
use clap::Parser;

pub mod app;
pub mod cli;
pub mod hotreload;
pub mod pipeline;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging (fichier si demandé : le terminal appartient au TUI)
    init_logging(&cli)?;

    // 3. Charger la config et appliquer les overrides CLI
    let mut config = resolve_config(&cli)?;
    cli.apply_overrides(&mut config);
    let config = Arc::new(ArcSwap::from_pointee(config));

    // 4. Hot-reload (les overrides CLI restent prioritaires)
    let _watcher = if cli.config.exists() {
        let overrides = cli.clone();
        match hotreload::spawn_config_watcher(&cli.config, &config, move |c| {
            overrides.apply_overrides(c);
        }) {
            Ok(w) => Some(w),
            Err(e) => {
                log::warn!("Hot-reload désactivé : {e:#}");
                None
            }
        }
    } else {
        None
    };

    // 5. Démarrer caméra, micro, détection (chacun peut échouer seul)
    let snapshot = config.load_full();
    let (source, video_status) = pipeline::start_source(&cli, &snapshot);
    let (audio, audio_status) = pipeline::start_audio(&snapshot);
    let (detector, detection_status) = pipeline::start_detector(&snapshot);
    let inputs = app::Inputs {
        source,
        video_status,
        audio,
        audio_status,
        detector,
        detection_status,
        source_label: cli.source_label(&snapshot),
    };

    // 6. Terminal ratatui + boucle principale
    let mut app_instance = app::App::new(config, inputs);
    let terminal = ratatui::init();
    let result = app_instance.run(terminal);

    // 7. Restaurer le terminal (TOUJOURS, même en cas d'erreur)
    ratatui::restore();

    result
}

fn init_logging(cli: &cli::Cli) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn));
    if let Some(path) = &cli.log_file {
        let file = File::create(path)
            .with_context(|| format!("Impossible de créer le fichier de log {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

/// Load `--config`, falling back to the defaults when the file does not exist.
fn resolve_config(cli: &cli::Cli) -> Result<CoachConfig> {
    match load_config(&cli.config) {
        Err(e) if matches!(e.downcast_ref::<CoreError>(), Some(CoreError::FileNotFound { .. })) => {
            log::warn!("{e}. Utilisation des défauts.");
            Ok(CoachConfig::default())
        }
        other => other,
    }
}
