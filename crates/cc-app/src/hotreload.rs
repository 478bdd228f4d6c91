use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use cc_core::config::{CoachConfig, load_config};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Recharge la config depuis `path` et la publie dans `config`.
///
/// `overrides` is applied to the freshly parsed config before it is stored.
/// A file that fails to load leaves the current config in place.
pub fn reload_into(
    path: &Path,
    config: &ArcSwap<CoachConfig>,
    overrides: &dyn Fn(&mut CoachConfig),
) -> bool {
    match load_config(path) {
        Ok(mut new_config) => {
            overrides(&mut new_config);
            config.store(Arc::new(new_config));
            log::info!("Config rechargée depuis {}", path.display());
            true
        }
        Err(e) => {
            log::warn!("Erreur de rechargement config : {e:#}");
            false
        }
    }
}

/// Surveille le fichier config et met à jour l'ArcSwap à chaque écriture.
///
/// The parent directory is watched so editors that save by rename are
/// picked up too. Retourne le Watcher (doit rester vivant tant que l'app tourne).
///
/// # Errors
/// Returns an error if the watcher cannot be created or the directory cannot be watched.
pub fn spawn_config_watcher<F>(
    config_path: &Path,
    config: &Arc<ArcSwap<CoachConfig>>,
    overrides: F,
) -> Result<RecommendedWatcher>
where
    F: Fn(&mut CoachConfig) + Send + 'static,
{
    let config = Arc::clone(config);
    let path = config_path.to_path_buf();
    let file_name = path.file_name().map(ToOwned::to_owned);
    let dir: PathBuf = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let Ok(event) = res else {
            return;
        };
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return;
        }
        if event
            .paths
            .iter()
            .any(|p| p.file_name() == file_name.as_deref())
        {
            reload_into(&path, &config, &overrides);
        }
    })?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Impossible de surveiller {}", dir.display()))?;
    Ok(watcher)
}
