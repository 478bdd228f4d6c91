use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Referenced file does not exist.
    #[error("Fichier introuvable : {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// Invalid width/height dimensions.
    #[error("Dimensions invalides : {width}×{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },
}

/// Errors raised by a face detector backend.
#[derive(Error, Debug)]
pub enum DetectError {
    /// One or more model sets are absent from the model directory.
    #[error("Modèles manquants dans {dir} : {missing:?}")]
    ModelsMissing {
        /// Directory that was searched.
        dir: String,
        /// Names of the missing model sets.
        missing: Vec<String>,
    },

    /// The backend process could not be started or has exited.
    #[error("Backend de détection indisponible : {0}")]
    Backend(String),

    /// The backend answered with something that is not a detection list.
    #[error("Réponse de détection invalide : {0}")]
    Protocol(String),

    /// The backend did not answer in time.
    #[error("Détection expirée après {0} ms")]
    Timeout(u64),

    /// The inference worker is gone.
    #[error("Worker de détection arrêté")]
    WorkerGone,
}
