use thiserror::Error;

/// Errors originating from the audio module.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio input device found.
    #[error("Aucun périphérique audio d'entrée trouvé")]
    NoInputDevice,

    /// Unsupported audio format.
    #[error("Format audio non supporté : {0}")]
    UnsupportedFormat(String),

    /// Audio stream error (permission denied, device busy, ...).
    #[error("Erreur de stream audio : {0}")]
    StreamError(String),

    /// The analysis thread could not be started.
    #[error("Thread d'analyse audio : {0}")]
    Thread(String),
}
