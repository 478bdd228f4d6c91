use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use cc_core::error::DetectError;
use cc_core::face::FaceDetection;
use cc_core::frame::FrameBuffer;
use cc_core::traits::FaceDetector;

/// Model sets the detection backend loads from the model directory.
pub const MODEL_SETS: [&str; 5] = [
    "tiny_face_detector",
    "face_landmark_68",
    "face_recognition",
    "face_expression",
    "age_gender",
];

/// Placeholder in the backend command line replaced by the model directory.
pub const MODELS_PLACEHOLDER: &str = "{models}";

/// Check that every model set has a manifest in `dir`.
///
/// A set counts as present when some file name starts with the set name
/// and contains `manifest` (e.g. `face_expression_model-weights_manifest.json`).
///
/// # Errors
/// [`DetectError::ModelsMissing`] lists every absent set, or all of them if
/// the directory cannot be read.
pub fn verify_models(dir: &Path) -> Result<(), DetectError> {
    let names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(e) => {
            log::warn!("Dossier modèles illisible {}: {e}", dir.display());
            Vec::new()
        }
    };

    let missing: Vec<String> = MODEL_SETS
        .iter()
        .filter(|set| {
            !names
                .iter()
                .any(|n| n.starts_with(*set) && n.contains("manifest"))
        })
        .map(|s| (*s).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DetectError::ModelsMissing {
            dir: dir.display().to_string(),
            missing,
        })
    }
}

/// Parse one backend answer: a JSON array of detections.
///
/// # Errors
/// [`DetectError::Protocol`] if the line is not a detection list.
///
/// # Example
/// ```
/// use cc_vision::detector::parse_detections;
/// let line = r#"[{"box":{"x":1,"y":2,"width":3,"height":4,"score":0.9},
///               "landmarks":[], "expressions":{"happy":0.8}}]"#;
/// let faces = parse_detections(line).unwrap();
/// assert_eq!(faces.len(), 1);
/// assert!(parse_detections("nope").is_err());
/// ```
pub fn parse_detections(line: &str) -> Result<Vec<FaceDetection>, DetectError> {
    serde_json::from_str(line.trim()).map_err(|e| DetectError::Protocol(e.to_string()))
}

/// Detector backed by an external process.
///
/// Per frame the process receives a `"<width> <height>\n"` header followed
/// by `width × height × 4` RGBA bytes on stdin, and answers with one JSON
/// line on stdout: an array of detections.
pub struct ExternalDetector {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    line: String,
}

impl ExternalDetector {
    /// Start the backend. `{models}` in any argument is replaced by `model_dir`.
    ///
    /// # Errors
    /// [`DetectError::Backend`] if the command is empty or cannot be spawned.
    pub fn spawn(command: &[String], model_dir: &Path) -> Result<Self, DetectError> {
        let dir = model_dir.display().to_string();
        let mut args = command.iter().map(|a| a.replace(MODELS_PLACEHOLDER, &dir));
        let program = args
            .next()
            .ok_or_else(|| DetectError::Backend("commande de détection vide".to_string()))?;

        let mut child = Command::new(&program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            // Le TUI occupe le terminal
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DetectError::Backend(format!("{program}: {e}")))?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DetectError::Backend("stdout du backend indisponible".to_string()))?;

        log::info!("Backend de détection démarré : {program} (pid {})", child.id());
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            line: String::new(),
        })
    }
}

impl FaceDetector for ExternalDetector {
    fn detect(&mut self, frame: &FrameBuffer) -> Result<Vec<FaceDetection>, DetectError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| DetectError::Backend("stdin fermé".to_string()))?;

        let bytes = frame.pixel_count() * 4;
        let data = frame
            .data
            .get(..bytes)
            .ok_or_else(|| DetectError::Backend("frame incomplète".to_string()))?;

        let header = format!("{} {}\n", frame.width, frame.height);
        stdin
            .write_all(header.as_bytes())
            .and_then(|()| stdin.write_all(data))
            .and_then(|()| stdin.flush())
            .map_err(|e| DetectError::Backend(e.to_string()))?;

        self.line.clear();
        let read = self
            .stdout
            .read_line(&mut self.line)
            .map_err(|e| DetectError::Backend(e.to_string()))?;
        if read == 0 {
            return Err(DetectError::Backend("le backend a fermé sa sortie".to_string()));
        }

        parse_detections(&self.line)
    }

    fn name(&self) -> &'static str {
        "external"
    }
}

impl Drop for ExternalDetector {
    fn drop(&mut self) {
        // Fermer stdin suffit aux backends bien élevés
        self.stdin.take();
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
