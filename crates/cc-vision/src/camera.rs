// Capture caméra via ffmpeg en subprocess (std::process::Command).
// Prérequis : `ffmpeg` accessible dans PATH.
//
// Architecture :
//   - `camera_args`         : arguments ffmpeg selon la plateforme (v4l2 / avfoundation / dshow)
//   - `spawn_camera_pipe`   : lance ffmpeg → flux raw RGBA sur stdout
//   - `spawn_camera_thread` : thread dédié, lit les frames, gère Quit
//   - `spawn_stderr_tail`   : vide stderr en continu, garde la fin pour le diagnostic
//   - `CameraSource`        : côté UI, implémente `Source` (dernière frame reçue)

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;

use cc_core::config::CameraConfig;
use cc_core::frame::FrameBuffer;
use cc_core::traits::Source;
use flume::{Receiver, Sender};

use crate::error::VisionError;

/// Taille du pool de frames pré-allouées.
/// Doit être > capacité du canal (3) pour garantir un slot libre sans allocation.
const POOL_SIZE: usize = 6;

/// Capacité du canal de frames.
const CHANNEL_CAP: usize = 3;

/// Octets de stderr conservés pour expliquer une panne.
const STDERR_TAIL: usize = 4096;

/// Commandes pour le thread caméra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraCommand {
    /// Arrêter le thread proprement.
    Quit,
}

/// Input format name for the current platform.
#[must_use]
pub fn input_format() -> &'static str {
    if cfg!(target_os = "macos") {
        "avfoundation"
    } else if cfg!(target_os = "windows") {
        "dshow"
    } else {
        "v4l2"
    }
}

/// Full ffmpeg argument list for a camera → raw RGBA pipe.
///
/// # Example
/// ```
/// use cc_core::config::CameraConfig;
/// use cc_vision::camera::camera_args;
/// let args = camera_args(&CameraConfig::default());
/// assert!(args.iter().any(|a| a == "rawvideo"));
/// assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
/// ```
#[must_use]
pub fn camera_args(config: &CameraConfig) -> Vec<String> {
    let fps = config.fps.to_string();
    let size = format!("{}x{}", config.width, config.height);
    let scale = format!("scale={}:{}:flags=bilinear", config.width, config.height);
    [
        "-f",
        input_format(),
        "-framerate",
        fps.as_str(),
        "-video_size",
        size.as_str(),
        "-i",
        config.device.as_str(),
        "-vf",
        scale.as_str(), // la caméra peut ignorer -video_size
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-an",
        "-hide_banner",
        "-loglevel",
        "error",
        "pipe:1",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

/// Lance un processus `ffmpeg` qui écrit des frames RGBA brutes sur stdout.
///
/// Chaque frame = `w × h × 4` bytes (RGBA row-major, sans padding).
///
/// # Errors
/// Returns [`VisionError::CameraUnavailable`] if ffmpeg cannot be started.
pub fn spawn_camera_pipe(config: &CameraConfig) -> Result<Child, VisionError> {
    let child = Command::new("ffmpeg")
        .args(camera_args(config))
        .stdout(Stdio::piped())
        .stdin(Stdio::null())
        .stderr(Stdio::piped()) // vidé par `spawn_stderr_tail`
        .spawn()
        .map_err(|e| {
            VisionError::CameraUnavailable(format!("impossible de lancer ffmpeg : {e}"))
        })?;
    log::debug!(
        "ffmpeg spawné: {} {}x{} @ {}fps",
        config.device,
        config.width,
        config.height,
        config.fps
    );
    Ok(child)
}

/// Lit exactement `buf.len()` bytes depuis `reader`.
///
/// # Errors
/// Retourne `Ok(true)` si lu avec succès, `Ok(false)` sur EOF avant complétion,
/// `Err` sur erreur I/O fatale.
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => return Ok(false), // EOF
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// Trouve ou crée un slot libre dans le pool.
///
/// Invariant : retourne un index `i` tel que `Arc::strong_count(&pool[i]) == 1`.
/// Si tous les slots sont pris, alloue un nouveau slot (cas exceptionnel).
fn find_or_create_slot(pool: &mut Vec<Arc<FrameBuffer>>, w: u32, h: u32) -> usize {
    if let Some(i) = pool.iter().position(|a| Arc::strong_count(a) == 1) {
        i
    } else {
        pool.push(Arc::new(FrameBuffer::new(w, h)));
        pool.len() - 1
    }
}

/// Lit stderr du processus jusqu'à EOF sur un thread dédié.
///
/// Sans lecteur, ffmpeg bloque dès que le pipe est plein et cesse
/// d'écrire des frames. Seuls les derniers `STDERR_TAIL` octets sont gardés.
fn spawn_stderr_tail(child: &mut Child) -> Option<thread::JoinHandle<Vec<u8>>> {
    let mut stderr = child.stderr.take()?;
    thread::Builder::new()
        .name("cc-camera-stderr".to_string())
        .spawn(move || {
            let mut tail = Vec::with_capacity(STDERR_TAIL);
            let mut chunk = [0u8; 1024];
            loop {
                match stderr.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        tail.extend_from_slice(&chunk[..n]);
                        if tail.len() > STDERR_TAIL {
                            tail.drain(..tail.len() - STDERR_TAIL);
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(_) => break,
                }
            }
            tail
        })
        .ok()
}

/// Last line ffmpeg printed before dying, for the status panel.
fn child_failure(child: &mut Child, stderr_tail: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    let _ = child.kill();
    let status = child.wait().map(|s| s.to_string()).unwrap_or_default();
    // Le processus est mort : le thread atteint EOF
    let bytes = stderr_tail
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    let text = String::from_utf8_lossy(&bytes);
    let last = text
        .lines()
        .map(|l| l.trim_matches(|c: char| c.is_whitespace() || c.is_control()))
        .rfind(|l| !l.is_empty());
    match last {
        Some(line) => line.to_string(),
        None => format!("ffmpeg s'est arrêté ({status})"),
    }
}

/// Spawne le thread de capture caméra.
///
/// Les frames sont envoyées via `frame_tx` ; une panne (périphérique absent,
/// permission refusée, ffmpeg mort) est envoyée une fois via `failure_tx`.
///
/// # Errors
/// Returns an error if ffmpeg or the thread cannot be started.
pub fn spawn_camera_thread(
    config: &CameraConfig,
    frame_tx: Sender<Arc<FrameBuffer>>,
    failure_tx: Sender<String>,
    cmd_rx: Receiver<CameraCommand>,
) -> Result<thread::JoinHandle<()>, VisionError> {
    let child = spawn_camera_pipe(config)?;
    let (w, h) = (config.width, config.height);

    thread::Builder::new()
        .name("cc-camera".to_string())
        .spawn(move || camera_loop(child, w, h, &frame_tx, &failure_tx, &cmd_rx))
        .map_err(|e| VisionError::CameraUnavailable(e.to_string()))
}

/// Boucle principale du thread caméra. La lecture du pipe cadence la boucle.
fn camera_loop(
    mut child: Child,
    w: u32,
    h: u32,
    frame_tx: &Sender<Arc<FrameBuffer>>,
    failure_tx: &Sender<String>,
    cmd_rx: &Receiver<CameraCommand>,
) {
    let mut pool: Vec<Arc<FrameBuffer>> = (0..POOL_SIZE)
        .map(|_| Arc::new(FrameBuffer::new(w, h)))
        .collect();
    let mut frames = 0u64;
    let stderr_tail = spawn_stderr_tail(&mut child);

    loop {
        match cmd_rx.try_recv() {
            Ok(CameraCommand::Quit) | Err(flume::TryRecvError::Disconnected) => {
                log::info!("Thread caméra: arrêt après {frames} frames.");
                break;
            }
            Err(flume::TryRecvError::Empty) => {}
        }

        let idx = find_or_create_slot(&mut pool, w, h);
        let Some(fb) = Arc::get_mut(&mut pool[idx]) else {
            continue;
        };

        let read_result = child
            .stdout
            .as_mut()
            .map_or(Ok(false), |stdout| read_exact_or_eof(stdout, &mut fb.data));

        match read_result {
            Ok(true) => {
                frames += 1;
                if frames == 1 {
                    log::info!("Caméra: première frame {w}x{h}");
                }
                if frame_tx.send(Arc::clone(&pool[idx])).is_err() {
                    break; // receiver dropped
                }
            }
            Ok(false) => {
                let reason = child_failure(&mut child, stderr_tail);
                log::error!("Caméra: flux terminé après {frames} frames : {reason}");
                let _ = failure_tx.send(reason);
                return;
            }
            Err(e) => {
                log::error!("Caméra: erreur lecture pipe : {e}");
                let _ = child.kill();
                let _ = failure_tx.send(e.to_string());
                return;
            }
        }
    }

    let _ = child.kill();
    let _ = child.wait();
}

/// Côté UI d'une source vidéo alimentée par un thread.
///
/// `next_frame` vide le canal sans bloquer et retourne la frame la plus
/// récente ; `None` tant qu'aucune frame n'est arrivée.
pub struct CameraSource {
    frame_rx: Receiver<Arc<FrameBuffer>>,
    failure_rx: Receiver<String>,
    cmd_tx: Option<Sender<CameraCommand>>,
    latest: Option<Arc<FrameBuffer>>,
    failure: Option<String>,
    size: (u32, u32),
}

impl CameraSource {
    /// Open the configured camera.
    ///
    /// # Errors
    /// Returns [`VisionError::CameraUnavailable`] if ffmpeg cannot be started.
    pub fn open(config: &CameraConfig) -> Result<Self, VisionError> {
        let (frame_tx, frame_rx) = flume::bounded(CHANNEL_CAP);
        let (failure_tx, failure_rx) = flume::bounded(1);
        let (cmd_tx, cmd_rx) = flume::bounded(4);
        spawn_camera_thread(config, frame_tx, failure_tx, cmd_rx)?;
        Ok(Self::from_channels(
            frame_rx,
            failure_rx,
            Some(cmd_tx),
            (config.width, config.height),
        ))
    }

    /// Build from existing channels (used by tests and by other producers).
    #[must_use]
    pub fn from_channels(
        frame_rx: Receiver<Arc<FrameBuffer>>,
        failure_rx: Receiver<String>,
        cmd_tx: Option<Sender<CameraCommand>>,
        size: (u32, u32),
    ) -> Self {
        Self {
            frame_rx,
            failure_rx,
            cmd_tx,
            latest: None,
            failure: None,
            size,
        }
    }
}

impl Source for CameraSource {
    fn next_frame(&mut self) -> Option<Arc<FrameBuffer>> {
        while let Ok(frame) = self.frame_rx.try_recv() {
            self.latest = Some(frame);
        }
        self.latest.clone()
    }

    fn native_size(&self) -> (u32, u32) {
        self.size
    }

    fn is_live(&self) -> bool {
        true
    }

    /// Failure reported by the capture thread, if any.
    fn failure(&mut self) -> Option<&str> {
        if self.failure.is_none()
            && let Ok(reason) = self.failure_rx.try_recv()
        {
            self.failure = Some(reason);
        }
        self.failure.as_deref()
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.try_send(CameraCommand::Quit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_exact_reports_eof() {
        let data = [1u8, 2, 3];
        let mut buf = [0u8; 4];
        assert!(!read_exact_or_eof(&mut &data[..], &mut buf).unwrap());
        let mut buf = [0u8; 3];
        assert!(read_exact_or_eof(&mut &data[..], &mut buf).unwrap());
        assert_eq!(buf, data);
    }

    #[test]
    fn camera_args_carry_device_and_size() {
        let config = CameraConfig {
            device: "/dev/video7".into(),
            width: 320,
            height: 240,
            fps: 15,
        };
        let args = camera_args(&config);
        let pos = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[pos + 1], "/dev/video7");
        assert!(args.contains(&"320x240".to_string()));
        assert!(args.contains(&"15".to_string()));
    }

    #[test]
    fn source_returns_latest_frame_and_failure() {
        let (frame_tx, frame_rx) = flume::bounded(3);
        let (failure_tx, failure_rx) = flume::bounded(1);
        let mut source = CameraSource::from_channels(frame_rx, failure_rx, None, (2, 2));
        assert!(source.next_frame().is_none());

        frame_tx.send(Arc::new(FrameBuffer::filled(2, 2, [1, 1, 1, 255]))).unwrap();
        frame_tx.send(Arc::new(FrameBuffer::filled(2, 2, [9, 9, 9, 255]))).unwrap();
        assert_eq!(source.next_frame().unwrap().pixel(0, 0).0, 9);
        // Pas de nouvelle frame : la dernière reste disponible
        assert_eq!(source.next_frame().unwrap().pixel(0, 0).0, 9);

        assert!(source.failure().is_none());
        failure_tx.send("permission denied".into()).unwrap();
        assert_eq!(source.failure(), Some("permission denied"));
    }

    #[cfg(unix)]
    fn sh(script: &str) -> Child {
        Command::new("sh")
            .args(["-c", script])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn noisy_stderr_does_not_stall_frames() {
        // Bien plus qu'un buffer de pipe sur stderr, puis une frame 2x2
        let child = sh("head -c 200000 /dev/zero >&2; head -c 16 /dev/zero");
        let (frame_tx, frame_rx) = flume::bounded(3);
        let (failure_tx, failure_rx) = flume::bounded(1);
        let (_cmd_tx, cmd_rx) = flume::bounded(1);
        let reader = thread::spawn(move || camera_loop(child, 2, 2, &frame_tx, &failure_tx, &cmd_rx));

        let timeout = std::time::Duration::from_secs(3);
        let frame = frame_rx.recv_timeout(timeout).unwrap();
        assert_eq!((frame.width, frame.height), (2, 2));
        assert!(failure_rx.recv_timeout(timeout).is_ok());
        reader.join().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn failure_reports_last_stderr_line() {
        let child = sh("echo 'opening device' >&2; echo '/dev/video9: No such file or directory' >&2; exit 1");
        let (frame_tx, _frame_rx) = flume::bounded(3);
        let (failure_tx, failure_rx) = flume::bounded(1);
        let (_cmd_tx, cmd_rx) = flume::bounded(1);
        camera_loop(child, 2, 2, &frame_tx, &failure_tx, &cmd_rx);
        assert_eq!(
            failure_rx.try_recv().unwrap(),
            "/dev/video9: No such file or directory"
        );
    }

    #[test]
    fn pool_reuses_free_slots() {
        let mut pool: Vec<Arc<FrameBuffer>> = (0..2).map(|_| Arc::new(FrameBuffer::new(1, 1))).collect();
        let held = Arc::clone(&pool[0]);
        assert_eq!(find_or_create_slot(&mut pool, 1, 1), 1);
        let held2 = Arc::clone(&pool[1]);
        assert_eq!(find_or_create_slot(&mut pool, 1, 1), 2);
        drop((held, held2));
        assert_eq!(find_or_create_slot(&mut pool, 1, 1), 0);
    }
}
