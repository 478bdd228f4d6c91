use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cc_core::error::DetectError;
use cc_core::face::FaceDetection;
use cc_core::frame::FrameBuffer;
use cc_core::traits::FaceDetector;

use crate::resize::Resizer;
use crate::scale::resize_results;

/// Result of one completed inference.
#[derive(Clone, Debug)]
pub struct InferenceOutcome {
    /// Detections in native frame coordinates.
    pub detections: Vec<FaceDetection>,
    /// Native size of the frame that was analysed.
    pub frame_size: (u32, u32),
    /// Wall time spent in the worker for this frame.
    pub elapsed: Duration,
}

/// What happened to a frame offered to the worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The frame is being analysed.
    Submitted,
    /// A previous frame is still in flight; this one was dropped.
    Busy,
    /// The worker has failed or stopped and accepts nothing.
    Unavailable,
}

type Reply = Result<InferenceOutcome, DetectError>;

/// Runs a [`FaceDetector`] on its own thread, one frame at a time.
///
/// At most one request is in flight: frames offered while the previous
/// one is still being analysed are dropped, never queued. A request that
/// exceeds the timeout marks the worker failed, since a blocked backend
/// call cannot be interrupted.
pub struct InferenceWorker {
    request_tx: Option<flume::Sender<Arc<FrameBuffer>>>,
    result_rx: flume::Receiver<Reply>,
    in_flight: bool,
    submitted_at: Option<Instant>,
    timeout: Duration,
    dropped: u64,
    failed: bool,
    name: &'static str,
}

impl InferenceWorker {
    /// Move `detector` onto a worker thread.
    ///
    /// Frames wider than `input_width` are downscaled before detection and
    /// results are mapped back to the native size. `0` disables the downscale.
    ///
    /// # Errors
    /// [`DetectError::Backend`] if the thread cannot be spawned.
    pub fn spawn(
        mut detector: Box<dyn FaceDetector>,
        input_width: u32,
        timeout: Duration,
    ) -> Result<Self, DetectError> {
        let name = detector.name();
        let (request_tx, request_rx) = flume::bounded::<Arc<FrameBuffer>>(1);
        let (result_tx, result_rx) = flume::bounded::<Reply>(1);

        thread::Builder::new()
            .name("cc-inference".to_string())
            .spawn(move || {
                let mut resizer = Resizer::new();
                while let Ok(frame) = request_rx.recv() {
                    let started = Instant::now();
                    let reply = run_one(detector.as_mut(), &mut resizer, &frame, input_width).map(
                        |detections| InferenceOutcome {
                            detections,
                            frame_size: (frame.width, frame.height),
                            elapsed: started.elapsed(),
                        },
                    );
                    if result_tx.send(reply).is_err() {
                        break;
                    }
                }
                log::info!("Thread d'inférence terminé");
            })
            .map_err(|e| DetectError::Backend(e.to_string()))?;

        Ok(Self {
            request_tx: Some(request_tx),
            result_rx,
            in_flight: false,
            submitted_at: None,
            timeout,
            dropped: 0,
            failed: false,
            name,
        })
    }

    /// Offer a frame. Never blocks.
    pub fn try_submit(&mut self, frame: Arc<FrameBuffer>) -> SubmitOutcome {
        if self.failed {
            return SubmitOutcome::Unavailable;
        }
        if self.in_flight {
            self.dropped += 1;
            return SubmitOutcome::Busy;
        }
        let Some(tx) = &self.request_tx else {
            return SubmitOutcome::Unavailable;
        };
        match tx.try_send(frame) {
            Ok(()) => {
                self.in_flight = true;
                self.submitted_at = Some(Instant::now());
                SubmitOutcome::Submitted
            }
            Err(flume::TrySendError::Full(_)) => {
                self.dropped += 1;
                SubmitOutcome::Busy
            }
            Err(flume::TrySendError::Disconnected(_)) => {
                self.fail();
                SubmitOutcome::Unavailable
            }
        }
    }

    /// Collect the in-flight result if it is ready. Never blocks.
    ///
    /// Returns `Some(Err(Timeout))` once the in-flight request has run past
    /// the timeout; the worker is then failed for good.
    pub fn poll(&mut self) -> Option<Reply> {
        if !self.in_flight {
            return None;
        }
        match self.result_rx.try_recv() {
            Ok(reply) => Some(self.complete(reply)),
            Err(flume::TryRecvError::Empty) => self.check_timeout(),
            Err(flume::TryRecvError::Disconnected) => {
                self.fail();
                Some(Err(DetectError::WorkerGone))
            }
        }
    }

    /// Block up to `max` for the in-flight result.
    ///
    /// Used for still images, where there is no next frame to wait for.
    pub fn wait(&mut self, max: Duration) -> Option<Reply> {
        if !self.in_flight {
            return None;
        }
        let remaining = self
            .submitted_at
            .map_or(self.timeout, |t| self.timeout.saturating_sub(t.elapsed()));
        match self.result_rx.recv_timeout(max.min(remaining)) {
            Ok(reply) => Some(self.complete(reply)),
            Err(flume::RecvTimeoutError::Timeout) => self.check_timeout(),
            Err(flume::RecvTimeoutError::Disconnected) => {
                self.fail();
                Some(Err(DetectError::WorkerGone))
            }
        }
    }

    /// `true` while a request is being analysed.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// `true` once the worker stopped accepting frames.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Frames dropped because a request was already in flight.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Name of the detector backend.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn complete(&mut self, reply: Reply) -> Reply {
        self.in_flight = false;
        self.submitted_at = None;
        // Un backend mort ne reviendra pas
        if matches!(reply, Err(DetectError::Backend(_))) {
            self.fail();
        }
        reply
    }

    fn check_timeout(&mut self) -> Option<Reply> {
        let started = self.submitted_at?;
        if started.elapsed() < self.timeout {
            return None;
        }
        log::error!(
            "Détection bloquée depuis {} ms, worker abandonné",
            started.elapsed().as_millis()
        );
        self.fail();
        Some(Err(DetectError::Timeout(
            u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        )))
    }

    fn fail(&mut self) {
        self.failed = true;
        self.in_flight = false;
        self.submitted_at = None;
        // Libère le thread dès que le backend rend la main
        self.request_tx = None;
    }
}

fn run_one(
    detector: &mut dyn FaceDetector,
    resizer: &mut Resizer,
    frame: &FrameBuffer,
    input_width: u32,
) -> Result<Vec<FaceDetection>, DetectError> {
    let small = match resizer.fit_width(frame, input_width) {
        Ok(small) => small,
        Err(e) => {
            log::warn!("Redimensionnement avant détection impossible : {e:#}");
            None
        }
    };
    match small {
        Some(small) => {
            let faces = detector.detect(&small)?;
            Ok(resize_results(
                &faces,
                (small.width, small.height),
                (frame.width, frame.height),
            ))
        }
        None => detector.detect(frame),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_core::face::{BoundingBox, Point};

    /// Detector that waits for a go signal, then reports one face in the
    /// middle of whatever frame it was given.
    struct GatedDetector {
        gate: flume::Receiver<()>,
        seen: flume::Sender<(u32, u32)>,
    }

    impl FaceDetector for GatedDetector {
        fn detect(&mut self, frame: &FrameBuffer) -> Result<Vec<FaceDetection>, DetectError> {
            self.gate.recv().map_err(|_| DetectError::WorkerGone)?;
            let _ = self.seen.send((frame.width, frame.height));
            let (cx, cy) = (frame.width as f32 / 2.0, frame.height as f32 / 2.0);
            Ok(vec![FaceDetection {
                bbox: BoundingBox {
                    x: cx - 4.0,
                    y: cy - 4.0,
                    width: 8.0,
                    height: 8.0,
                    score: 0.9,
                },
                landmarks: vec![Point::new(cx, cy); 68],
                expressions: Default::default(),
                age: None,
                gender: None,
                gender_probability: 0.0,
            }])
        }

        fn name(&self) -> &'static str {
            "gated"
        }
    }

    struct BrokenDetector;

    impl FaceDetector for BrokenDetector {
        fn detect(&mut self, _frame: &FrameBuffer) -> Result<Vec<FaceDetection>, DetectError> {
            Err(DetectError::Backend("boom".to_string()))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn gated(
        input_width: u32,
        timeout: Duration,
    ) -> (InferenceWorker, flume::Sender<()>, flume::Receiver<(u32, u32)>) {
        let (gate_tx, gate_rx) = flume::unbounded();
        let (seen_tx, seen_rx) = flume::unbounded();
        let worker = InferenceWorker::spawn(
            Box::new(GatedDetector {
                gate: gate_rx,
                seen: seen_tx,
            }),
            input_width,
            timeout,
        )
        .unwrap();
        (worker, gate_tx, seen_rx)
    }

    #[test]
    fn overlapping_submits_are_dropped() {
        let (mut worker, gate, _seen) = gated(0, Duration::from_secs(5));
        let frame = Arc::new(FrameBuffer::new(32, 32));

        assert_eq!(worker.try_submit(Arc::clone(&frame)), SubmitOutcome::Submitted);
        assert_eq!(worker.try_submit(Arc::clone(&frame)), SubmitOutcome::Busy);
        assert_eq!(worker.try_submit(Arc::clone(&frame)), SubmitOutcome::Busy);
        assert_eq!(worker.dropped(), 2);
        assert!(worker.poll().is_none());

        gate.send(()).unwrap();
        let outcome = worker.wait(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(outcome.detections.len(), 1);
        assert!(!worker.is_busy());

        // Free again once the previous tick completed
        assert_eq!(worker.try_submit(frame), SubmitOutcome::Submitted);
    }

    #[test]
    fn frames_are_downscaled_and_results_mapped_back() {
        let (mut worker, gate, seen) = gated(64, Duration::from_secs(5));
        gate.send(()).unwrap();
        worker.try_submit(Arc::new(FrameBuffer::new(256, 128)));
        let outcome = worker.wait(Duration::from_secs(5)).unwrap().unwrap();

        assert_eq!(seen.recv().unwrap(), (64, 32));
        assert_eq!(outcome.frame_size, (256, 128));
        assert_eq!(outcome.detections[0].anchor(), Some(Point::new(128.0, 64.0)));
    }

    #[test]
    fn stuck_backend_times_out_and_fails() {
        let (mut worker, _gate, _seen) = gated(0, Duration::from_millis(20));
        worker.try_submit(Arc::new(FrameBuffer::new(8, 8)));
        thread::sleep(Duration::from_millis(40));

        assert!(matches!(worker.poll(), Some(Err(DetectError::Timeout(20)))));
        assert!(worker.is_failed());
        assert_eq!(
            worker.try_submit(Arc::new(FrameBuffer::new(8, 8))),
            SubmitOutcome::Unavailable
        );
    }

    #[test]
    fn backend_error_fails_worker() {
        let mut worker =
            InferenceWorker::spawn(Box::new(BrokenDetector), 0, Duration::from_secs(5)).unwrap();
        assert_eq!(worker.name(), "broken");
        worker.try_submit(Arc::new(FrameBuffer::new(8, 8)));
        assert!(matches!(
            worker.wait(Duration::from_secs(5)),
            Some(Err(DetectError::Backend(_)))
        ));
        assert!(worker.is_failed());
    }

    #[test]
    fn idle_worker_has_nothing_to_report() {
        let (mut worker, _gate, _seen) = gated(0, Duration::from_secs(1));
        assert!(worker.poll().is_none());
        assert!(worker.wait(Duration::from_millis(1)).is_none());
    }
}
