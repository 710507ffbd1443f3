//! Transcode orchestration use case

use std::sync::Arc;
use std::time::Duration as StdDuration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};

use super::ports::{ConvertRequest, TranscodeWorker, WorkerChannelError, WorkerEvent};
use crate::domain::video::{VideoArtifact, VideoMimeType};

/// Wall-clock ceiling for one conversion job (120 seconds)
pub const CONVERT_TIMEOUT_SECS: u64 = 120;

/// Progress callback for conversion.
/// Parameters: (fraction 0.0..=1.0, optional status note)
pub type ConvertProgress = Arc<dyn Fn(f32, Option<&str>) + Send + Sync>;

/// Terminal failure of one conversion job.
/// Every variant is recoverable: the caller may fall back to the
/// unconverted artifact and proceed.
#[derive(Debug, Clone, Error)]
pub enum ConversionFailure {
    #[error("Files of type {mime} cannot be converted")]
    UnsupportedFormat { mime: VideoMimeType },

    #[error("Conversion did not finish within {CONVERT_TIMEOUT_SECS} seconds")]
    TimedOut,

    #[error("Conversion failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Channel(#[from] WorkerChannelError),
}

/// Coordinates a single conversion request end-to-end.
///
/// Exactly one job is in flight at a time; a second `convert` call queues
/// behind the current one rather than dropping it. Each job observes exactly
/// one terminal outcome: success, worker error, channel death, or the
/// 120-second timeout. On timeout the job's event stream is dropped and the
/// worker is left running; the abandoned computation is bounded to one job
/// and the channel stays usable for later requests.
pub struct TranscodeOrchestrator<W: TranscodeWorker> {
    worker: W,
    in_flight: Mutex<()>,
}

impl<W: TranscodeWorker> TranscodeOrchestrator<W> {
    /// Create an orchestrator over a worker channel
    pub fn new(worker: W) -> Self {
        Self {
            worker,
            in_flight: Mutex::new(()),
        }
    }

    /// Convert an artifact to the broadly playable target format.
    ///
    /// Fast path: an artifact already in the target format is returned
    /// without a worker round-trip. Artifacts the engine cannot read are
    /// rejected up front with `UnsupportedFormat`.
    pub async fn convert(
        &self,
        artifact: VideoArtifact,
        on_progress: Option<ConvertProgress>,
    ) -> Result<VideoArtifact, ConversionFailure> {
        let _guard = self.in_flight.lock().await;

        let mime = artifact.mime_type();
        if mime.is_conversion_target() {
            return Ok(artifact);
        }
        if !mime.is_conversion_source() {
            return Err(ConversionFailure::UnsupportedFormat { mime });
        }

        let origin = artifact.origin();
        let request = ConvertRequest {
            suggested_name: artifact.suggested_name(),
            bytes: artifact.into_data(),
        };

        let mut events = self.worker.submit(request).await?;
        let deadline = Instant::now() + StdDuration::from_secs(CONVERT_TIMEOUT_SECS);
        let mut last_fraction = 0.0_f32;

        loop {
            match timeout_at(deadline, events.recv()).await {
                // Deadline hit: drop the receiver (detaching this job's
                // listener) and report the timeout. The worker may still
                // finish the abandoned job; nobody is listening.
                Err(_) => return Err(ConversionFailure::TimedOut),

                // Stream closed without a terminal event: the worker died
                Ok(None) => return Err(WorkerChannelError::Closed.into()),

                Ok(Some(WorkerEvent::Ready)) => {}

                Ok(Some(WorkerEvent::Progress { fraction, note })) => {
                    // Latest value wins, but never report a regression
                    if fraction >= last_fraction {
                        last_fraction = fraction;
                        if let Some(cb) = &on_progress {
                            cb(fraction, note.as_deref());
                        }
                    }
                }

                Ok(Some(WorkerEvent::Complete { bytes })) => {
                    if let Some(cb) = &on_progress {
                        cb(1.0, None);
                    }
                    return Ok(VideoArtifact::new(bytes, VideoMimeType::Mp4, origin));
                }

                Ok(Some(WorkerEvent::Error { note })) => {
                    return Err(ConversionFailure::Worker(note));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::video::ArtifactOrigin;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::mpsc;

    /// Worker that replays a fixed script of events for every job
    struct ScriptedWorker {
        script: Vec<WorkerEvent>,
        submissions: AtomicUsize,
    }

    impl ScriptedWorker {
        fn new(script: Vec<WorkerEvent>) -> Self {
            Self {
                script,
                submissions: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TranscodeWorker for ScriptedWorker {
        async fn submit(
            &self,
            _request: ConvertRequest,
        ) -> Result<mpsc::Receiver<WorkerEvent>, WorkerChannelError> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::channel(16);
            for event in self.script.clone() {
                let _ = tx.send(event).await;
            }
            Ok(rx)
        }
    }

    /// Worker that accepts the job but never delivers a terminal event
    struct StalledWorker {
        // Keep senders alive so receivers stay open without a terminal event
        held: StdMutex<Vec<mpsc::Sender<WorkerEvent>>>,
    }

    impl StalledWorker {
        fn new() -> Self {
            Self {
                held: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TranscodeWorker for StalledWorker {
        async fn submit(
            &self,
            _request: ConvertRequest,
        ) -> Result<mpsc::Receiver<WorkerEvent>, WorkerChannelError> {
            let (tx, rx) = mpsc::channel(16);
            let _ = tx.send(WorkerEvent::Ready).await;
            self.held.lock().unwrap().push(tx);
            Ok(rx)
        }
    }

    fn webm_artifact(bytes: Vec<u8>) -> VideoArtifact {
        VideoArtifact::new(bytes, VideoMimeType::Webm, ArtifactOrigin::Recorded)
    }

    #[tokio::test]
    async fn fast_path_skips_worker_for_mp4() {
        let worker = ScriptedWorker::new(vec![]);
        let orchestrator = TranscodeOrchestrator::new(worker);

        let artifact =
            VideoArtifact::new(vec![9, 9], VideoMimeType::Mp4, ArtifactOrigin::Uploaded);
        let out = orchestrator.convert(artifact, None).await.unwrap();

        assert_eq!(out.mime_type(), VideoMimeType::Mp4);
        assert_eq!(out.data(), &[9, 9]);
        assert_eq!(orchestrator.worker.submissions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unsupported_format_is_rejected_without_worker_call() {
        let worker = ScriptedWorker::new(vec![]);
        let orchestrator = TranscodeOrchestrator::new(worker);

        let artifact =
            VideoArtifact::new(vec![1], VideoMimeType::Avi, ArtifactOrigin::Uploaded);
        let err = orchestrator.convert(artifact, None).await.unwrap_err();

        assert!(matches!(
            err,
            ConversionFailure::UnsupportedFormat {
                mime: VideoMimeType::Avi
            }
        ));
        assert_eq!(orchestrator.worker.submissions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn complete_yields_mp4_artifact_preserving_origin() {
        let worker = ScriptedWorker::new(vec![
            WorkerEvent::Ready,
            WorkerEvent::Progress {
                fraction: 0.5,
                note: None,
            },
            WorkerEvent::Complete { bytes: vec![7, 7] },
        ]);
        let orchestrator = TranscodeOrchestrator::new(worker);

        let out = orchestrator
            .convert(webm_artifact(vec![1, 2]), None)
            .await
            .unwrap();

        assert_eq!(out.mime_type(), VideoMimeType::Mp4);
        assert_eq!(out.data(), &[7, 7]);
        assert_eq!(out.origin(), ArtifactOrigin::Recorded);
    }

    #[tokio::test]
    async fn worker_error_surfaces_as_failure() {
        let worker = ScriptedWorker::new(vec![WorkerEvent::Error {
            note: "codec blew up".to_string(),
        }]);
        let orchestrator = TranscodeOrchestrator::new(worker);

        let err = orchestrator
            .convert(webm_artifact(vec![1]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionFailure::Worker(note) if note.contains("codec blew up")));
    }

    #[tokio::test]
    async fn closed_stream_without_terminal_is_channel_error() {
        let worker = ScriptedWorker::new(vec![WorkerEvent::Progress {
            fraction: 0.3,
            note: None,
        }]);
        let orchestrator = TranscodeOrchestrator::new(worker);

        let err = orchestrator
            .convert(webm_artifact(vec![1]), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConversionFailure::Channel(WorkerChannelError::Closed)
        ));
    }

    #[tokio::test]
    async fn progress_is_reported_monotonically() {
        let worker = ScriptedWorker::new(vec![
            WorkerEvent::Progress {
                fraction: 0.2,
                note: None,
            },
            WorkerEvent::Progress {
                fraction: 0.1, // regression must be suppressed
                note: None,
            },
            WorkerEvent::Progress {
                fraction: 0.6,
                note: None,
            },
            WorkerEvent::Complete { bytes: vec![0] },
        ]);
        let orchestrator = TranscodeOrchestrator::new(worker);

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);
        let on_progress: ConvertProgress = Arc::new(move |fraction, _note| {
            seen_cb.lock().unwrap().push(fraction);
        });

        orchestrator
            .convert(webm_artifact(vec![1]), Some(on_progress))
            .await
            .unwrap();

        let fractions = seen.lock().unwrap().clone();
        assert_eq!(fractions, vec![0.2, 0.6, 1.0]);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_job_times_out_after_ceiling() {
        let orchestrator = TranscodeOrchestrator::new(StalledWorker::new());

        let err = orchestrator
            .convert(webm_artifact(vec![1]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionFailure::TimedOut));
    }

    #[tokio::test(start_paused = true)]
    async fn channel_stays_usable_after_timeout() {
        struct StallThenComplete {
            calls: AtomicUsize,
            held: StdMutex<Vec<mpsc::Sender<WorkerEvent>>>,
        }

        #[async_trait]
        impl TranscodeWorker for StallThenComplete {
            async fn submit(
                &self,
                _request: ConvertRequest,
            ) -> Result<mpsc::Receiver<WorkerEvent>, WorkerChannelError> {
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                let (tx, rx) = mpsc::channel(16);
                if call == 0 {
                    self.held.lock().unwrap().push(tx);
                } else {
                    let _ = tx.send(WorkerEvent::Complete { bytes: vec![5] }).await;
                }
                Ok(rx)
            }
        }

        let orchestrator = TranscodeOrchestrator::new(StallThenComplete {
            calls: AtomicUsize::new(0),
            held: StdMutex::new(Vec::new()),
        });

        let first = orchestrator.convert(webm_artifact(vec![1]), None).await;
        assert!(matches!(first, Err(ConversionFailure::TimedOut)));

        let second = orchestrator
            .convert(webm_artifact(vec![2]), None)
            .await
            .unwrap();
        assert_eq!(second.data(), &[5]);
    }
}
