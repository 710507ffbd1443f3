//! FFmpeg-based bounded video recorder adapter

use std::collections::HashSet;
use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, Duration as TokioDuration, MissedTickBehavior};

use crate::application::ports::{
    MediaSession, RecorderError, TickCallback, VideoRecorder,
};
use crate::domain::recording::{
    Duration, RecordingSession, RecordingStateError, TickOutcome, CHUNK_FLUSH_INTERVAL_MS,
};
use crate::domain::video::{VideoArtifact, VideoMimeType, MAX_ARTIFACT_BYTES};

/// One container/codec combination the recorder can negotiate
struct EncodingCandidate {
    mime: VideoMimeType,
    video_codec: &'static str,
    video_opts: &'static [&'static str],
    audio_codec: &'static str,
    muxer: &'static str,
}

/// Ordered preference list; the first fully supported candidate wins
const ENCODING_PREFERENCES: &[EncodingCandidate] = &[
    EncodingCandidate {
        mime: VideoMimeType::Webm,
        video_codec: "libvpx",
        video_opts: &["-deadline", "realtime", "-cpu-used", "8", "-b:v", "1M"],
        audio_codec: "libopus",
        muxer: "webm",
    },
    EncodingCandidate {
        mime: VideoMimeType::Matroska,
        video_codec: "libx264",
        video_opts: &["-preset", "ultrafast", "-tune", "zerolatency"],
        audio_codec: "aac",
        muxer: "matroska",
    },
    EncodingCandidate {
        mime: VideoMimeType::Ogg,
        video_codec: "libtheora",
        video_opts: &["-q:v", "5"],
        audio_codec: "libvorbis",
        muxer: "ogg",
    },
];

/// State held while one recording is in flight
struct ActiveRecording {
    session: MediaSession,
    recording: Arc<StdMutex<Option<RecordingSession>>>,
    pending: Arc<StdMutex<Vec<u8>>>,
    reader: JoinHandle<()>,
    ticker: JoinHandle<()>,
}

/// FFmpeg recorder producing a single in-memory artifact per attempt.
///
/// The capture process streams the encoded container to its stdout; a reader
/// task accumulates bytes and a one-second ticker flushes them as chunks into
/// the domain session. The ticker signals the process to stop the instant the
/// duration ceiling or the size limit is reached, so an auto-stopped
/// recording finalizes exactly like a user-stopped one.
pub struct FfmpegVideoRecorder {
    active: Arc<Mutex<Option<ActiveRecording>>>,
    is_recording: Arc<AtomicBool>,
    elapsed_ms: Arc<AtomicU64>,
}

impl FfmpegVideoRecorder {
    pub fn new() -> Self {
        Self {
            active: Arc::new(Mutex::new(None)),
            is_recording: Arc::new(AtomicBool::new(false)),
            elapsed_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Pick the first preference whose encoders are all present
    /// in `ffmpeg -encoders` output
    fn pick_encoding(encoders: &str) -> Option<&'static EncodingCandidate> {
        let available: HashSet<&str> = encoders
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .collect();

        ENCODING_PREFERENCES
            .iter()
            .find(|c| available.contains(c.video_codec) && available.contains(c.audio_codec))
    }

    async fn negotiate_encoding() -> Result<&'static EncodingCandidate, RecorderError> {
        let output = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    RecorderError::StartFailed("ffmpeg is not installed".to_string())
                } else {
                    RecorderError::StartFailed(e.to_string())
                }
            })?;

        let listing = String::from_utf8_lossy(&output.stdout);
        Self::pick_encoding(&listing).ok_or(RecorderError::UnsupportedCapture)
    }

    /// Build the capture command line. Resolution and frame-rate hints are
    /// optional so a device that rejects them can be retried without.
    fn build_capture_args(
        session: &MediaSession,
        candidate: &EncodingCandidate,
        with_hints: bool,
    ) -> Vec<String> {
        let constraints = session.constraints();
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "v4l2".to_string(),
        ];

        if with_hints {
            args.extend([
                "-framerate".to_string(),
                constraints.ideal_frame_rate.to_string(),
                "-video_size".to_string(),
                format!("{}x{}", constraints.ideal_width, constraints.ideal_height),
            ]);
        }

        args.extend([
            "-i".to_string(),
            session.video_input().to_string(),
            "-f".to_string(),
            "alsa".to_string(),
            "-ar".to_string(),
            constraints.sample_rate.to_string(),
            "-i".to_string(),
            session.audio_input().to_string(),
        ]);

        if constraints.noise_suppression {
            args.extend(["-af".to_string(), "afftdn".to_string()]);
        }

        args.extend(["-c:v".to_string(), candidate.video_codec.to_string()]);
        args.extend(candidate.video_opts.iter().map(|s| s.to_string()));
        args.extend([
            "-c:a".to_string(),
            candidate.audio_codec.to_string(),
            "-f".to_string(),
            candidate.muxer.to_string(),
            "pipe:1".to_string(),
        ]);

        args
    }

    async fn spawn_capture(args: &[String]) -> Result<Child, RecorderError> {
        Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    RecorderError::StartFailed("ffmpeg is not installed".to_string())
                } else {
                    RecorderError::StartFailed(e.to_string())
                }
            })
    }

    /// Spawn the capture process, retrying once without resolution and
    /// frame-rate hints when the device rejects them immediately.
    async fn spawn_with_retry(
        session: &MediaSession,
        candidate: &EncodingCandidate,
    ) -> Result<Child, RecorderError> {
        let args = Self::build_capture_args(session, candidate, true);
        let mut child = Self::spawn_capture(&args).await?;

        sleep(TokioDuration::from_millis(200)).await;
        if Self::exited_early(&mut child) {
            let fallback = Self::build_capture_args(session, candidate, false);
            child = Self::spawn_capture(&fallback).await?;

            sleep(TokioDuration::from_millis(200)).await;
            if Self::exited_early(&mut child) {
                let detail = Self::read_stderr_tail(&mut child).await;
                return Err(RecorderError::StartFailed(detail));
            }
        }

        Ok(child)
    }

    fn exited_early(child: &mut Child) -> bool {
        matches!(child.try_wait(), Ok(Some(_)))
    }

    async fn read_stderr_tail(child: &mut Child) -> String {
        if let Some(mut stderr) = child.stderr.take() {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            let text = String::from_utf8_lossy(&buf);
            if let Some(line) = text.lines().last() {
                return line.to_string();
            }
        }
        "capture process exited immediately".to_string()
    }

    /// Ask FFmpeg to finalize the container and exit
    fn signal_stop(child_id: Option<u32>) {
        #[cfg(unix)]
        if let Some(id) = child_id {
            let _ = signal::kill(Pid::from_raw(id as i32), Signal::SIGINT);
        }
        #[cfg(not(unix))]
        let _ = child_id;
    }

    fn drain(pending: &StdMutex<Vec<u8>>) -> Vec<u8> {
        match pending.lock() {
            Ok(mut buf) => std::mem::take(&mut *buf),
            Err(_) => Vec::new(),
        }
    }

    /// Flush ticker. Missed ticks are skipped; replaying them would advance
    /// the elapsed counter faster than wall clock and auto-stop early.
    fn flush_interval() -> tokio::time::Interval {
        let mut ticker = interval(TokioDuration::from_millis(CHUNK_FLUSH_INTERVAL_MS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    /// Per-tick session update: append the flushed chunk and advance the
    /// elapsed counter. An accumulation past the size limit forces an
    /// auto-stop exactly like the duration ceiling.
    fn flush_tick(
        session: &mut RecordingSession,
        chunk: Vec<u8>,
    ) -> Result<TickOutcome, RecordingStateError> {
        session.append_chunk(chunk)?;
        let oversized = session.accumulated_bytes() > MAX_ARTIFACT_BYTES;
        match session.tick()? {
            _ if oversized => Ok(TickOutcome::CeilingReached),
            outcome => Ok(outcome),
        }
    }
}

impl Default for FfmpegVideoRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl VideoRecorder for FfmpegVideoRecorder {
    async fn start(
        &self,
        mut session: MediaSession,
        max_duration: Duration,
        on_tick: Option<TickCallback>,
    ) -> Result<(), RecorderError> {
        let mut active_guard = self.active.lock().await;
        if active_guard.is_some() {
            return Err(RecorderError::AlreadyRecording);
        }

        let candidate = Self::negotiate_encoding().await?;
        let mut child = Self::spawn_with_retry(&session, candidate).await?;

        let child_id = child.id();
        let stdout = child.stdout.take().ok_or_else(|| {
            RecorderError::StartFailed("capture process has no output stream".to_string())
        })?;
        // Keep stderr drained so a chatty process cannot block on the pipe
        if let Some(mut stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let _ = tokio::io::copy(&mut stderr, &mut tokio::io::sink()).await;
            });
        }
        session.attach_capture(child);

        let recording = Arc::new(StdMutex::new(Some(RecordingSession::begin(
            candidate.mime,
            max_duration,
        ))));
        let pending: Arc<StdMutex<Vec<u8>>> = Arc::new(StdMutex::new(Vec::new()));

        let reader_pending = Arc::clone(&pending);
        let reader = tokio::spawn(async move {
            let mut stdout = stdout;
            let mut buf = [0u8; 8192];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if let Ok(mut guard) = reader_pending.lock() {
                            guard.extend_from_slice(&buf[..n]);
                        }
                    }
                }
            }
        });

        let ticker_recording = Arc::clone(&recording);
        let ticker_pending = Arc::clone(&pending);
        let is_recording = Arc::clone(&self.is_recording);
        let elapsed_ms = Arc::clone(&self.elapsed_ms);
        let ticker = tokio::spawn(async move {
            let mut ticker = Self::flush_interval();
            ticker.tick().await; // first tick fires immediately

            loop {
                ticker.tick().await;

                let chunk = Self::drain(&ticker_pending);
                let outcome = {
                    let mut guard = match ticker_recording.lock() {
                        Ok(guard) => guard,
                        Err(_) => break,
                    };
                    let Some(session) = guard.as_mut() else { break };
                    match Self::flush_tick(session, chunk) {
                        Ok(outcome) => outcome,
                        Err(_) => break,
                    }
                };

                let elapsed = ticker_recording
                    .lock()
                    .ok()
                    .and_then(|g| g.as_ref().map(|s| s.elapsed_ms()))
                    .unwrap_or(0);
                elapsed_ms.store(elapsed, Ordering::SeqCst);
                if let Some(cb) = &on_tick {
                    cb(elapsed, max_duration.clamped_to_ceiling().as_millis());
                }

                if outcome == TickOutcome::CeilingReached {
                    // Auto-stop: finalize the container now; stop() collects
                    Self::signal_stop(child_id);
                    is_recording.store(false, Ordering::SeqCst);
                    break;
                }
            }
        });

        self.elapsed_ms.store(0, Ordering::SeqCst);
        self.is_recording.store(true, Ordering::SeqCst);
        *active_guard = Some(ActiveRecording {
            session,
            recording,
            pending,
            reader,
            ticker,
        });

        Ok(())
    }

    async fn stop(&self) -> Result<Option<VideoArtifact>, RecorderError> {
        let mut active_guard = self.active.lock().await;
        let Some(mut active) = active_guard.take() else {
            return Ok(None);
        };
        drop(active_guard);

        self.is_recording.store(false, Ordering::SeqCst);
        active.ticker.abort();

        if let Some(mut child) = active.session.take_capture() {
            Self::signal_stop(child.id());
            match timeout(TokioDuration::from_secs(5), child.wait()).await {
                Ok(_) => {}
                Err(_) => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                }
            }
        }

        // Reader finishes once the process closes its stdout
        let _ = active.reader.await;
        let trailing = Self::drain(&active.pending);

        let session = active
            .recording
            .lock()
            .ok()
            .and_then(|mut guard| guard.take())
            .ok_or_else(|| {
                RecorderError::RecordingFailed("recording session was lost".to_string())
            })?;

        let artifact = session
            .finish(trailing)
            .map_err(|e| RecorderError::RecordingFailed(e.to_string()))?;

        if artifact.size_bytes() == 0 {
            return Err(RecorderError::RecordingFailed(
                "capture produced no data".to_string(),
            ));
        }
        if !artifact.within_size_limit() {
            return Err(RecorderError::SizeExceeded {
                actual_bytes: artifact.size_bytes(),
            });
        }

        Ok(Some(artifact))
    }

    async fn cancel(&self) -> Result<(), RecorderError> {
        let mut active_guard = self.active.lock().await;
        if let Some(mut active) = active_guard.take() {
            self.is_recording.store(false, Ordering::SeqCst);
            active.ticker.abort();
            active.reader.abort();
            active.session.release();
        }
        self.elapsed_ms.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::CaptureConstraints;

    const ENCODER_LISTING_FULL: &str = "\
 Encoders:
 V..... libvpx               libvpx VP8 (codec vp8)
 V..... libx264              libx264 H.264 (codec h264)
 V..... libtheora            libtheora Theora (codec theora)
 A..... aac                  AAC (Advanced Audio Coding)
 A..... libopus              libopus Opus (codec opus)
 A..... libvorbis            libvorbis (codec vorbis)";

    #[test]
    fn negotiation_prefers_webm() {
        let picked = FfmpegVideoRecorder::pick_encoding(ENCODER_LISTING_FULL).unwrap();
        assert_eq!(picked.mime, VideoMimeType::Webm);
        assert_eq!(picked.video_codec, "libvpx");
        assert_eq!(picked.audio_codec, "libopus");
    }

    #[test]
    fn negotiation_falls_back_in_preference_order() {
        let no_vpx = "\
 V..... libx264              libx264 H.264 (codec h264)
 A..... aac                  AAC (Advanced Audio Coding)";
        let picked = FfmpegVideoRecorder::pick_encoding(no_vpx).unwrap();
        assert_eq!(picked.mime, VideoMimeType::Matroska);

        let only_theora = "\
 V..... libtheora            libtheora Theora (codec theora)
 A..... libvorbis            libvorbis (codec vorbis)";
        let picked = FfmpegVideoRecorder::pick_encoding(only_theora).unwrap();
        assert_eq!(picked.mime, VideoMimeType::Ogg);
    }

    #[test]
    fn negotiation_fails_without_any_full_pair() {
        // A video codec without its audio counterpart does not qualify
        let mismatched = "\
 V..... libvpx               libvpx VP8 (codec vp8)
 A..... aac                  AAC (Advanced Audio Coding)";
        assert!(FfmpegVideoRecorder::pick_encoding(mismatched).is_none());
    }

    #[test]
    fn capture_args_carry_constraint_hints() {
        let session = MediaSession::new("/dev/video0", "default", CaptureConstraints::default());
        let args =
            FfmpegVideoRecorder::build_capture_args(&session, &ENCODING_PREFERENCES[0], true);

        let joined = args.join(" ");
        assert!(joined.contains("-f v4l2"));
        assert!(joined.contains("-video_size 1280x720"));
        assert!(joined.contains("-framerate 30"));
        assert!(joined.contains("-i /dev/video0"));
        assert!(joined.contains("-f alsa"));
        assert!(joined.contains("-ar 44100"));
        assert!(joined.contains("-af afftdn"));
        assert!(joined.contains("-c:v libvpx"));
        assert!(joined.contains("-c:a libopus"));
        assert!(joined.ends_with("pipe:1"));
    }

    #[test]
    fn capture_args_without_hints_omit_resolution() {
        let session = MediaSession::new("/dev/video0", "default", CaptureConstraints::default());
        let args =
            FfmpegVideoRecorder::build_capture_args(&session, &ENCODING_PREFERENCES[0], false);

        let joined = args.join(" ");
        assert!(!joined.contains("-video_size"));
        assert!(!joined.contains("-framerate"));
        assert!(joined.contains("-i /dev/video0"));
    }

    #[test]
    fn oversized_accumulation_forces_auto_stop() {
        let mut session =
            RecordingSession::begin(VideoMimeType::Webm, Duration::recording_ceiling());
        let outcome =
            FfmpegVideoRecorder::flush_tick(&mut session, vec![0u8; MAX_ARTIFACT_BYTES + 1])
                .unwrap();
        assert_eq!(outcome, TickOutcome::CeilingReached);
    }

    #[test]
    fn accumulation_under_the_limit_continues() {
        let mut session =
            RecordingSession::begin(VideoMimeType::Webm, Duration::recording_ceiling());
        let outcome = FfmpegVideoRecorder::flush_tick(&mut session, vec![0u8; 1024]).unwrap();
        assert_eq!(outcome, TickOutcome::Continue);
    }

    #[tokio::test]
    async fn flush_ticker_skips_missed_ticks() {
        let ticker = FfmpegVideoRecorder::flush_interval();
        assert_eq!(ticker.missed_tick_behavior(), MissedTickBehavior::Skip);
        assert_eq!(
            ticker.period(),
            TokioDuration::from_millis(CHUNK_FLUSH_INTERVAL_MS)
        );
    }

    #[tokio::test]
    async fn stop_while_idle_is_noop() {
        let recorder = FfmpegVideoRecorder::new();
        assert!(recorder.stop().await.unwrap().is_none());
        assert!(!recorder.is_recording());
        assert_eq!(recorder.elapsed_ms(), 0);
    }

    #[tokio::test]
    async fn cancel_while_idle_is_noop() {
        let recorder = FfmpegVideoRecorder::new();
        recorder.cancel().await.unwrap();
        assert!(!recorder.is_recording());
    }
}
