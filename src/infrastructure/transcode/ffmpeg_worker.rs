//! FFmpeg-based transcode worker channel adapter

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::application::ports::{
    ConvertRequest, TranscodeWorker, WorkerChannelError, WorkerEvent,
};

/// Event buffer per job; the worker emits at most a few events per second
const EVENT_BUFFER: usize = 64;

/// Temp file for a conversion input or output
struct TempMediaFile {
    path: PathBuf,
}

impl TempMediaFile {
    fn new(suffix: &str) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let path = std::env::temp_dir().join(format!("mindmirror-{}{}", timestamp, suffix));
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempMediaFile {
    fn drop(&mut self) {
        // Best-effort cleanup
        let _ = std::fs::remove_file(&self.path);
    }
}

/// One queued conversion job
struct Job {
    request: ConvertRequest,
    events: mpsc::Sender<WorkerEvent>,
}

/// Dedicated conversion worker fed over a job queue.
///
/// `open` probes the conversion tooling and spawns a long-lived worker task;
/// jobs run strictly one at a time in submission order. Every accepted job
/// receives `Ready` followed by progress events, and its stream is closed
/// right after the single terminal event, so a listener can never observe a
/// second outcome for the same job.
pub struct FfmpegTranscodeChannel {
    jobs: mpsc::Sender<Job>,
}

impl FfmpegTranscodeChannel {
    /// Open the channel. Fails with `InitFailed` when the conversion
    /// tooling is unavailable, letting the caller degrade to a
    /// conversion-disabled flow.
    pub async fn open() -> Result<Self, WorkerChannelError> {
        Self::probe_tooling().await?;

        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(worker_loop(rx));

        Ok(Self { jobs: tx })
    }

    async fn probe_tooling() -> Result<(), WorkerChannelError> {
        let result = Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match result {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(WorkerChannelError::InitFailed(format!(
                "ffmpeg -version exited with {}",
                status
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(WorkerChannelError::InitFailed(
                "ffmpeg is not installed".to_string(),
            )),
            Err(e) => Err(WorkerChannelError::InitFailed(e.to_string())),
        }
    }
}

#[async_trait]
impl TranscodeWorker for FfmpegTranscodeChannel {
    async fn submit(
        &self,
        request: ConvertRequest,
    ) -> Result<mpsc::Receiver<WorkerEvent>, WorkerChannelError> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.jobs
            .send(Job {
                request,
                events: tx,
            })
            .await
            .map_err(|_| WorkerChannelError::Closed)?;
        Ok(rx)
    }
}

/// Serial job loop. The engine (encoder availability) is verified once,
/// on the first job, mirroring a lazily loaded conversion engine.
async fn worker_loop(mut jobs: mpsc::Receiver<Job>) {
    let mut engine_ready = false;

    while let Some(job) = jobs.recv().await {
        let _ = job.events.send(WorkerEvent::Ready).await;

        if !engine_ready {
            let _ = job
                .events
                .send(WorkerEvent::Progress {
                    fraction: 0.0,
                    note: Some("loading conversion engine".to_string()),
                })
                .await;
            if let Err(note) = verify_engine().await {
                let _ = job.events.send(WorkerEvent::Error { note }).await;
                continue;
            }
            engine_ready = true;
        }

        let terminal = match run_conversion(&job.request, &job.events).await {
            Ok(bytes) => WorkerEvent::Complete { bytes },
            Err(note) => WorkerEvent::Error { note },
        };
        let _ = job.events.send(terminal).await;
        // job.events drops here, closing the stream after the terminal event
    }
}

/// Confirm the target encoders exist before the first real job
async fn verify_engine() -> Result<(), String> {
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stderr(Stdio::null())
        .output()
        .await
        .map_err(|e| format!("conversion engine unavailable: {}", e))?;

    let listing = String::from_utf8_lossy(&output.stdout);
    let has = |codec: &str| {
        listing
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .any(|name| name == codec)
    };
    if has("libx264") && has("aac") {
        Ok(())
    } else {
        Err("conversion engine lacks the required encoders".to_string())
    }
}

async fn run_conversion(
    request: &ConvertRequest,
    events: &mpsc::Sender<WorkerEvent>,
) -> Result<Vec<u8>, String> {
    let suffix = Path::new(&request.suggested_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_else(|| ".bin".to_string());

    let input = TempMediaFile::new(&suffix);
    let output = TempMediaFile::new(".mp4");

    fs::write(input.path(), &request.bytes)
        .await
        .map_err(|e| format!("failed to stage input: {}", e))?;

    let mut child = Command::new("ffmpeg")
        .args([
            "-hide_banner",
            "-y",
            "-i",
        ])
        .arg(input.path())
        .args([
            "-c:v",
            "libx264",
            "-preset",
            "veryfast",
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            "aac",
            "-movflags",
            "+faststart",
        ])
        .arg(output.path())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("failed to start conversion: {}", e))?;

    let mut last_line = String::new();
    if let Some(stderr) = child.stderr.take() {
        let mut lines = BufReader::new(stderr).lines();
        let mut total_ms: Option<u64> = None;

        while let Ok(Some(line)) = lines.next_line().await {
            if total_ms.is_none() {
                total_ms = parse_duration_ms(&line);
            }
            if let Some(fraction) = parse_progress(&line, total_ms) {
                let _ = events
                    .send(WorkerEvent::Progress {
                        fraction,
                        note: None,
                    })
                    .await;
            }
            if !line.trim().is_empty() {
                last_line = line;
            }
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| format!("conversion process failed: {}", e))?;

    if !status.success() {
        let detail = if last_line.is_empty() {
            format!("conversion exited with {}", status)
        } else {
            last_line
        };
        return Err(detail);
    }

    fs::read(output.path())
        .await
        .map_err(|e| format!("failed to read converted file: {}", e))
}

/// Extract the source duration from an FFmpeg banner line
/// like `  Duration: 00:00:12.34, start: ...`
fn parse_duration_ms(line: &str) -> Option<u64> {
    let rest = line.trim_start().strip_prefix("Duration: ")?;
    let stamp = rest.split([',', ' ']).next()?;
    parse_timestamp_ms(stamp)
}

/// Extract a progress fraction from an FFmpeg status line
/// like `frame= 120 fps= 30 ... time=00:00:04.00 bitrate=...`
fn parse_progress(line: &str, total_ms: Option<u64>) -> Option<f32> {
    let total = total_ms.filter(|t| *t > 0)?;
    let idx = line.find("time=")?;
    let stamp = line[idx + 5..].split_whitespace().next()?;
    let elapsed = parse_timestamp_ms(stamp)?;
    // Hold 1.0 back for the terminal event
    Some((elapsed as f32 / total as f32).clamp(0.0, 0.99))
}

/// Parse `HH:MM:SS.cc` into milliseconds
fn parse_timestamp_ms(stamp: &str) -> Option<u64> {
    let mut parts = stamp.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let ms = (hours * 3600 + minutes * 60) as f64 * 1000.0 + seconds * 1000.0;
    Some(ms as u64)
}
