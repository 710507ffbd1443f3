//! Main app runner for the check-in flow

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, Duration as TokioDuration};

use crate::application::ports::{ConfigStore, TickCallback};
use crate::application::{CaptureFlowConfig, CaptureFlowUseCase, ConvertProgress};
use crate::domain::config::AppConfig;
use crate::domain::recording::Duration;
use crate::domain::video::{VideoArtifact, VideoMimeType};
use crate::infrastructure::{
    FfmpegCamera, FfmpegTranscodeChannel, FfmpegVideoRecorder, HttpReportSubmitter,
    XdgConfigStore,
};

use super::presenter::{format_conversion_progress, format_recording_progress, Presenter};

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

type AppFlow =
    CaptureFlowUseCase<FfmpegCamera, FfmpegVideoRecorder, FfmpegTranscodeChannel, HttpReportSubmitter>;

/// Parsed check-in options
#[derive(Debug, Clone)]
pub struct CheckinOptions {
    pub duration: Duration,
    pub upload: Option<PathBuf>,
    pub reflection: Option<String>,
    pub skip_convert: bool,
    pub assume_consent: bool,
    pub api_url: String,
    pub video_device: String,
    pub audio_device: String,
}

/// Run one check-in end to end
pub async fn run_checkin(options: CheckinOptions) -> ExitCode {
    let mut presenter = Presenter::new();

    if !options.assume_consent && !ask_consent(&presenter).await {
        presenter.info("Check-in cancelled; no devices were accessed.");
        return ExitCode::from(EXIT_ERROR);
    }

    let worker = if options.skip_convert {
        presenter.info("Conversion disabled; submitting the native recording format.");
        None
    } else {
        match FfmpegTranscodeChannel::open().await {
            Ok(channel) => Some(channel),
            Err(e) => {
                presenter.warn(&format!(
                    "Conversion unavailable ({}); continuing without conversion.",
                    e
                ));
                None
            }
        }
    };

    let flow = CaptureFlowUseCase::new(
        FfmpegCamera::new(options.video_device.clone(), options.audio_device.clone()),
        FfmpegVideoRecorder::new(),
        worker,
        HttpReportSubmitter::new(options.api_url.clone()),
        CaptureFlowConfig {
            max_duration: options.duration,
            ..Default::default()
        },
    );

    if let Err(e) = flow.give_consent().await {
        presenter.error(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }

    loop {
        // Capture stage: record from the devices or validate a selected file
        let reviewed = match &options.upload {
            Some(path) => upload_file(&flow, path, &mut presenter).await,
            None => record_clip(&flow, &mut presenter).await,
        };
        let artifact = match reviewed {
            Ok(artifact) => artifact,
            Err(code) => {
                flow.teardown().await;
                return ExitCode::from(code);
            }
        };

        if let Some(warning) = flow.conversion_warning().await {
            presenter.warn(&warning);
        }
        presenter.info(&format!(
            "Ready to submit: {} ({})",
            artifact.suggested_name(),
            artifact.human_readable_size()
        ));

        // Review stage: confirm, retake, or discard
        match review_loop(&flow, &options, &mut presenter).await {
            ReviewOutcome::Done(code) => return ExitCode::from(code),
            ReviewOutcome::Retake => continue,
        }
    }
}

enum ReviewOutcome {
    Done(u8),
    Retake,
}

async fn review_loop(
    flow: &AppFlow,
    options: &CheckinOptions,
    presenter: &mut Presenter,
) -> ReviewOutcome {
    let can_retake = options.upload.is_none();
    let prompt_text = if can_retake {
        "Submit this check-in? [Y/n/r to retake] "
    } else {
        "Submit this check-in? [Y/n] "
    };

    loop {
        let answer = prompt(presenter, prompt_text).await;
        match answer.as_str() {
            "" | "y" | "yes" => {
                presenter.start_spinner("Submitting check-in...");
                match flow.confirm(options.reflection.as_deref()).await {
                    Ok(receipt) => {
                        presenter.spinner_success(&format!("Report #{} created", receipt.report_id));
                        let rendered = serde_json::to_string_pretty(&receipt.report)
                            .unwrap_or_else(|_| receipt.report.to_string());
                        presenter.output(&rendered);
                        return ReviewOutcome::Done(EXIT_SUCCESS);
                    }
                    Err(e) => {
                        // Flow is back at review; the user may retry or discard
                        presenter.stop_spinner();
                        presenter.error(&e.to_string());
                    }
                }
            }
            "r" | "retake" if can_retake => {
                if let Err(e) = flow.retake().await {
                    presenter.error(&e.to_string());
                    return ReviewOutcome::Done(EXIT_ERROR);
                }
                return ReviewOutcome::Retake;
            }
            "n" | "no" => {
                flow.teardown().await;
                presenter.info("Check-in discarded.");
                return ReviewOutcome::Done(EXIT_ERROR);
            }
            _ => {
                if can_retake {
                    presenter.warn("Please answer y, n, or r.");
                } else {
                    presenter.warn("Please answer y or n.");
                }
            }
        }
    }
}

/// Record one bounded clip: start, wait for Enter or the ceiling, stop
async fn record_clip(flow: &AppFlow, presenter: &mut Presenter) -> Result<VideoArtifact, u8> {
    presenter.start_spinner("Recording... (press Enter to stop)");

    let handle = presenter.spinner_handle();
    let on_tick: TickCallback = Arc::new(move |elapsed, total| {
        if let Some(bar) = &handle {
            bar.set_message(format!(
                "Recording... {} (press Enter to stop)",
                format_recording_progress(elapsed, total)
            ));
        }
    });

    if let Err(e) = flow.start_recording(Some(on_tick)).await {
        presenter.stop_spinner();
        presenter.error(&e.to_string());
        return Err(EXIT_ERROR);
    }

    wait_for_stop(flow).await;
    presenter.update_spinner("Processing recording...");

    let convert_handle = presenter.spinner_handle();
    let on_progress: ConvertProgress = Arc::new(move |fraction, note| {
        if let Some(bar) = &convert_handle {
            bar.set_message(format_conversion_progress(fraction, note));
        }
    });

    match flow.stop_recording(Some(on_progress)).await {
        Ok(artifact) => {
            presenter.spinner_success(&format!(
                "Captured {} ({})",
                artifact.mime_type(),
                artifact.human_readable_size()
            ));
            Ok(artifact)
        }
        Err(e) => {
            presenter.stop_spinner();
            presenter.error(&e.to_string());
            Err(EXIT_ERROR)
        }
    }
}

/// Block until the user presses Enter or the recorder auto-stops
async fn wait_for_stop(flow: &AppFlow) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut poll = interval(TokioDuration::from_millis(200));

    loop {
        tokio::select! {
            _ = lines.next_line() => break,
            _ = poll.tick() => {
                if !flow.is_recording() {
                    break;
                }
            }
        }
    }
}

/// Validate and stage a directly selected file
async fn upload_file(
    flow: &AppFlow,
    path: &Path,
    presenter: &mut Presenter,
) -> Result<VideoArtifact, u8> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            presenter.error(&format!("Cannot read {}: {}", path.display(), e));
            return Err(EXIT_USAGE_ERROR);
        }
    };

    let declared = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(VideoMimeType::from_extension)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    presenter.start_spinner("Validating file...");

    let convert_handle = presenter.spinner_handle();
    let on_progress: ConvertProgress = Arc::new(move |fraction, note| {
        if let Some(bar) = &convert_handle {
            bar.set_message(format_conversion_progress(fraction, note));
        }
    });

    match flow.upload(bytes, &declared, Some(on_progress)).await {
        Ok(artifact) => {
            presenter.spinner_success(&format!(
                "File accepted ({})",
                artifact.human_readable_size()
            ));
            Ok(artifact)
        }
        Err(e) => {
            presenter.stop_spinner();
            presenter.error(&e.to_string());
            Err(EXIT_USAGE_ERROR)
        }
    }
}

/// Ask for camera and microphone consent. Anything but an explicit
/// yes (including closed stdin) counts as declined.
async fn ask_consent(presenter: &Presenter) -> bool {
    presenter.info("This check-in records a short video using your camera and microphone.");
    presenter.info("Nothing is captured until you agree.");
    let answer = prompt(presenter, "Allow camera and microphone access? [y/N] ").await;
    matches!(answer.as_str(), "y" | "yes")
}

/// Print a prompt and read one trimmed lowercase line.
/// Closed stdin reads as "n" so a non-interactive run cannot spin forever.
async fn prompt(presenter: &Presenter, text: &str) -> String {
    presenter.output_inline(text);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    match lines.next_line().await {
        Ok(Some(line)) => line.trim().to_lowercase(),
        _ => "n".to_string(),
    }
}

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load().await.unwrap_or_else(|_| AppConfig::empty());

    let env_config = AppConfig {
        api_url: std::env::var("MINDMIRROR_API_URL")
            .ok()
            .filter(|s| !s.is_empty()),
        ..Default::default()
    };

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config)
        .merge(cli_config)
}
