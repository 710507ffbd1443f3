//! MindMirror CLI entry point

use std::process::ExitCode;

use clap::Parser;

use mindmirror::cli::{
    app::{load_merged_config, run_checkin, CheckinOptions, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    presenter::Presenter,
};
use mindmirror::domain::config::AppConfig;
use mindmirror::domain::recording::Duration;
use mindmirror::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let presenter = Presenter::new();

    // Handle subcommands
    if let Some(Commands::Config { action }) = cli.command {
        let store = XdgConfigStore::new();
        if let Err(e) = handle_config_command(action, &store, &presenter).await {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
        return ExitCode::SUCCESS;
    }

    // Build CLI config from args
    let cli_config = AppConfig {
        api_url: cli.api_url.clone(),
        duration: cli.duration.clone(),
        video_device: cli.video_device.clone(),
        audio_device: cli.audio_device.clone(),
        skip_convert: if cli.skip_convert { Some(true) } else { None },
    };

    // Merge config
    let config = load_merged_config(cli_config).await;

    // Parse duration; values above the ceiling are clamped, not rejected
    let duration = match config.duration.as_ref() {
        Some(s) => match s.parse::<Duration>() {
            Ok(d) => d.clamped_to_ceiling(),
            Err(e) => {
                presenter.error(&format!("Invalid duration: {}", e));
                return ExitCode::from(EXIT_USAGE_ERROR);
            }
        },
        None => Duration::recording_ceiling(),
    };

    let options = CheckinOptions {
        duration,
        upload: cli.upload.clone(),
        reflection: cli.reflection.clone(),
        skip_convert: config.skip_convert_or_default(),
        assume_consent: cli.yes,
        api_url: config.api_url_or_default().to_string(),
        video_device: config.video_device_or_default().to_string(),
        audio_device: config.audio_device_or_default().to_string(),
    };

    run_checkin(options).await
}
