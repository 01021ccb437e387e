use super::commands::{RunArgs, ServeArgs};
use super::output::OutputFormatter;
use crate::config::RepofuseConfig;
use crate::pipeline::{PipelineOptions, ProgressEvent, ProgressHandler};
use crate::server::{self, AppState};
use anyhow::{Context, Result};
use tracing::{error, info};

/// Prints progress lines to stderr
struct StderrProgress {
    quiet: bool,
}

impl ProgressHandler for StderrProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        if !self.quiet {
            eprintln!("[{}] {}", event.kind().as_str(), event.message());
        }
    }
}

fn load_config() -> Result<RepofuseConfig> {
    let config = RepofuseConfig::default();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn serve(args: &ServeArgs) -> Result<()> {
    let mut config = load_config()?;
    if let Some(bind) = &args.bind {
        config.bind_addr = bind.clone();
    }
    info!("{}", config);
    let state = AppState::from_config(&config).context("Failed to initialize server state")?;
    server::serve(state, &config.bind_addr).await
}

async fn run(args: &RunArgs, quiet: bool) -> Result<()> {
    let config = load_config()?;
    let driver = config.build_driver().context("Failed to initialize pipeline")?;
    let options = PipelineOptions {
        publish: args.publish,
    };

    let result = driver
        .run(&args.urls, options, &StderrProgress { quiet })
        .await
        .map_err(|failure| failure.error)
        .context("Pipeline failed")?;

    let output = OutputFormatter::new(args.format.into()).format(&result)?;
    println!("{}", output);
    Ok(())
}

pub async fn handle_serve(args: &ServeArgs) -> i32 {
    match serve(args).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Server error: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

pub async fn handle_run(args: &RunArgs, quiet: bool) -> i32 {
    match run(args, quiet).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}
