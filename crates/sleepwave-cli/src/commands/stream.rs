use crate::cli::StreamArgs;
use crate::output::{self, HypnogramReport};
use anyhow::{bail, Context, Result};
use sleepwave_processing::Hypnogram;
use sleepwave_stream::{
    spawn_stream, StreamCommand, StreamConfig, StreamEvent, StreamOutcome, StreamSession,
    Verbosity,
};
use std::path::Path;

/// Config file (if any) with command-line overrides applied
fn resolve_config(args: &StreamArgs, verbosity: Verbosity) -> Result<StreamConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => StreamConfig::default(),
    };

    if let Some(channel) = &args.channel {
        config.channel = channel.clone();
    }
    if let Some(interval_ms) = args.interval_ms {
        config.tick_interval_ms = interval_ms;
    }
    if let Some(preset) = args.window_preset {
        config.window = preset.config();
    }
    if let Some(seconds) = args.display_seconds {
        config.window.display_seconds = seconds;
    }
    if let Some(seconds) = args.analysis_seconds {
        config.window.analysis_seconds = seconds;
    }
    if let Some(seconds) = args.step_seconds {
        config.window.step_seconds = seconds;
    }
    if args.max_ticks.is_some() {
        config.max_ticks = args.max_ticks;
    }
    if args.max_duration_ms.is_some() {
        config.max_duration_ms = args.max_duration_ms;
    }
    if args.spectrum {
        config.include_spectrum = true;
    }
    config.verbosity = verbosity;

    config.validate().context("Invalid stream configuration")?;
    Ok(config)
}

fn load_config(path: &Path) -> Result<StreamConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config '{}'", path.display()))
}

pub async fn execute(args: StreamArgs, verbosity: Verbosity) -> Result<()> {
    if args.smoothing % 2 == 0 {
        bail!("--smoothing must be odd, got {}", args.smoothing);
    }
    let config = resolve_config(&args, verbosity)?;
    let session = StreamSession::open(&args.file, config)
        .with_context(|| format!("Failed to open stream on '{}'", args.file.display()))?;
    // epochs span whole samples, so take the length the session settled on
    let mut hypnogram = Hypnogram::new(session.hypnogram().epoch_seconds())?;
    let mut handle = spawn_stream(session);
    let stdout = std::io::stdout();

    loop {
        tokio::select! {
            event = handle.events.recv() => {
                let Some(event) = event else { break };
                if let StreamEvent::Data(snapshot) = &event {
                    if let Some(stage) = snapshot.stage {
                        hypnogram.push(stage);
                    }
                }
                let line = event.to_json().context("Failed to serialize event")?;
                if let Err(e) = output::write_line(&mut stdout.lock(), &line) {
                    // consumer went away; dropping the receiver cancels the stream
                    tracing::warn!("stdout closed: {}", e);
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                let _ = handle.control.send(StreamCommand::Stop).await;
                break;
            }
        }
    }

    drop(handle.events);
    let outcome = handle.task.await.context("Stream task panicked")?;

    if let Some(path) = &args.hypnogram {
        HypnogramReport::new(&hypnogram, args.smoothing)?.save(path)?;
    }

    match outcome {
        StreamOutcome::Completed(reason) => {
            tracing::debug!(?reason, "stream completed");
            Ok(())
        }
        StreamOutcome::Cancelled => Ok(()),
        StreamOutcome::Failed(kind) => bail!("Stream ended with {} error", kind),
    }
}
