use crate::cli::GenerateArgs;
use anyhow::{bail, Context, Result};
use sleepwave_simulation::{ChannelSpec, RecordingGenerator, RecordingSpec, SignalPattern};

pub fn execute(args: GenerateArgs) -> Result<()> {
    let pattern = match args.pattern.to_ascii_lowercase().as_str() {
        "night" => SignalPattern::sleep_cycle(args.epoch_seconds),
        name => match SignalPattern::preset(name) {
            Some(pattern) => pattern,
            None => bail!(
                "Unknown pattern '{}'. Available: {}",
                args.pattern,
                SignalPattern::presets()
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        },
    };

    let kind = pattern.description();
    let spec = RecordingSpec {
        channels: vec![ChannelSpec::new(args.label, args.rate, pattern)],
        records: args.records,
        unbounded: args.unbounded,
        truncated_tail_bytes: args.truncated_tail,
        noise_std: args.noise,
        seed: args.seed,
        ..Default::default()
    };

    let mut generator = RecordingGenerator::new(spec).context("Invalid recording parameters")?;
    let bytes = generator
        .write_file(&args.output)
        .with_context(|| format!("Failed to write '{}'", args.output.display()))?;

    tracing::info!(
        path = %args.output.display(),
        pattern = kind,
        records = args.records,
        bytes,
        "recording generated"
    );
    Ok(())
}
