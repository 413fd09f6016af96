use crate::cli::InfoArgs;
use crate::output::{self, RecordingInfo};
use anyhow::{Context, Result};
use sleepwave_core::RecordingHeader;
use std::fs::File;
use std::io::BufReader;

pub fn execute(args: InfoArgs) -> Result<()> {
    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open '{}'", args.file.display()))?;
    let header = RecordingHeader::read_from(&mut BufReader::new(file))
        .with_context(|| format!("Failed to decode header of '{}'", args.file.display()))?;

    tracing::debug!(channels = header.channel_count(), "header decoded");

    let json = output::to_json(&RecordingInfo::new(&header), args.compact)?;
    output::write_line(&mut std::io::stdout().lock(), &json)?;
    Ok(())
}
