//! Print the header of a recording and the first second of one channel
//!
//! ```text
//! cargo run -p sleepwave-core --example read_header -- night.edf 0
//! ```

use sleepwave_core::{open_channel, SampleWindow, WaveResult};

fn main() -> WaveResult<()> {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: read_header <recording.edf> [channel]");
        std::process::exit(2);
    };
    let channel: usize = args.next().and_then(|c| c.parse().ok()).unwrap_or(0);

    let (header, samples) = open_channel(&path, channel)?;

    println!("=== {} ===", path);
    println!("Patient:   {}", header.patient_id);
    println!("Recording: {}", header.recording_id);
    println!("Start:     {} {}", header.start_date, header.start_time);
    match header.record_limit() {
        Some(records) => println!(
            "Records:   {} x {} s",
            records, header.record_duration_seconds
        ),
        None => println!("Records:   unbounded x {} s", header.record_duration_seconds),
    }

    println!("\nChannels:");
    for (i, signal) in header.signals.iter().enumerate() {
        println!(
            "  [{}] {:<16} {:>7.1} Hz  [{}, {}]",
            i,
            signal.label,
            signal.sample_rate_hz(header.record_duration_seconds),
            signal.physical_min,
            signal.physical_max
        );
    }

    let rate = header.sample_rate_hz(channel)?;
    let first_second: Vec<f64> = samples
        .take(rate.round() as usize)
        .collect::<WaveResult<_>>()?;
    let window = SampleWindow::new(first_second, rate, 0.0);
    let stats = window.stats();

    println!(
        "\nFirst second of channel {}: {} samples, mean {:.3}, rms {:.3}, peak-to-peak {:.3}",
        channel,
        window.len(),
        stats.mean,
        stats.rms,
        stats.peak_to_peak
    );
    Ok(())
}
