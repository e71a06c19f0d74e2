//! Show sequence information.

use std::path::PathBuf;

use kinetrace_sequence_model::Measure;

use super::load_sequence;

pub fn run(input: PathBuf) -> anyhow::Result<()> {
    let sequence = load_sequence(&input)?;

    println!("Sequence: {}", sequence.name());
    if let Some(recorded_at) = sequence.recorded_at() {
        println!("  Recorded: {recorded_at}");
    }
    if let Some(audio) = sequence.audio_path() {
        println!("  Audio: {}", audio.display());
    }
    println!();

    println!("Timing:");
    println!("  Poses: {}", sequence.len());
    println!("  Duration: {:.3}s", sequence.duration());
    match sequence.sampling_rate() {
        Ok(rate) => println!("  Sampling rate: {rate:.3} Hz"),
        Err(_) => {
            let rates = sequence.sampling_rates();
            if rates.is_empty() {
                println!("  Sampling rate: undefined (single pose)");
            } else {
                let min = rates.iter().copied().fold(f64::INFINITY, f64::min);
                let max = rates.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                println!("  Sampling rate: variable ({min:.3} to {max:.3} Hz)");
            }
        }
    }
    println!();

    println!("Joints ({}):", sequence.joint_count());
    let uniform = sequence.has_uniform_rate();
    for (label, fill) in sequence.fill_levels() {
        let mut line = format!("  {label:<16} fill {:>5.1}%", fill * 100.0);
        if sequence.len() > 1 {
            let path = sequence.measure_sum(&label, Measure::Distance)?;
            line.push_str(&format!("  path {path:.3}"));
            if uniform {
                let velocity = sequence.measure_range(&label, Measure::Velocity)?;
                line.push_str(&format!("  peak velocity {:.3}/s", velocity.max));
            }
        }
        println!("{line}");
    }
    if sequence.len() > 1 {
        println!(
            "  Total path: {:.3}",
            sequence.overall_measure_sum(Measure::Distance)?
        );
    }

    if !sequence.processing_steps().is_empty() {
        println!();
        println!("Processing steps:");
        for (i, step) in sequence.processing_steps().iter().enumerate() {
            let details = serde_json::to_string(step)?;
            println!("  {}. {} {details}", i + 1, step.operation());
        }
    }

    Ok(())
}
