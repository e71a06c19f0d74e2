//! Run the pre-processing pipeline on a sequence.
//!
//! Steps run in a fixed order: zeros, re-reference, trim, jitter, filter,
//! resample. Each step is enabled by its own flag.

use std::path::PathBuf;

use kinetrace_common::{parse_duration_secs, AppConfig, KinetraceError, TimeUnit};
use kinetrace_processing_core::{
    FilterParams, JitterParams, ResampleParams, SequenceProcessing, ZeroParams,
};
use kinetrace_sequence_model::{sequence_to_json, JitterWindow, Sequence};

use super::load_sequence;

/// Pipeline options collected from the command line.
pub struct Pipeline {
    pub name: Option<String>,
    pub correct_zeros: bool,
    pub re_reference: Option<String>,
    pub place_at_zero: bool,
    pub trim_start: Option<f64>,
    pub trim_end: Option<f64>,
    pub trim_audio: Option<(f64, f64)>,
    pub jitter_threshold: Option<f64>,
    pub jitter_window: Option<String>,
    pub jitter_method: Option<String>,
    pub filter_below: Option<f64>,
    pub filter_over: Option<f64>,
    pub resample: Option<f64>,
    pub resample_method: Option<String>,
    pub resample_window: Option<usize>,
}

pub fn run(
    input: PathBuf,
    output: PathBuf,
    pipeline: Pipeline,
    config: &AppConfig,
) -> anyhow::Result<()> {
    println!("Processing sequence at: {}", input.display());

    let mut sequence = load_sequence(&input)?;
    println!(
        "  Loaded {} poses, {} joints",
        sequence.len(),
        sequence.joint_count()
    );
    let defaults = &config.preprocessing;

    if pipeline.correct_zeros {
        let params = ZeroParams::from_defaults(defaults)
            .map_err(|e| anyhow::anyhow!("Invalid zero correction defaults: {e}"))?;
        sequence = step(sequence.correct_zeros(&params), "correct zeros")?;
        println!("  Corrected zeros ({})", params.method);
    }

    if let Some(label) = &pipeline.re_reference {
        sequence = if label.eq_ignore_ascii_case("auto") {
            step(sequence.re_reference_auto(pipeline.place_at_zero), "re-reference")?
        } else {
            step(sequence.re_reference(label, pipeline.place_at_zero), "re-reference")?
        };
        println!("  Re-referenced ({label})");
    }

    if let Some((delay, duration)) = pipeline.trim_audio {
        sequence = step(sequence.trim_to_audio(delay, duration), "trim to audio")?;
        println!("  Trimmed to audio ({delay}s + {duration}s)");
    } else if pipeline.trim_start.is_some() || pipeline.trim_end.is_some() {
        let start = pipeline.trim_start.unwrap_or(0.0);
        sequence = step(sequence.trim(start, pipeline.trim_end, true), "trim")?;
        println!("  Trimmed to {} poses", sequence.len());
    }

    if let Some(threshold) = pipeline.jitter_threshold {
        let mut params = JitterParams::from_defaults(defaults)
            .map_err(|e| anyhow::anyhow!("Invalid jitter defaults: {e}"))?;
        params.velocity_threshold = threshold;
        if let Some(window) = &pipeline.jitter_window {
            params.window = parse_jitter_window(window)?;
        }
        if let Some(method) = &pipeline.jitter_method {
            params.method = method
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid jitter method: {e}"))?;
        }
        let (corrected, report) = sequence
            .correct_jitter_with_report(&params)
            .map_err(|e| anyhow::anyhow!("Failed to correct jitter: {e}"))?;
        sequence = corrected;
        println!(
            "  Corrected jitter: {} twitch(es), {} jump(s), {} sample(s)",
            report.twitches, report.jumps, report.corrected_samples
        );
    }

    if pipeline.filter_below.is_some() || pipeline.filter_over.is_some() {
        let params = FilterParams {
            filter_below: pipeline.filter_below,
            filter_over: pipeline.filter_over,
        };
        sequence = step(sequence.filter_frequencies(&params), "filter frequencies")?;
        println!("  Filtered frequencies");
    }

    if let Some(frequency) = pipeline.resample {
        let mut params = ResampleParams::from_defaults(defaults)
            .map_err(|e| anyhow::anyhow!("Invalid resampling defaults: {e}"))?;
        params.frequency = frequency;
        if let Some(method) = &pipeline.resample_method {
            params.method = method
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid resampling method: {e}"))?;
        }
        if pipeline.resample_window.is_some() {
            params.window_size = pipeline.resample_window;
        }
        sequence = step(sequence.resample(&params), "resample")?;
        println!("  Resampled to {frequency} Hz ({} poses)", sequence.len());
    }

    if let Some(name) = pipeline.name {
        sequence.set_name(name);
    }

    let json = sequence_to_json(&sequence)
        .map_err(|e| anyhow::anyhow!("Failed to serialize sequence: {e}"))?;
    std::fs::write(&output, json)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", output.display()))?;

    println!("\nSaved '{}' to {}", sequence.name(), output.display());
    Ok(())
}

fn step(
    result: kinetrace_sequence_model::SequenceResult<Sequence>,
    operation: &str,
) -> anyhow::Result<Sequence> {
    result.map_err(|e| KinetraceError::processing(format!("Failed to {operation}: {e}")).into())
}

/// A bare integer is a pose count; anything else is a duration.
fn parse_jitter_window(input: &str) -> anyhow::Result<JitterWindow> {
    if let Ok(poses) = input.trim().parse::<usize>() {
        return Ok(JitterWindow::Poses(poses));
    }
    let seconds = parse_duration_secs(input, TimeUnit::Seconds)
        .map_err(|e| anyhow::anyhow!("Invalid jitter window {input:?}: {e}"))?;
    Ok(JitterWindow::Seconds(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jitter_window() {
        assert_eq!(parse_jitter_window("3").unwrap(), JitterWindow::Poses(3));
        match parse_jitter_window("100ms").unwrap() {
            JitterWindow::Seconds(s) => assert!((s - 0.1).abs() < 1e-12),
            other => panic!("expected a duration, got {other:?}"),
        }
        assert_eq!(
            parse_jitter_window("0.25s").unwrap(),
            JitterWindow::Seconds(0.25)
        );
        assert!(parse_jitter_window("soon").is_err());
    }
}
