//! Check a sequence for common capture defects.

use std::path::PathBuf;

use kinetrace_common::AppConfig;

use super::load_sequence;

pub fn run(input: PathBuf, config: &AppConfig) -> anyhow::Result<()> {
    println!("Validating sequence at: {}", input.display());

    let sequence = load_sequence(&input)?;
    let threshold = config.preprocessing.velocity_threshold;

    println!("  Name: {}", sequence.name());
    println!("  Poses: {}", sequence.len());
    println!("  Joints: {}", sequence.joint_count());
    println!("  Duration: {:.3}s", sequence.duration());

    let mut issues = Vec::new();

    if sequence.len() > 1 && !sequence.has_uniform_rate() {
        issues.push(
            "sampling rate is variable: resample before computing velocity or acceleration"
                .to_string(),
        );
    }

    for (label, fill) in sequence.fill_levels() {
        let positions = sequence.positions(&label)?;
        let zeros = positions.iter().filter(|p| p.is_origin()).count();
        if zeros > 0 {
            let at_edges = positions.first().is_some_and(|p| p.is_origin())
                || positions.last().is_some_and(|p| p.is_origin());
            issues.push(format!(
                "{label}: fill level {:.1}%, {zeros} pose(s) at the origin{}",
                fill * 100.0,
                if at_edges {
                    " (touching the sequence boundary)"
                } else {
                    ""
                }
            ));
        }

        if sequence.len() > 1 {
            let spikes = sequence
                .interval_velocities(&label)?
                .iter()
                .filter(|&&v| v >= threshold)
                .count();
            if spikes > 0 {
                issues.push(format!(
                    "{label}: {spikes} interval(s) at or above {threshold} units/s"
                ));
            }
        }
    }

    if issues.is_empty() {
        println!("\nSequence is clean.");
    } else {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        println!(
            "\n{} issue(s) found. Consider `kinetrace process` with --correct-zeros, \
             --jitter-threshold or --resample.",
            issues.len()
        );
    }

    Ok(())
}
