//! Print a per-joint measure.

use std::path::PathBuf;

use kinetrace_sequence_model::Measure;
use serde::Serialize;

use super::load_sequence;

#[derive(Serialize)]
struct MeasureOutput<'a> {
    joint: &'a str,
    measure: Measure,
    values: Vec<f64>,
}

pub fn run(input: PathBuf, joint: String, measure: String, json: bool) -> anyhow::Result<()> {
    let sequence = load_sequence(&input)?;
    let measure: Measure = measure
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid measure: {e}"))?;

    let values = sequence
        .measure(&joint, measure)
        .map_err(|e| anyhow::anyhow!("Failed to compute {measure} of {joint}: {e}"))?;

    if json {
        let output = MeasureOutput {
            joint: &joint,
            measure,
            values,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for value in values {
            println!("{value}");
        }
    }

    Ok(())
}
