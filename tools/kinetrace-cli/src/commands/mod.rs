pub mod info;
pub mod measure;
pub mod process;
pub mod validate;

use std::path::Path;

use kinetrace_common::KinetraceError;
use kinetrace_sequence_model::{sequence_from_json, Sequence};

/// Read and parse a sequence file.
pub fn load_sequence(path: &Path) -> anyhow::Result<Sequence> {
    if !path.exists() {
        return Err(KinetraceError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    let sequence = sequence_from_json(&content)
        .map_err(|e| anyhow::anyhow!("Failed to load sequence: {e}"))?;
    tracing::debug!(
        path = %path.display(),
        poses = sequence.len(),
        joints = sequence.joint_count(),
        "Loaded sequence"
    );
    Ok(sequence)
}
