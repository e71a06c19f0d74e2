//! Kinetrace Sequence Model
//!
//! Defines the core data contracts for motion-capture recordings:
//! - **Joint:** one tracked 3D point plus its per-sample status flags
//! - **Pose:** every joint of the skeleton at one timestamp
//! - **Sequence:** chronologically ordered poses with provenance
//! - **Record:** the interchange shape exchanged with loaders and savers
//!
//! Sequences are values. Every transform returns a new `Sequence` and
//! leaves its input untouched, so a recording can always be compared with
//! its processed versions.

pub mod combine;
pub mod error;
pub mod joint;
pub mod pose;
pub mod record;
pub mod sequence;
pub mod stats;
pub mod step;
pub mod transform;

pub use error::*;
pub use joint::*;
pub use pose::*;
pub use record::*;
pub use sequence::*;
pub use stats::*;
pub use step::*;
