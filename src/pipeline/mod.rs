//! Change detection and the poll loop.
//!
//! - `diff`: classify a snapshot against the state store
//! - `monitor`: fetch → detect → notify → persist, on an interval

pub mod diff;
pub mod monitor;

pub use diff::{Change, ChangeDetector, ChangeKind};
pub use monitor::{CyclePhase, CycleReport, Monitor};
