//! Durable duplicate-suppression state.
//!
//! The state file is a single JSON object keyed by listing id:
//!
//! ```text
//! {
//!   "106123": { "company_name": "...", "status": "A", "documents": [...], ... },
//!   "106124": { ... }
//! }
//! ```
//!
//! Records are only ever added or overwritten by polling. Removal is an
//! explicit operation ([`StateStore::forget`]).

pub mod state;

// Re-export for convenience
pub use state::{FieldChanges, SeenRecord, StateStore};
