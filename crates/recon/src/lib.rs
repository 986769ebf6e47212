//! `pricesync-recon`: catalog reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns the updated catalog
//! and a change report. No CLI dependencies; file access is limited to the
//! CSV helpers in [`table`].

pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod report;
pub mod rules;
pub mod schema;
pub mod table;
pub mod value;

pub use config::SyncConfig;
pub use engine::{
    diff_snapshots, reconcile, reconcile_tables, run, validate_input, DiffOptions, DiffRecord,
    ReconOptions, SnapshotDiff, SyncInput,
};
pub use error::ReconError;
pub use index::DuplicatePolicy;
pub use model::{ChangeEntry, Record, ReconWarning, SyncResult};
pub use report::{ChangeReport, ChangeSummary};
pub use rules::{Eligibility, Predicate, UpdateRule, UpdateRuleSet};
pub use schema::{FieldKind, Schema};
pub use table::RawTable;
pub use value::FieldValue;
