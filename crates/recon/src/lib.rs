//! `tally-recon`: validation status reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded datasets, returns per-entity
//! verdicts and report tables. No filesystem or network access.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod identifier;
pub mod matcher;
pub mod model;
pub mod policy;
pub mod report;
pub mod scorer;
pub mod token;

pub use config::{ReconConfig, ReportFormat};
pub use engine::{coverage, run};
pub use error::ReconError;
pub use model::{Cell, Coverage, Dataset, ReconInput, ReconResult, SourceData, Verdict};
pub use policy::{PolicyVersion, ScoringPolicy};
pub use report::{Layout, ReportFile, ReportTable};
