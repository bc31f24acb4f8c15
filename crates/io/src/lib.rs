//! `tally-io`: everything that touches bytes for tally.
//!
//! Locator templating, local and Cloud Storage transport, dataset loaders
//! (CSV/TSV, workbooks, JSON records) and report writers.

pub mod csv;
pub mod error;
pub mod json;
pub mod loader;
pub mod storage;
pub mod template;
pub mod writer;
pub mod xlsx;

pub use error::{IoError, LoadError};
pub use loader::{load_dataset, load_sources, LoadOptions};
pub use template::{expand_config, Expander};
pub use writer::{write_report, write_reports};
