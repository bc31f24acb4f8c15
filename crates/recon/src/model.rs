use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::policy::ScoringPolicy;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One cell value as delivered by a loader.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Text form used for identifier matching and token normalization.
    /// Integral numbers render without a fractional part.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Cow::Owned(format!("{}", *n as i64))
                } else {
                    Cow::Owned(n.to_string())
                }
            }
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_text().trim().is_empty()
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

/// Ordered rows keyed by ordered column names.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    /// Column names are trimmed; cells are padded or cut to the column count.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            columns: columns.into_iter().map(|c| c.as_ref().trim().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Convenience constructor for string-only data.
    pub fn from_rows(columns: &[&str], rows: &[&[&str]]) -> Self {
        let mut ds = Self::new(columns.iter().copied());
        for row in rows {
            ds.push_row(row.iter().map(|v| Cell::from(*v)).collect());
        }
        ds
    }

    /// Parse delimited text with a header row.
    pub fn from_csv(source: &str, data: &str, delimiter: u8) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ReconError::Parse {
                source: source.into(),
                message: e.to_string(),
            })?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut ds = Self::new(headers);
        for record in reader.records() {
            let record = record.map_err(|e| ReconError::Parse {
                source: source.into(),
                message: e.to_string(),
            })?;
            ds.push_row(record.iter().map(Cell::from).collect());
        }
        Ok(ds)
    }

    pub fn push_row(&mut self, mut cells: Vec<Cell>) {
        cells.resize(self.columns.len(), Cell::Empty);
        self.rows.push(cells);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        self.rows.get(index).map(|cells| RowRef {
            columns: &self.columns,
            cells,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(move |cells| RowRef {
            columns: &self.columns,
            cells,
        })
    }
}

/// Borrowed view of one dataset row.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    columns: &'a [String],
    cells: &'a [Cell],
}

impl<'a> RowRef<'a> {
    pub fn columns(&self) -> &'a [String] {
        self.columns
    }

    pub fn get(&self, column: &str) -> Option<&'a Cell> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.cells.get(i))
    }

    pub fn text(&self, column: &str) -> Option<Cow<'a, str>> {
        self.get(column).map(Cell::as_text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Cell)> {
        self.columns.iter().map(String::as_str).zip(self.cells.iter())
    }
}

/// Pre-loaded datasets keyed by source key.
pub enum SourceData {
    Loaded(Dataset),
    /// The loader could not produce a dataset; the message is logged, never scored.
    Unreadable(String),
}

pub struct ReconInput {
    pub sources: HashMap<String, SourceData>,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Producer,
    Consumer,
    Comparator,
    #[serde(alias = "json_comparator", alias = "file_comparator")]
    JsonFileComparator,
    #[serde(alias = "newrelic")]
    Telemetry,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer => write!(f, "producer"),
            Self::Consumer => write!(f, "consumer"),
            Self::Comparator => write!(f, "comparator"),
            Self::JsonFileComparator => write!(f, "json_file_comparator"),
            Self::Telemetry => write!(f, "telemetry"),
        }
    }
}

/// How a source's kind was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KindOrigin {
    Configured,
    Base,
    Classified,
    Defaulted,
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
    #[serde(rename = "NA")]
    NA,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "Pass"),
            Self::Fail => write!(f, "Fail"),
            Self::NA => write!(f, "NA"),
        }
    }
}

/// Fixed diagnostics for cells that could not be scored from data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnostic {
    SourceUnreadable,
    IdentifierColumnMissing,
    EntityNotFound { entity: String, source: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnreadable => write!(f, "source unreadable"),
            Self::IdentifierColumnMissing => write!(f, "identifier column not found"),
            Self::EntityNotFound { entity, source } => {
                write!(f, "entity {entity} not found in {source}")
            }
        }
    }
}

/// A piece of diagnostic text attached to one (entity, source) cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reason {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub text: String,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(col) => write!(f, "{col}={}", self.text),
            None => write!(f, "{}", self.text),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceVerdict {
    pub source: String,
    pub verdict: Verdict,
    pub reasons: Vec<Reason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityResult {
    pub entity: String,
    pub verdicts: Vec<SourceVerdict>,
    pub final_verdict: Verdict,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSource {
    pub key: String,
    pub locator: String,
    pub kind: SourceKind,
    pub kind_origin: KindOrigin,
    pub readable: bool,
    pub id_column: Option<String>,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceTally {
    pub source: String,
    pub pass: usize,
    pub fail: usize,
    pub na: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub total_entities: usize,
    pub passed: usize,
    pub failed: usize,
    pub per_source: Vec<SourceTally>,
}

/// One source as seen by the coverage scan.
#[derive(Debug, Clone, Serialize)]
pub struct SourceCoverage {
    #[serde(flatten)]
    pub source: ResolvedSource,
    /// Entities with no row in this source. Empty when the source could not
    /// be joined at all.
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Coverage {
    pub base_source: String,
    pub entities: usize,
    pub sources: Vec<SourceCoverage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub base_source: String,
    pub policy: ScoringPolicy,
    pub engine_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub sources: Vec<ResolvedSource>,
    pub summary: ReconSummary,
    pub entities: Vec<EntityResult>,
}
