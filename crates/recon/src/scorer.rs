//! Per-kind scoring rules.
//!
//! Each rule is a pure function of one looked-up row. Row absence, missing
//! identifier columns and unreadable sources never reach this module; the
//! driver turns those into fixed diagnostics.

use crate::matcher::{find_column, ColumnMatcher, SchemaMatchers};
use crate::model::{RowRef, SourceKind, Verdict};
use crate::policy::{InapplicableOutcome, ScoringPolicy};
use crate::token::{classify_token, extract_reason, is_comparator_na, TokenClass};

/// Reason text before it is bound to a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub column: Option<String>,
    pub text: String,
}

impl Finding {
    fn at(column: &str, text: impl Into<String>) -> Self {
        Self {
            column: Some(column.to_string()),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scored {
    pub verdict: Verdict,
    pub findings: Vec<Finding>,
}

impl Scored {
    fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            findings: Vec::new(),
        }
    }
}

/// The column a silent failure is reported against.
enum Designated<'a> {
    Column(&'a str),
    Absent,
    AllFlags,
}

pub struct Scorer {
    policy: ScoringPolicy,
    schema: SchemaMatchers,
}

impl Scorer {
    pub fn new(policy: ScoringPolicy, schema: SchemaMatchers) -> Self {
        Self { policy, schema }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn score(&self, kind: SourceKind, row: RowRef<'_>, id_column: &str) -> Scored {
        let (mut scored, designated) = match kind {
            SourceKind::Producer => self.producer(row),
            SourceKind::Consumer => self.consumer(row),
            SourceKind::Comparator => self.comparator(row, id_column),
            SourceKind::JsonFileComparator => self.json_file_comparator(row, id_column),
            SourceKind::Telemetry => (telemetry(row, id_column), Designated::AllFlags),
        };

        if self.policy.silent_failure_reasons
            && scored.verdict != Verdict::Pass
            && scored.findings.is_empty()
        {
            scored.findings.push(silent_finding(row, id_column, designated));
        }
        scored
    }

    fn column<'r>(&self, matchers: &[ColumnMatcher], row: RowRef<'r>) -> Option<&'r str> {
        find_column(matchers, row.columns())
    }

    fn producer<'r>(&self, row: RowRef<'r>) -> (Scored, Designated<'r>) {
        let Some(col) = self.column(&self.schema.producer_posted, row) else {
            return (Scored::new(Verdict::Fail), Designated::Absent);
        };
        let value = row.text(col).unwrap_or_default();
        let mut scored = Scored::new(match classify_token(&value) {
            TokenClass::Positive => Verdict::Pass,
            _ => Verdict::Fail,
        });
        push_reason(&mut scored.findings, col, &value);
        (scored, Designated::Column(col))
    }

    fn consumer<'r>(&self, row: RowRef<'r>) -> (Scored, Designated<'r>) {
        let app_col = self.column(&self.schema.consumer_applicable, row);
        let post_col = self.column(&self.schema.consumer_posted, row);
        let app = app_col.and_then(|c| row.text(c)).unwrap_or_default();
        let post = post_col.and_then(|c| row.text(c)).unwrap_or_default();

        let verdict = match (classify_token(&app), classify_token(&post)) {
            (TokenClass::Negative, _) => match self.policy.consumer_inapplicable {
                InapplicableOutcome::Fail => Verdict::Fail,
                InapplicableOutcome::NotApplicable => Verdict::NA,
            },
            (TokenClass::Positive, TokenClass::Positive) => Verdict::Pass,
            _ => Verdict::Fail,
        };

        let mut scored = Scored::new(verdict);
        for (col, value) in [(app_col, &app), (post_col, &post)] {
            if let Some(col) = col {
                push_reason(&mut scored.findings, col, value);
            }
        }

        // The posted flag is what a silent failure is about, unless the
        // applicability flag is the one that failed.
        let designated = match (app_col, post_col) {
            (Some(a), _) if classify_token(&app) != TokenClass::Positive => Designated::Column(a),
            (_, Some(p)) => Designated::Column(p),
            (Some(a), None) => Designated::Column(a),
            (None, None) => Designated::Absent,
        };
        (scored, designated)
    }

    fn comparator<'r>(&self, row: RowRef<'r>, id_column: &str) -> (Scored, Designated<'r>) {
        let Some(col) = self.column(&self.schema.comparator_match, row) else {
            return (all_positive(row, id_column), Designated::AllFlags);
        };
        let value = row.text(col).unwrap_or_default();
        let verdict = if classify_token(&value) == TokenClass::Positive {
            Verdict::Pass
        } else if is_comparator_na(&value) {
            Verdict::NA
        } else {
            Verdict::Fail
        };
        let mut scored = Scored::new(verdict);
        push_reason(&mut scored.findings, col, &value);
        (scored, Designated::Column(col))
    }

    fn json_file_comparator<'r>(
        &self,
        row: RowRef<'r>,
        id_column: &str,
    ) -> (Scored, Designated<'r>) {
        let Some(col) = self.column(&self.schema.comparator_status, row) else {
            return (all_positive(row, id_column), Designated::AllFlags);
        };
        let value = row.text(col).unwrap_or_default();
        let mut scored = Scored::new(match classify_token(&value) {
            TokenClass::Positive => Verdict::Pass,
            _ => Verdict::Fail,
        });
        push_reason(&mut scored.findings, col, &value);

        if scored.verdict != Verdict::Pass {
            if let Some(reason_col) = self.column(&self.schema.comparator_reason, row) {
                let text = row.text(reason_col).unwrap_or_default();
                let text = text.trim();
                if !text.is_empty() {
                    scored.findings.push(Finding::at(reason_col, text));
                }
            }
        }
        (scored, Designated::Column(col))
    }
}

// ---------------------------------------------------------------------------
// All-flags rules
// ---------------------------------------------------------------------------

fn non_id_columns<'r>(
    row: RowRef<'r>,
    id_column: &'r str,
) -> impl Iterator<Item = (&'r str, std::borrow::Cow<'r, str>)> {
    row.iter()
        .filter(move |(col, _)| *col != id_column)
        .map(|(col, cell)| (col, cell.as_text()))
}

/// Fallback for comparators without their designated column: every
/// non-identifier column must be positive.
fn all_positive(row: RowRef<'_>, id_column: &str) -> Scored {
    let pass = non_id_columns(row, id_column).all(|(_, v)| classify_token(&v) == TokenClass::Positive);
    let mut scored = Scored::new(if pass { Verdict::Pass } else { Verdict::Fail });
    if !pass {
        for (col, value) in non_id_columns(row, id_column) {
            push_reason(&mut scored.findings, col, &value);
        }
    }
    scored
}

/// Blank cells and free text are skipped; any flag that is not positive
/// fails the row, and at least one positive flag is required.
fn telemetry(row: RowRef<'_>, id_column: &str) -> Scored {
    let mut saw_positive = false;
    let mut offending = Vec::new();

    for (col, value) in non_id_columns(row, id_column) {
        if value.trim().is_empty() {
            continue;
        }
        match classify_token(&value) {
            TokenClass::Positive => saw_positive = true,
            TokenClass::Unrecognized => {}
            TokenClass::Negative => offending.push(Finding::at(col, value.trim())),
            TokenClass::ExplicitFailure => {
                let text = extract_reason(&value).unwrap_or_else(|| value.trim().to_string());
                offending.push(Finding::at(col, text));
            }
        }
    }

    let verdict = if offending.is_empty() && saw_positive {
        Verdict::Pass
    } else {
        Verdict::Fail
    };
    Scored {
        verdict,
        findings: offending,
    }
}

fn push_reason(findings: &mut Vec<Finding>, column: &str, value: &str) {
    if let Some(text) = extract_reason(value) {
        findings.push(Finding::at(column, text));
    }
}

fn silent_finding(row: RowRef<'_>, id_column: &str, designated: Designated<'_>) -> Finding {
    let shown = |v: &str| {
        let v = v.trim();
        if v.is_empty() {
            "<blank>".to_string()
        } else {
            v.to_string()
        }
    };
    match designated {
        Designated::Column(col) => Finding::at(col, shown(&row.text(col).unwrap_or_default())),
        Designated::Absent => Finding {
            column: None,
            text: "no status column".into(),
        },
        Designated::AllFlags => non_id_columns(row, id_column)
            .find(|(_, v)| classify_token(v) != TokenClass::Positive)
            .map(|(col, v)| Finding::at(col, shown(&v)))
            .unwrap_or_else(|| Finding {
                column: None,
                text: "no positive flag".into(),
            }),
    }
}
