//! Tabular report shapes over a finished [`ReconResult`].
//!
//! Every layout reads the same per-entity results; none of them rescore.

use serde::{Deserialize, Serialize};

use crate::aggregate::{consolidate_reasons, group_verdict};
use crate::config::OutputGroup;
use crate::model::{ReconResult, SourceVerdict};

pub const CONSOLIDATED_STEM: &str = "consolidated_report";
pub const GROUPED_STEM: &str = "final_report";

/// File stem of one source's per-source report.
pub fn per_source_stem(key: &str) -> String {
    format!("{key}_report")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    #[default]
    Consolidated,
    #[serde(alias = "per_source")]
    PerSource,
    Grouped,
    All,
}

impl std::str::FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "consolidated" => Ok(Self::Consolidated),
            "per-source" => Ok(Self::PerSource),
            "grouped" => Ok(Self::Grouped),
            "all" => Ok(Self::All),
            other => Err(format!(
                "unknown layout '{other}' (expected consolidated, per-source, grouped or all)"
            )),
        }
    }
}

/// One sheet: ordered column names and ordered rows of string cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One output file. `stem` carries no extension; the writer picks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportFile {
    pub stem: String,
    pub tables: Vec<ReportTable>,
}

pub const FINAL_RESULT: &str = "Final Result";
pub const FAIL_REASON: &str = "Fail Reason";

/// Build every report file the layout asks for, in a fixed order.
pub fn build(
    result: &ReconResult,
    layout: Layout,
    id_header: &str,
    groups: &[OutputGroup],
) -> Vec<ReportFile> {
    let mut files = Vec::new();
    if matches!(layout, Layout::Consolidated | Layout::All) {
        files.push(consolidated(result, id_header));
    }
    if matches!(layout, Layout::PerSource | Layout::All) {
        files.extend(per_source(result, id_header));
    }
    if matches!(layout, Layout::Grouped | Layout::All) {
        files.push(grouped(result, id_header, groups));
    }
    files
}

// ---------------------------------------------------------------------------
// Consolidated
// ---------------------------------------------------------------------------

pub fn consolidated(result: &ReconResult, id_header: &str) -> ReportFile {
    let mut columns = vec![id_header.to_string()];
    columns.extend(result.sources.iter().map(|s| s.key.clone()));
    columns.push(FINAL_RESULT.into());
    columns.push(FAIL_REASON.into());

    let rows = result
        .entities
        .iter()
        .map(|e| {
            let mut row = vec![e.entity.clone()];
            row.extend(e.verdicts.iter().map(|v| v.verdict.to_string()));
            row.push(e.final_verdict.to_string());
            row.push(e.reason.clone());
            row
        })
        .collect();

    ReportFile {
        stem: CONSOLIDATED_STEM.into(),
        tables: vec![ReportTable {
            name: "Consolidated".into(),
            columns,
            rows,
        }],
    }
}

// ---------------------------------------------------------------------------
// Per-source
// ---------------------------------------------------------------------------

fn source_table(result: &ReconResult, index: usize, name: &str, id_header: &str) -> ReportTable {
    let rows = result
        .entities
        .iter()
        .filter_map(|e| e.verdicts.get(index).map(|v| (e, v)))
        .map(|(e, v)| {
            let reasons: Vec<String> = v.reasons.iter().map(|r| r.to_string()).collect();
            vec![e.entity.clone(), v.verdict.to_string(), reasons.join("; ")]
        })
        .collect();

    ReportTable {
        name: name.into(),
        columns: vec![id_header.into(), "Status".into(), "Reason".into()],
        rows,
    }
}

pub fn per_source(result: &ReconResult, id_header: &str) -> Vec<ReportFile> {
    result
        .sources
        .iter()
        .enumerate()
        .map(|(i, source)| ReportFile {
            stem: per_source_stem(&source.key),
            tables: vec![source_table(result, i, "Report", id_header)],
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Grouped
// ---------------------------------------------------------------------------

/// Base source sheet plus a `Final` sheet with one column per output group.
///
/// With no groups configured, every non-base source is its own group.
pub fn grouped(result: &ReconResult, id_header: &str, groups: &[OutputGroup]) -> ReportFile {
    let base = &result.meta.base_source;
    let position = |key: &str| result.sources.iter().position(|s| s.key == key);

    let groups: Vec<(String, Vec<usize>)> = if groups.is_empty() {
        result
            .sources
            .iter()
            .enumerate()
            .filter(|(_, s)| &s.key != base)
            .map(|(i, s)| (s.key.clone(), vec![i]))
            .collect()
    } else {
        groups
            .iter()
            .map(|g| {
                let members = g.sources.iter().filter_map(|k| position(k.as_str())).collect();
                (g.name.clone(), members)
            })
            .collect()
    };

    // Sources contributing to the Fail Reason column, in configured order.
    let mut grouped_sources: Vec<usize> =
        groups.iter().flat_map(|(_, m)| m.iter().copied()).collect();
    grouped_sources.sort_unstable();
    grouped_sources.dedup();

    let mut columns = vec![id_header.to_string()];
    columns.extend(groups.iter().map(|(name, _)| name.clone()));
    columns.push(FAIL_REASON.into());

    let rows = result
        .entities
        .iter()
        .map(|e| {
            let mut row = vec![e.entity.clone()];
            for (_, members) in &groups {
                let members: Vec<&SourceVerdict> =
                    members.iter().filter_map(|&i| e.verdicts.get(i)).collect();
                row.push(group_verdict(&members).to_string());
            }
            row.push(consolidate_reasons(
                grouped_sources.iter().filter_map(|&i| e.verdicts.get(i)),
            ));
            row
        })
        .collect();

    let mut tables = Vec::new();
    if let Some(i) = position(base.as_str()) {
        let mut base_table = source_table(result, i, base, id_header);
        base_table.columns = vec![id_header.into(), base.clone(), FAIL_REASON.into()];
        tables.push(base_table);
    }
    tables.push(ReportTable {
        name: "Final".into(),
        columns,
        rows,
    });

    ReportFile {
        stem: GROUPED_STEM.into(),
        tables,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        EntityResult, KindOrigin, Reason, ReconMeta, ReconSummary, ResolvedSource, SourceKind,
        Verdict,
    };
    use crate::policy::ScoringPolicy;

    fn source(key: &str) -> ResolvedSource {
        ResolvedSource {
            key: key.into(),
            locator: format!("{key}.csv"),
            kind: SourceKind::Telemetry,
            kind_origin: KindOrigin::Configured,
            readable: true,
            id_column: Some("Invoice No.".into()),
            rows: 1,
        }
    }

    fn sv(source: &str, verdict: Verdict, reasons: &[&str]) -> SourceVerdict {
        SourceVerdict {
            source: source.into(),
            verdict,
            reasons: reasons
                .iter()
                .map(|t| Reason {
                    source: source.into(),
                    column: Some("Status".into()),
                    text: t.to_string(),
                })
                .collect(),
            diagnostic: None,
        }
    }

    fn sample() -> ReconResult {
        let verdicts = vec![
            sv("producer", Verdict::Pass, &[]),
            sv("vertex_consumer", Verdict::Pass, &[]),
            sv("vertex_file", Verdict::Fail, &["diff a", "diff b"]),
        ];
        let entity = EntityResult {
            entity: "INV1".into(),
            final_verdict: Verdict::Fail,
            reason: consolidate_reasons(&verdicts),
            verdicts,
        };
        ReconResult {
            meta: ReconMeta {
                config_name: "t".into(),
                base_source: "producer".into(),
                policy: ScoringPolicy::default(),
                engine_version: "0".into(),
            },
            sources: vec![source("producer"), source("vertex_consumer"), source("vertex_file")],
            summary: ReconSummary {
                total_entities: 1,
                passed: 0,
                failed: 1,
                per_source: Vec::new(),
            },
            entities: vec![entity],
        }
    }

    #[test]
    fn consolidated_shape() {
        let file = consolidated(&sample(), "Invoice No.");
        assert_eq!(file.stem, "consolidated_report");
        let t = &file.tables[0];
        assert_eq!(t.name, "Consolidated");
        assert_eq!(
            t.columns,
            ["Invoice No.", "producer", "vertex_consumer", "vertex_file", "Final Result", "Fail Reason"]
        );
        assert_eq!(
            t.rows[0],
            ["INV1", "Pass", "Pass", "Fail", "Fail", "vertex_file=[Status=diff a, Status=diff b]"]
        );
    }

    #[test]
    fn per_source_joins_reasons_with_semicolons() {
        let files = per_source(&sample(), "Tracking ID");
        let stems: Vec<_> = files.iter().map(|f| f.stem.as_str()).collect();
        assert_eq!(stems, ["producer_report", "vertex_consumer_report", "vertex_file_report"]);
        let t = &files[2].tables[0];
        assert_eq!(t.columns, ["Tracking ID", "Status", "Reason"]);
        assert_eq!(t.rows[0], ["INV1", "Fail", "Status=diff a; Status=diff b"]);
    }

    #[test]
    fn grouped_folds_members() {
        let groups = vec![OutputGroup {
            name: "Vertex".into(),
            sources: vec!["vertex_consumer".into(), "vertex_file".into()],
        }];
        let file = grouped(&sample(), "Invoice No.", &groups);
        assert_eq!(file.stem, "final_report");
        assert_eq!(file.tables.len(), 2);
        assert_eq!(file.tables[0].name, "producer");
        assert_eq!(file.tables[0].columns, ["Invoice No.", "producer", "Fail Reason"]);
        let fin = &file.tables[1];
        assert_eq!(fin.columns, ["Invoice No.", "Vertex", "Fail Reason"]);
        assert_eq!(fin.rows[0][1], "Fail");
    }

    #[test]
    fn grouped_without_groups_uses_each_non_base_source() {
        let file = grouped(&sample(), "Invoice No.", &[]);
        let fin = &file.tables[1];
        assert_eq!(fin.columns, ["Invoice No.", "vertex_consumer", "vertex_file", "Fail Reason"]);
        assert_eq!(fin.rows[0][1..3], ["Pass", "Fail"]);
    }

    #[test]
    fn layout_all_emits_every_file() {
        let files = build(&sample(), Layout::All, "Invoice No.", &[]);
        assert_eq!(files.len(), 1 + 3 + 1);
        assert_eq!(build(&sample(), Layout::Grouped, "Invoice No.", &[]).len(), 1);
    }

    #[test]
    fn layout_parses_both_spellings() {
        assert_eq!("per_source".parse::<Layout>(), Ok(Layout::PerSource));
        assert_eq!("Per-Source".parse::<Layout>(), Ok(Layout::PerSource));
        assert!("wide".parse::<Layout>().is_err());
    }
}
