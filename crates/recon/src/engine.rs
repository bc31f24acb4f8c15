use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};

use crate::aggregate::{consolidate_reasons, final_verdict};
use crate::classify::classify_source;
use crate::config::{ReconConfig, SourceConfig};
use crate::error::ReconError;
use crate::identifier::resolve_identifier;
use crate::model::{
    Coverage, Dataset, Diagnostic, EntityResult, KindOrigin, Reason, ReconInput, ReconMeta,
    ReconResult, ReconSummary, ResolvedSource, SourceCoverage, SourceData, SourceKind,
    SourceTally, SourceVerdict, Verdict,
};
use crate::scorer::Scorer;

/// Run reconciliation per config. Returns one result per entity plus summary.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    let sources = prepare(config, input);
    let base = base_source(config, &sources)?;
    let entities = canonical_entities(config, base);
    info!(
        "reconciling {} entities from '{}' across {} sources",
        entities.len(),
        base.key,
        sources.len()
    );
    scan_coverage(&sources, &entities);

    let results: Vec<EntityResult> = entities
        .iter()
        .map(|entity| score_entity(entity, &sources))
        .collect();

    let summary = summarize(&sources, &results);
    let policy = config.policy.resolve(None);

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            base_source: base.key.to_string(),
            policy,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        sources: sources.iter().map(Prepared::resolved).collect(),
        summary,
        entities: results,
    })
}

/// Per-source load/join report, without scoring.
pub fn coverage(config: &ReconConfig, input: &ReconInput) -> Result<Coverage, ReconError> {
    let sources = prepare(config, input);
    let base = base_source(config, &sources)?;
    let entities = canonical_entities(config, base);

    let report = scan_coverage(&sources, &entities);

    Ok(Coverage {
        base_source: base.key.to_string(),
        entities: entities.len(),
        sources: report,
    })
}

/// Entities each joinable source lacks, logged per source.
fn scan_coverage(sources: &[Prepared<'_>], entities: &[String]) -> Vec<SourceCoverage> {
    sources
        .iter()
        .map(|source| {
            let missing: Vec<String> = if source.joinable() {
                entities
                    .iter()
                    .filter(|e| !source.index.contains_key(e.as_str()))
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };

            if !source.joinable() {
                warn!("[{}] cannot be joined: {}", source.key, source.unjoinable_reason());
            } else if missing.is_empty() {
                info!("[{}] all {} entities present", source.key, entities.len());
            } else {
                warn!(
                    "[{}] missing {} entities: {}",
                    source.key,
                    missing.len(),
                    missing.join(", ")
                );
            }

            SourceCoverage {
                source: source.resolved(),
                missing,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Source preparation
// ---------------------------------------------------------------------------

/// A configured source with everything resolved once per run.
struct Prepared<'a> {
    key: &'a str,
    locator: &'a str,
    kind: SourceKind,
    kind_origin: KindOrigin,
    dataset: Option<&'a Dataset>,
    load_error: Option<&'a str>,
    id_column: Option<String>,
    /// Trimmed identifier → first row index.
    index: HashMap<String, usize>,
    scorer: Scorer,
}

impl Prepared<'_> {
    fn joinable(&self) -> bool {
        self.dataset.is_some() && self.id_column.is_some()
    }

    fn unjoinable_reason(&self) -> String {
        match (self.dataset, self.load_error) {
            (None, Some(err)) => format!("source unreadable ({err})"),
            (None, None) => "source unreadable".into(),
            (Some(_), _) => "identifier column not found".into(),
        }
    }

    fn resolved(&self) -> ResolvedSource {
        ResolvedSource {
            key: self.key.to_string(),
            locator: self.locator.to_string(),
            kind: self.kind,
            kind_origin: self.kind_origin,
            readable: self.dataset.is_some(),
            id_column: self.id_column.clone(),
            rows: self.dataset.map(Dataset::len).unwrap_or(0),
        }
    }
}

fn prepare<'a>(config: &'a ReconConfig, input: &'a ReconInput) -> Vec<Prepared<'a>> {
    let rules = config.classifier.rules();
    let policy = config.policy.resolve(None);
    let base_key = config.base_key();

    config
        .sources
        .iter()
        .map(|source| {
            let (kind, kind_origin) = resolve_kind(source, base_key, &rules);
            let schema = config.schema_for(&source.key);

            let (dataset, load_error) = match input.sources.get(&source.key) {
                Some(SourceData::Loaded(ds)) => (Some(ds), None),
                Some(SourceData::Unreadable(err)) => (None, Some(err.as_str())),
                None => (None, None),
            };

            let id_column = dataset.and_then(|ds| {
                resolve_identifier(ds.columns(), source.id_column.as_deref(), &schema.identifier)
            });
            let index = match (dataset, &id_column) {
                (Some(ds), Some(col)) => build_index(ds, col),
                _ => HashMap::new(),
            };

            match (dataset, &id_column) {
                (Some(ds), Some(col)) => info!(
                    "[{}] kind={} ({:?}) id_column='{}' rows={} cols={}",
                    source.key,
                    kind,
                    kind_origin,
                    col,
                    ds.len(),
                    ds.columns().len()
                ),
                (Some(ds), None) => warn!(
                    "[{}] no identifier column among [{}]",
                    source.key,
                    ds.columns().join(", ")
                ),
                (None, _) => warn!(
                    "[{}] unreadable: {}",
                    source.key,
                    load_error.unwrap_or("not loaded")
                ),
            }

            Prepared {
                key: &source.key,
                locator: &source.path,
                kind,
                kind_origin,
                dataset,
                load_error,
                id_column,
                index,
                scorer: Scorer::new(policy, schema),
            }
        })
        .collect()
}

fn resolve_kind(
    source: &SourceConfig,
    base_key: &str,
    rules: &[crate::classify::KindRule],
) -> (SourceKind, KindOrigin) {
    if let Some(kind) = source.kind {
        return (kind, KindOrigin::Configured);
    }
    if source.key == base_key {
        return (SourceKind::Producer, KindOrigin::Base);
    }
    match classify_source(&source.key, &source.path, rules) {
        Some(kind) => (kind, KindOrigin::Classified),
        None => {
            debug!(
                "[{}] unclassified source kind, scoring as {}",
                source.key,
                SourceKind::Telemetry
            );
            (SourceKind::Telemetry, KindOrigin::Defaulted)
        }
    }
}

fn build_index(dataset: &Dataset, id_column: &str) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (i, row) in dataset.rows().enumerate() {
        let id = row.text(id_column).unwrap_or_default();
        let id = id.trim();
        if !id.is_empty() {
            index.entry(id.to_string()).or_insert(i);
        }
    }
    index
}

fn base_source<'p, 'a>(
    config: &ReconConfig,
    sources: &'p [Prepared<'a>],
) -> Result<&'p Prepared<'a>, ReconError> {
    let key = config.base_key();
    let base = sources
        .iter()
        .find(|s| s.key == key)
        .ok_or_else(|| ReconError::UnknownSource(key.to_string()))?;

    let Some(dataset) = base.dataset else {
        return Err(ReconError::BaseUnreadable {
            source: key.to_string(),
            error: base.load_error.unwrap_or("not loaded").to_string(),
        });
    };
    if base.id_column.is_none() {
        return Err(ReconError::BaseIdentifierMissing {
            source: key.to_string(),
            columns: dataset.columns().to_vec(),
        });
    }
    Ok(base)
}

/// Explicit entity list if configured, else base rows in first-seen order.
fn canonical_entities(config: &ReconConfig, base: &Prepared<'_>) -> Vec<String> {
    let candidates: Vec<String> = if config.entities.is_empty() {
        match (base.dataset, &base.id_column) {
            (Some(ds), Some(col)) => ds
                .rows()
                .map(|row| row.text(col).unwrap_or_default().trim().to_string())
                .collect(),
            _ => Vec::new(),
        }
    } else {
        config.entities.iter().map(|e| e.trim().to_string()).collect()
    };

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|e| !e.is_empty() && seen.insert(e.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

fn score_entity(entity: &str, sources: &[Prepared<'_>]) -> EntityResult {
    let verdicts: Vec<SourceVerdict> = sources.iter().map(|s| score_cell(entity, s)).collect();
    let final_verdict = final_verdict(verdicts.iter().map(|v| &v.verdict));
    let reason = consolidate_reasons(&verdicts);
    EntityResult {
        entity: entity.to_string(),
        verdicts,
        final_verdict,
        reason,
    }
}

fn score_cell(entity: &str, source: &Prepared<'_>) -> SourceVerdict {
    let (Some(dataset), Some(id_column)) = (source.dataset, source.id_column.as_deref()) else {
        let diagnostic = if source.dataset.is_none() {
            Diagnostic::SourceUnreadable
        } else {
            Diagnostic::IdentifierColumnMissing
        };
        return failed_with(source.key, diagnostic);
    };

    let row = source.index.get(entity).and_then(|&i| dataset.row(i));
    let Some(row) = row else {
        return failed_with(
            source.key,
            Diagnostic::EntityNotFound {
                entity: entity.to_string(),
                source: source.key.to_string(),
            },
        );
    };

    let scored = source.scorer.score(source.kind, row, id_column);
    SourceVerdict {
        source: source.key.to_string(),
        verdict: scored.verdict,
        reasons: scored
            .findings
            .into_iter()
            .map(|f| Reason {
                source: source.key.to_string(),
                column: f.column,
                text: f.text,
            })
            .collect(),
        diagnostic: None,
    }
}

fn failed_with(source: &str, diagnostic: Diagnostic) -> SourceVerdict {
    SourceVerdict {
        source: source.to_string(),
        verdict: Verdict::Fail,
        reasons: vec![Reason {
            source: source.to_string(),
            column: None,
            text: diagnostic.to_string(),
        }],
        diagnostic: Some(diagnostic),
    }
}

fn summarize(sources: &[Prepared<'_>], results: &[EntityResult]) -> ReconSummary {
    let mut per_source: Vec<SourceTally> = sources
        .iter()
        .map(|s| SourceTally {
            source: s.key.to_string(),
            ..SourceTally::default()
        })
        .collect();

    let mut passed = 0;
    for result in results {
        if result.final_verdict == Verdict::Pass {
            passed += 1;
        }
        for (tally, sv) in per_source.iter_mut().zip(&result.verdicts) {
            match sv.verdict {
                Verdict::Pass => tally.pass += 1,
                Verdict::Fail => tally.fail += 1,
                Verdict::NA => tally.na += 1,
            }
        }
    }

    ReconSummary {
        total_entities: results.len(),
        passed,
        failed: results.len() - passed,
        per_source,
    }
}
