use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Deserialize;

use crate::classify::{default_rules, KindRule};
use crate::error::ReconError;
use crate::matcher::{SchemaMatchers, SchemaOverrides};
use crate::model::SourceKind;
use crate::policy::PolicyOverrides;
use crate::report::{per_source_stem, Layout, CONSOLIDATED_STEM, GROUPED_STEM};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Source supplying the canonical entity list. Defaults to the first source.
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub schema: SchemaOverrides,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub policy: PolicyOverrides,
    #[serde(default)]
    pub output: OutputConfig,
    /// Explicit entity list; replaces derivation from the base source.
    #[serde(default)]
    pub entities: Vec<String>,
    /// Variables visible to locator expansion, ahead of the process env.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_name() -> String {
    "recon".into()
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub key: String,
    #[serde(alias = "file", alias = "locator")]
    pub path: String,
    /// Bypasses the classifier.
    #[serde(default)]
    pub kind: Option<SourceKind>,
    #[serde(default)]
    pub id_column: Option<String>,
    /// Worksheet to read from a workbook; first sheet otherwise.
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default)]
    pub schema: SchemaOverrides,
}

impl SourceConfig {
    pub fn new(key: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
            kind: None,
            id_column: None,
            sheet: None,
            schema: SchemaOverrides::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Replaces the built-in rule list when present.
    #[serde(default)]
    pub rules: Option<Vec<KindRule>>,
}

impl ClassifierConfig {
    pub fn rules(&self) -> Vec<KindRule> {
        self.rules.clone().unwrap_or_else(default_rules)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Xlsx,
    Csv,
    Json,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{other}' (expected xlsx, csv or json)")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default = "default_id_header")]
    pub id_header: String,
    /// Columns of the grouped report, in order.
    #[serde(default)]
    pub groups: Vec<OutputGroup>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            layout: Layout::default(),
            format: ReportFormat::default(),
            id_header: default_id_header(),
            groups: Vec::new(),
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}

fn default_id_header() -> String {
    "Invoice No.".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputGroup {
    pub name: String,
    pub sources: Vec<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Legacy JSON layouts:
    ///
    /// - `{"producer": .., "files": {key: path}, "output": dir, "env": {..}}`
    /// - `{"datasets": {key: path}, "output": {"excel": file}, "env": {..}}`
    ///
    /// Object key order is the configured source order.
    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        let raw: LegacyJson =
            serde_json::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        let config = raw.into_config()?;
        config.validate()?;
        Ok(config)
    }

    /// Pick the parser from the file name, falling back to sniffing a leading `{`.
    pub fn from_str_auto(input: &str, file_name: &str) -> Result<Self, ReconError> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".json") {
            Self::from_json(input)
        } else if lower.ends_with(".toml") {
            Self::from_toml(input)
        } else if input.trim_start().starts_with('{') {
            Self::from_json(input)
        } else {
            Self::from_toml(input)
        }
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.sources.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one source is required".into(),
            ));
        }

        let mut keys = HashSet::new();
        for source in &self.sources {
            if source.key.trim().is_empty() {
                return Err(ReconError::ConfigValidation("source key must not be empty".into()));
            }
            if source.path.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{}': path must not be empty",
                    source.key
                )));
            }
            let stem = per_source_stem(&source.key);
            if stem.eq_ignore_ascii_case(CONSOLIDATED_STEM) || stem.eq_ignore_ascii_case(GROUPED_STEM) {
                return Err(ReconError::ConfigValidation(format!(
                    "source key '{}' is reserved: its report would overwrite {}",
                    source.key, stem
                )));
            }
            if !keys.insert(source.key.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate source key '{}'",
                    source.key
                )));
            }
        }

        if let Some(base) = &self.base {
            if !keys.contains(base.as_str()) {
                return Err(ReconError::UnknownSource(format!("base source '{base}' not found")));
            }
        }

        let mut group_names = HashSet::new();
        for group in &self.output.groups {
            if group.name.trim().is_empty() {
                return Err(ReconError::ConfigValidation("output group name must not be empty".into()));
            }
            if !group_names.insert(group.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate output group '{}'",
                    group.name
                )));
            }
            if group.sources.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "output group '{}' has no sources",
                    group.name
                )));
            }
            for member in &group.sources {
                if !keys.contains(member.as_str()) {
                    return Err(ReconError::UnknownSource(format!(
                        "output group '{}': source '{member}' not found",
                        group.name
                    )));
                }
            }
        }

        if self.output.id_header.trim().is_empty() {
            return Err(ReconError::ConfigValidation("output.id_header must not be empty".into()));
        }

        Ok(())
    }

    pub fn base_key(&self) -> &str {
        match &self.base {
            Some(base) => base.as_str(),
            None => self.sources.first().map(|s| s.key.as_str()).unwrap_or_default(),
        }
    }

    pub fn source(&self, key: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.key == key)
    }

    /// Effective matchers for one source: defaults, then `[schema]`, then the
    /// source's own `schema`.
    pub fn schema_for(&self, key: &str) -> SchemaMatchers {
        let global = self.schema.apply(&SchemaMatchers::default());
        match self.source(key) {
            Some(source) => source.schema.apply(&global),
            None => global,
        }
    }

    /// Rewrite every locator (source paths and output dir) through `expand`.
    pub fn expand_locators<F>(&mut self, mut expand: F)
    where
        F: FnMut(&str) -> String,
    {
        for source in &mut self.sources {
            source.path = expand(&source.path);
        }
        self.output.dir = expand(&self.output.dir);
    }
}

// ---------------------------------------------------------------------------
// Legacy JSON
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LegacyJson {
    #[serde(default)]
    producer: Option<String>,
    #[serde(default)]
    files: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    datasets: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    output: Option<LegacyOutput>,
    #[serde(default)]
    env: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyOutput {
    Dir(String),
    Excel { excel: String },
}

fn legacy_sources(
    map: serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<SourceConfig>, ReconError> {
    map.into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(path) => Ok(SourceConfig::new(key, path)),
            other => Err(ReconError::ConfigParse(format!(
                "source '{key}': expected a path string, got {other}"
            ))),
        })
        .collect()
}

impl LegacyJson {
    fn into_config(self) -> Result<ReconConfig, ReconError> {
        let (sources, base) = match self.producer {
            Some(producer) => {
                let mut base_source = SourceConfig::new("producer", producer);
                base_source.kind = Some(SourceKind::Producer);
                let mut sources = vec![base_source];
                sources.extend(legacy_sources(self.files)?);
                (sources, Some("producer".to_string()))
            }
            None => {
                let sources = legacy_sources(self.datasets)?;
                let base = sources
                    .iter()
                    .find(|s| s.key == "Producer")
                    .map(|s| s.key.clone());
                (sources, base)
            }
        };

        let dir = match self.output {
            Some(LegacyOutput::Dir(dir)) => dir,
            Some(LegacyOutput::Excel { excel }) => match excel.rfind('/') {
                Some(0) => "/".into(),
                Some(i) => excel[..i].to_string(),
                None => default_output_dir(),
            },
            None => default_output_dir(),
        };

        Ok(ReconConfig {
            name: default_name(),
            base,
            sources,
            schema: SchemaOverrides::default(),
            classifier: ClassifierConfig::default(),
            policy: PolicyOverrides::default(),
            output: OutputConfig {
                dir,
                ..OutputConfig::default()
            },
            entities: Vec::new(),
            env: self.env,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
