//! Locator → dataset. Format is chosen by extension, then by content.

use std::collections::HashMap;

use log::{info, warn};
use tally_recon::{Dataset, ReconConfig, ReconInput, SourceData};

use crate::error::LoadError;
use crate::storage;

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Worksheet name for workbook formats.
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Delimited,
    Workbook,
    Json,
}

impl Format {
    pub fn from_locator(locator: &str) -> Option<Self> {
        let name = storage::file_name(locator);
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Delimited),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Workbook),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Zip (xlsx/ods) and OLE (xls) containers are workbooks; a leading `[` is JSON.
    fn sniff(bytes: &[u8]) -> Self {
        const ZIP: &[u8] = b"PK\x03\x04";
        const OLE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
        if bytes.starts_with(ZIP) || bytes.starts_with(OLE) {
            Self::Workbook
        } else if bytes.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'[') {
            Self::Json
        } else {
            Self::Delimited
        }
    }
}

pub fn load_dataset(locator: &str, options: &LoadOptions) -> Result<Dataset, LoadError> {
    let bytes = storage::read_bytes(locator)?;
    let format = Format::from_locator(locator).unwrap_or_else(|| Format::sniff(&bytes));

    match format {
        Format::Delimited => crate::csv::read_dataset(locator, bytes)
            .map_err(|e| LoadError::unreadable(locator, e.to_string())),
        Format::Workbook => crate::xlsx::read_dataset(bytes, options.sheet.as_deref())
            .map_err(|e| LoadError::unreadable(locator, e)),
        Format::Json => {
            crate::json::read_records(&bytes).map_err(|e| LoadError::unreadable(locator, e))
        }
    }
}

/// Load every configured source. Failures become `SourceData::Unreadable`;
/// scoring decides what they mean.
pub fn load_sources(config: &ReconConfig) -> ReconInput {
    let mut sources = HashMap::with_capacity(config.sources.len());
    for source in &config.sources {
        let options = LoadOptions {
            sheet: source.sheet.clone(),
        };
        let data = match load_dataset(&source.path, &options) {
            Ok(ds) => {
                info!(
                    "[{}] loaded {} rows, {} columns from {}",
                    source.key,
                    ds.len(),
                    ds.columns().len(),
                    source.path
                );
                SourceData::Loaded(ds)
            }
            Err(e) => {
                warn!("[{}] {}", source.key, e);
                SourceData::Unreadable(e.to_string())
            }
        };
        sources.insert(source.key.clone(), data);
    }
    ReconInput { sources }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_locator("a/B.CSV"), Some(Format::Delimited));
        assert_eq!(Format::from_locator("gs://b/x.xlsx"), Some(Format::Workbook));
        assert_eq!(Format::from_locator("r.json"), Some(Format::Json));
        assert_eq!(Format::from_locator("noext"), None);
        assert_eq!(Format::from_locator("dir.v2/noext"), None);
    }

    #[test]
    fn format_sniffed_from_content() {
        assert_eq!(Format::sniff(b"PK\x03\x04rest"), Format::Workbook);
        assert_eq!(Format::sniff(b"  \n[{\"a\":1}]"), Format::Json);
        assert_eq!(Format::sniff(b"a,b\n1,2\n"), Format::Delimited);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let locator = dir.path().join("Producer.csv").to_string_lossy().into_owned();
        let err = load_dataset(&locator, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn loads_sources_and_marks_failures() {
        let dir = tempdir().unwrap();
        let producer = dir.path().join("Producer.csv");
        std::fs::write(&producer, "Invoice No.,Posted_To_Producer_Topic?\nINV1,Yes\n").unwrap();
        let records = dir.path().join("cmp");
        std::fs::write(&records, r#"[{"Tracking_ID": "INV1", "Status": "Pass"}]"#).unwrap();

        let toml = format!(
            r#"
            [[sources]]
            key = "producer"
            path = "{}"

            [[sources]]
            key = "json_comparator"
            path = "{}"

            [[sources]]
            key = "consumer"
            path = "{}"
            "#,
            producer.display(),
            records.display(),
            dir.path().join("missing.csv").display(),
        );
        let config = ReconConfig::from_toml(&toml).unwrap();
        let input = load_sources(&config);

        assert!(matches!(input.sources["producer"], SourceData::Loaded(ref ds) if ds.len() == 1));
        assert!(
            matches!(input.sources["json_comparator"], SourceData::Loaded(ref ds) if ds.columns().len() == 2)
        );
        assert!(
            matches!(input.sources["consumer"], SourceData::Unreadable(ref msg) if msg.contains("not found"))
        );
    }
}
