use serde::Deserialize;

use crate::model::SourceKind;

/// One ordered substring rule: every `all_of` term and, when non-empty, at
/// least one `any_of` term must appear in the lower-cased source text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KindRule {
    pub kind: SourceKind,
    #[serde(default)]
    pub all_of: Vec<String>,
    #[serde(default)]
    pub any_of: Vec<String>,
}

impl KindRule {
    fn new(kind: SourceKind, all_of: &[&str], any_of: &[&str]) -> Self {
        Self {
            kind,
            all_of: all_of.iter().map(|s| s.to_string()).collect(),
            any_of: any_of.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        self.all_of.iter().all(|t| text.contains(&t.to_lowercase()))
            && (self.any_of.is_empty() || self.any_of.iter().any(|t| text.contains(&t.to_lowercase())))
    }
}

/// Most specific first: json/file comparators before generic comparators.
pub fn default_rules() -> Vec<KindRule> {
    vec![
        KindRule::new(SourceKind::JsonFileComparator, &["comparator"], &["json", "file"]),
        KindRule::new(SourceKind::Comparator, &["comparator"], &[]),
        KindRule::new(SourceKind::Producer, &["producer"], &[]),
        KindRule::new(SourceKind::Consumer, &["consumer"], &[]),
        KindRule::new(SourceKind::Telemetry, &[], &["newrelic", "new_relic", "telemetry"]),
    ]
}

/// Classify a source from its key and the file stem of its locator.
///
/// Directories and the extension are ignored. Returns `None` when no rule matches; callers fall
/// back to telemetry.
pub fn classify_source(key: &str, locator: &str, rules: &[KindRule]) -> Option<SourceKind> {
    let text = format!("{key} {}", file_stem(locator)).to_lowercase();
    rules.iter().find(|r| r.matches(&text)).map(|r| r.kind)
}

/// Last segment of a local path or object URL, without its extension.
fn file_stem(locator: &str) -> &str {
    let name = locator
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(locator);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(key: &str, path: &str) -> Option<SourceKind> {
        classify_source(key, path, &default_rules())
    }

    #[test]
    fn json_and_file_comparators_are_distinct() {
        assert_eq!(
            classify("JSON_Comparator", "out/a.xlsx"),
            Some(SourceKind::JsonFileComparator)
        );
        assert_eq!(
            classify("vertex", "out/Vertex_File_Comparator.xlsx"),
            Some(SourceKind::JsonFileComparator)
        );
        assert_eq!(classify("PIX_XML_Comparator", "p.xlsx"), Some(SourceKind::Comparator));
    }

    #[test]
    fn directories_do_not_influence_kind() {
        assert_eq!(
            classify("pix", "/data/profiles/files/PIX_Comparator.csv"),
            Some(SourceKind::Comparator)
        );
        assert_eq!(
            classify("pix", r"C:\json\PIX_Comparator.xlsx"),
            Some(SourceKind::Comparator)
        );
        assert_eq!(classify("pix", "out/PIX_Comparator.json"), Some(SourceKind::Comparator));
        assert_eq!(classify("a", "gs://producer-bucket/run/a.csv"), None);
        assert_eq!(file_stem("gs://b/run/Vertex_Consumer.csv"), "Vertex_Consumer");
        assert_eq!(file_stem(".hidden"), ".hidden");
    }

    #[test]
    fn producer_consumer_telemetry() {
        assert_eq!(classify("Producer", "p.xlsx"), Some(SourceKind::Producer));
        assert_eq!(classify("ip_us", "IP_US_Consumer.xlsx"), Some(SourceKind::Consumer));
        assert_eq!(classify("Mirakl_NewRelic", "m.xlsx"), Some(SourceKind::Telemetry));
    }

    #[test]
    fn comparator_outranks_producer() {
        assert_eq!(
            classify("producer_comparator", "x.csv"),
            Some(SourceKind::Comparator)
        );
    }

    #[test]
    fn unmatched_is_none() {
        assert_eq!(classify("ledger", "ledger.csv"), None);
    }

    #[test]
    fn custom_rules_replace_defaults() {
        #[derive(Deserialize)]
        struct Probe {
            rules: Vec<KindRule>,
        }
        let Probe { rules } = toml::from_str(
            r#"
[[rules]]
kind = "consumer"
any_of = ["delivery"]
"#,
        )
        .unwrap();
        assert_eq!(
            classify_source("Delivery_Report", "d.csv", &rules),
            Some(SourceKind::Consumer)
        );
        assert_eq!(classify_source("Producer", "p.csv", &rules), None);
    }
}
