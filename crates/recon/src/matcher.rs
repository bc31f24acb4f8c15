use serde::{Deserialize, Serialize};

/// Named predicate over a column name.
///
/// Serialized as `{ match = "prefix", value = "posted_to_producer_topic" }`.
/// `exact` compares trimmed names case-sensitively; every other matcher
/// compares lower-cased names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", content = "value", rename_all = "snake_case")]
pub enum ColumnMatcher {
    Exact(String),
    ExactIgnoreCase(String),
    Prefix(String),
    Contains(String),
    ContainsAll(Vec<String>),
    ContainsAny(Vec<String>),
}

impl ColumnMatcher {
    pub fn exact(name: &str) -> Self {
        Self::Exact(name.into())
    }

    pub fn matches(&self, column: &str) -> bool {
        let trimmed = column.trim();
        let lower = trimmed.to_lowercase();
        match self {
            Self::Exact(v) => trimmed == v.trim(),
            Self::ExactIgnoreCase(v) => trimmed.eq_ignore_ascii_case(v.trim()),
            Self::Prefix(v) => lower.starts_with(&v.to_lowercase()),
            Self::Contains(v) => lower.contains(&v.to_lowercase()),
            Self::ContainsAll(vs) => vs.iter().all(|v| lower.contains(&v.to_lowercase())),
            Self::ContainsAny(vs) => vs.iter().any(|v| lower.contains(&v.to_lowercase())),
        }
    }
}

/// Apply matchers in order; within one matcher, columns are scanned in order.
pub fn find_column<'a>(matchers: &[ColumnMatcher], columns: &'a [String]) -> Option<&'a str> {
    matchers
        .iter()
        .find_map(|m| columns.iter().find(|c| m.matches(c)))
        .map(String::as_str)
}

// ---------------------------------------------------------------------------
// Schema matchers
// ---------------------------------------------------------------------------

/// Matcher lists for every designated column the scorers look up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMatchers {
    pub identifier: Vec<ColumnMatcher>,
    pub producer_posted: Vec<ColumnMatcher>,
    pub consumer_applicable: Vec<ColumnMatcher>,
    pub consumer_posted: Vec<ColumnMatcher>,
    pub comparator_match: Vec<ColumnMatcher>,
    pub comparator_status: Vec<ColumnMatcher>,
    pub comparator_reason: Vec<ColumnMatcher>,
}

impl Default for SchemaMatchers {
    fn default() -> Self {
        let identifier = [
            "Tracking_ID_OR_Unique_Key",
            "Tracking_ID",
            "Unique_Key",
            "Invoice No.",
            "Invoice_No",
            "Invoice",
            "Tracking ID",
        ]
        .iter()
        .map(|n| ColumnMatcher::exact(n))
        .chain(std::iter::once(ColumnMatcher::ContainsAny(vec![
            "invoice".into(),
            "tracking".into(),
            "unique".into(),
        ])))
        .collect();

        Self {
            identifier,
            producer_posted: vec![ColumnMatcher::Prefix("posted_to_producer_topic".into())],
            consumer_applicable: vec![ColumnMatcher::Contains(
                "applicable_for_consumer_topic".into(),
            )],
            consumer_posted: vec![ColumnMatcher::Contains("posted_to_consumer_topic".into())],
            comparator_match: vec![ColumnMatcher::ContainsAll(vec![
                "expected".into(),
                "observed".into(),
                "match".into(),
            ])],
            comparator_status: vec![ColumnMatcher::ExactIgnoreCase("status".into())],
            comparator_reason: vec![
                ColumnMatcher::ExactIgnoreCase("reason".into()),
                ColumnMatcher::ExactIgnoreCase("details".into()),
                ColumnMatcher::ExactIgnoreCase("diff".into()),
            ],
        }
    }
}

/// Partial replacement of [`SchemaMatchers`] slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaOverrides {
    #[serde(default)]
    pub identifier: Option<Vec<ColumnMatcher>>,
    #[serde(default)]
    pub producer_posted: Option<Vec<ColumnMatcher>>,
    #[serde(default)]
    pub consumer_applicable: Option<Vec<ColumnMatcher>>,
    #[serde(default)]
    pub consumer_posted: Option<Vec<ColumnMatcher>>,
    #[serde(default)]
    pub comparator_match: Option<Vec<ColumnMatcher>>,
    #[serde(default)]
    pub comparator_status: Option<Vec<ColumnMatcher>>,
    #[serde(default)]
    pub comparator_reason: Option<Vec<ColumnMatcher>>,
}

impl SchemaOverrides {
    pub fn apply(&self, base: &SchemaMatchers) -> SchemaMatchers {
        let pick = |o: &Option<Vec<ColumnMatcher>>, b: &Vec<ColumnMatcher>| {
            o.clone().unwrap_or_else(|| b.clone())
        };
        SchemaMatchers {
            identifier: pick(&self.identifier, &base.identifier),
            producer_posted: pick(&self.producer_posted, &base.producer_posted),
            consumer_applicable: pick(&self.consumer_applicable, &base.consumer_applicable),
            consumer_posted: pick(&self.consumer_posted, &base.consumer_posted),
            comparator_match: pick(&self.comparator_match, &base.comparator_match),
            comparator_status: pick(&self.comparator_status, &base.comparator_status),
            comparator_reason: pick(&self.comparator_reason, &base.comparator_reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn matcher_semantics() {
        assert!(ColumnMatcher::exact("Invoice No.").matches(" Invoice No. "));
        assert!(!ColumnMatcher::exact("Invoice No.").matches("invoice no."));
        assert!(ColumnMatcher::ExactIgnoreCase("status".into()).matches("STATUS"));
        assert!(ColumnMatcher::Prefix("posted_to_producer_topic".into())
            .matches("Posted_To_Producer_Topic?"));
        assert!(ColumnMatcher::ContainsAll(vec!["expected".into(), "match".into()])
            .matches("Expected_vs_Observed_Match"));
        assert!(!ColumnMatcher::ContainsAny(vec!["invoice".into()]).matches("Status"));
    }

    #[test]
    fn matcher_order_beats_column_order() {
        let columns = cols(&["Status Detail", "Status"]);
        let matchers = vec![
            ColumnMatcher::ExactIgnoreCase("status".into()),
            ColumnMatcher::Contains("status".into()),
        ];
        assert_eq!(find_column(&matchers, &columns), Some("Status"));
    }

    #[test]
    fn contains_any_scans_columns_in_order() {
        let columns = cols(&["Unique_Ref", "Invoice_Number"]);
        let matchers = vec![ColumnMatcher::ContainsAny(vec!["invoice".into(), "unique".into()])];
        assert_eq!(find_column(&matchers, &columns), Some("Unique_Ref"));
    }

    #[test]
    fn overrides_replace_only_named_slots() {
        let toml_src = r#"
producer_posted = [{ match = "exact", value = "Published" }]
"#;
        let o: SchemaOverrides = toml::from_str(toml_src).unwrap();
        let merged = o.apply(&SchemaMatchers::default());
        assert_eq!(merged.producer_posted, vec![ColumnMatcher::exact("Published")]);
        assert_eq!(merged.identifier, SchemaMatchers::default().identifier);
    }

    #[test]
    fn contains_all_deserializes_from_list() {
        let o: SchemaOverrides = toml::from_str(
            r#"comparator_match = [{ match = "contains_all", value = ["exp", "obs"] }]"#,
        )
        .unwrap();
        assert_eq!(
            o.comparator_match.unwrap(),
            vec![ColumnMatcher::ContainsAll(vec!["exp".into(), "obs".into()])]
        );
    }
}
