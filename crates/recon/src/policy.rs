use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyVersion {
    V1,
    #[default]
    V2,
}

impl fmt::Display for PolicyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
        }
    }
}

impl std::str::FromStr for PolicyVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(Self::V1),
            "v2" => Ok(Self::V2),
            other => Err(format!("unknown policy version '{other}' (expected v1 or v2)")),
        }
    }
}

/// Outcome for a consumer row whose applicability flag is negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InapplicableOutcome {
    Fail,
    #[serde(rename = "na")]
    NotApplicable,
}

/// Explicit record of the rule choices the scorers make.
///
/// Echoed verbatim in run metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoringPolicy {
    pub version: PolicyVersion,
    pub consumer_inapplicable: InapplicableOutcome,
    /// Attach `column=<value>` to a non-Pass verdict that has no other reason.
    pub silent_failure_reasons: bool,
}

impl ScoringPolicy {
    pub fn for_version(version: PolicyVersion) -> Self {
        match version {
            PolicyVersion::V1 => Self {
                version,
                consumer_inapplicable: InapplicableOutcome::NotApplicable,
                silent_failure_reasons: false,
            },
            PolicyVersion::V2 => Self {
                version,
                consumer_inapplicable: InapplicableOutcome::Fail,
                silent_failure_reasons: false,
            },
        }
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self::for_version(PolicyVersion::default())
    }
}

/// `[policy]` table: a version baseline plus optional per-field overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyOverrides {
    #[serde(default)]
    pub version: Option<PolicyVersion>,
    #[serde(default)]
    pub consumer_inapplicable: Option<InapplicableOutcome>,
    #[serde(default)]
    pub silent_failure_reasons: Option<bool>,
}

impl PolicyOverrides {
    /// Resolve against `version`, which wins over the table's own `version`.
    pub fn resolve(&self, version: Option<PolicyVersion>) -> ScoringPolicy {
        let base = version.or(self.version).unwrap_or_default();
        let mut policy = ScoringPolicy::for_version(base);
        if let Some(outcome) = self.consumer_inapplicable {
            policy.consumer_inapplicable = outcome;
        }
        if let Some(flag) = self.silent_failure_reasons {
            policy.silent_failure_reasons = flag;
        }
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_strict_v2() {
        let p = ScoringPolicy::default();
        assert_eq!(p.version, PolicyVersion::V2);
        assert_eq!(p.consumer_inapplicable, InapplicableOutcome::Fail);
        assert!(!p.silent_failure_reasons);
    }

    #[test]
    fn v1_keeps_na_for_inapplicable_consumer() {
        let p = ScoringPolicy::for_version(PolicyVersion::V1);
        assert_eq!(p.consumer_inapplicable, InapplicableOutcome::NotApplicable);
    }

    #[test]
    fn silent_failure_reasons_are_opt_in_for_every_version() {
        for version in [PolicyVersion::V1, PolicyVersion::V2] {
            assert!(!ScoringPolicy::for_version(version).silent_failure_reasons);
        }
    }

    #[test]
    fn overrides_layer_on_version() {
        let o: PolicyOverrides = toml::from_str(
            r#"
version = "v1"
silent_failure_reasons = true
"#,
        )
        .unwrap();
        let p = o.resolve(None);
        assert_eq!(p.version, PolicyVersion::V1);
        assert_eq!(p.consumer_inapplicable, InapplicableOutcome::NotApplicable);
        assert!(p.silent_failure_reasons);

        let forced = o.resolve(Some(PolicyVersion::V2));
        assert_eq!(forced.consumer_inapplicable, InapplicableOutcome::Fail);
        assert!(forced.silent_failure_reasons);
    }

    #[test]
    fn serializes_for_metadata() {
        let json = serde_json::to_string(&ScoringPolicy::default()).unwrap();
        assert_eq!(
            json,
            r#"{"version":"v2","consumer_inapplicable":"fail","silent_failure_reasons":false}"#
        );
    }

    #[test]
    fn parse_version() {
        assert_eq!("V1".parse::<PolicyVersion>(), Ok(PolicyVersion::V1));
        assert!("v3".parse::<PolicyVersion>().is_err());
    }
}
