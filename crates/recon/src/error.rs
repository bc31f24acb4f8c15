use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML / JSON parse or deserialization error.
    ConfigParse(String),
    /// Config validation error (no sources, duplicate keys, bad base, etc.).
    ConfigValidation(String),
    /// A referenced source key does not exist.
    UnknownSource(String),
    /// The base dataset could not be loaded at all.
    BaseUnreadable { source: String, error: String },
    /// The base dataset has no column the identifier resolver can select.
    BaseIdentifierMissing { source: String, columns: Vec<String> },
    /// Dataset text could not be parsed.
    Parse { source: String, message: String },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownSource(key) => write!(f, "unknown source: {key}"),
            Self::BaseUnreadable { source, error } => {
                write!(f, "base source '{source}' could not be loaded: {error}")
            }
            Self::BaseIdentifierMissing { source, columns } => {
                write!(
                    f,
                    "base source '{source}': no identifier column among [{}]",
                    columns.join(", ")
                )
            }
            Self::Parse { source, message } => {
                write!(f, "source '{source}': cannot parse data: {message}")
            }
        }
    }
}

impl std::error::Error for ReconError {}
