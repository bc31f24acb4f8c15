use std::fmt;

/// Storage and serialization failures.
#[derive(Debug)]
pub enum IoError {
    /// The locator names nothing (missing local file, 404 from storage).
    NotFound(String),
    /// The locator could not be parsed.
    InvalidLocator(String),
    Read { locator: String, message: String },
    Write { locator: String, message: String },
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(locator) => write!(f, "not found: {locator}"),
            Self::InvalidLocator(msg) => write!(f, "invalid locator: {msg}"),
            Self::Read { locator, message } => write!(f, "cannot read {locator}: {message}"),
            Self::Write { locator, message } => write!(f, "cannot write {locator}: {message}"),
        }
    }
}

impl std::error::Error for IoError {}

/// Why a dataset could not be produced.
#[derive(Debug)]
pub enum LoadError {
    NotFound(String),
    Unreadable { locator: String, message: String },
}

impl LoadError {
    pub fn unreadable(locator: &str, message: impl Into<String>) -> Self {
        Self::Unreadable {
            locator: locator.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(locator) => write!(f, "file not found: {locator}"),
            Self::Unreadable { locator, message } => write!(f, "unreadable {locator}: {message}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<IoError> for LoadError {
    fn from(e: IoError) -> Self {
        match e {
            IoError::NotFound(locator) => Self::NotFound(locator),
            IoError::InvalidLocator(msg) => Self::Unreadable {
                locator: msg.clone(),
                message: "invalid locator".into(),
            },
            IoError::Read { locator, message } | IoError::Write { locator, message } => {
                Self::Unreadable { locator, message }
            }
        }
    }
}
