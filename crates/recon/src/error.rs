use std::fmt;

#[derive(Debug)]
pub enum CompareError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (negative threshold, duplicate source, etc.).
    ConfigValidation(String),
    /// A rule-set regex failed to compile.
    InvalidPattern {
        field: &'static str,
        pattern: String,
        message: String,
    },
    /// Missing required column in a source's CSV data.
    MissingColumn { source: String, column: String },
    /// Structural CSV error (bad quoting, unreadable header, etc.).
    Csv { source: String, message: String },
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InvalidPattern { field, pattern, message } => {
                write!(f, "{field}: invalid pattern '{pattern}': {message}")
            }
            Self::MissingColumn { source, column } => {
                write!(f, "source '{source}': missing column '{column}'")
            }
            Self::Csv { source, message } => write!(f, "source '{source}': CSV error: {message}"),
        }
    }
}

impl std::error::Error for CompareError {}
