use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SurveyError>;

/// What kind of key a failed lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Survey,
    Instrument,
    SurveyCode,
    LimitingMagnitude,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Survey => "survey",
            Self::Instrument => "instrument",
            Self::SurveyCode => "survey code",
            Self::LimitingMagnitude => "limiting magnitude for",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid coverage filename '{filename}': {reason}")]
    Format { filename: String, reason: String },

    #[error("Unknown {kind} '{key}'")]
    Lookup { kind: LookupKind, key: String },

    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Failed to decode coverage file {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: celestial_moc::MocError,
    },

    #[error("Plot error: {0}")]
    Plot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SurveyError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn format(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            filename: filename.into(),
            reason: reason.into(),
        }
    }

    pub fn lookup(kind: LookupKind, key: impl Into<String>) -> Self {
        Self::Lookup {
            kind,
            key: key.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::InputValidation(message.into())
    }

    pub fn decode(path: impl Into<PathBuf>, source: celestial_moc::MocError) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }
}
