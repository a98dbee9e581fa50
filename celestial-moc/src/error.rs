use thiserror::Error;

pub type MocResult<T> = Result<T, MocError>;

#[derive(Debug, Error)]
pub enum MocError {
    #[error("Invalid MOC FITS format: {0}")]
    InvalidFormat(String),

    #[error("Keyword {keyword} not found")]
    KeywordNotFound { keyword: String },

    #[error("Invalid keyword value: {keyword} = {value}")]
    InvalidKeywordValue { keyword: String, value: String },

    #[error("Invalid HEALPix cell: {message}")]
    InvalidCell { message: String },

    #[error("EOF reached unexpectedly")]
    UnexpectedEof,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MocError {
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat(message.into())
    }

    pub fn keyword_not_found(keyword: impl Into<String>) -> Self {
        Self::KeywordNotFound {
            keyword: keyword.into(),
        }
    }

    pub fn invalid_keyword_value(keyword: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidKeywordValue {
            keyword: keyword.into(),
            value: value.into(),
        }
    }

    pub fn invalid_cell(message: impl Into<String>) -> Self {
        Self::InvalidCell {
            message: message.into(),
        }
    }
}
