use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A handler rejected a line of kernel text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value {value:?} for field `{field}`")]
    InvalidNumber { field: &'static str, value: String },

    #[error("expected key `{expected}`, found {found:?}")]
    UnexpectedKey {
        expected: &'static str,
        found: String,
    },

    #[error("expected at least {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
}

/// Why a source could not be sampled this cycle. Never fatal to the engine.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{} is not available", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed line {line} in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error("{} ended before `{what}` was found", path.display())]
    Incomplete { path: PathBuf, what: &'static str },
}

impl SourceError {
    pub(crate) fn from_io(path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            SourceError::Missing { path }
        } else {
            SourceError::Io { path, source }
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, SourceError::Missing { .. })
    }
}

/// Parse one whitespace-delimited numeric field.
pub(crate) fn parse_field<T: std::str::FromStr>(
    field: &'static str,
    value: Option<&str>,
) -> Result<T, ParseError> {
    let value = value.ok_or(ParseError::MissingField(field))?;
    value.parse().map_err(|_| ParseError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}
