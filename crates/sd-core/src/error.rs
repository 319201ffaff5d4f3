//! Error types shared by the dispatcher, the contract and the grid boundary.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Outcome of a plugin failing to parse a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Not this plugin's format. The dispatcher moves on silently.
    #[error("document not recognised")]
    Recoverable,

    /// The plugin recognised its own signature but the content is invalid.
    #[error("{format}: {message}")]
    Corrupt {
        format: &'static str,
        message: String,
    },
}

impl ParseError {
    /// Builds a corrupt error for `format`.
    pub fn corrupt(format: &'static str, message: impl Into<String>) -> Self {
        Self::Corrupt {
            format,
            message: message.into(),
        }
    }

    /// Fails with a corrupt error when `end` precedes `start`.
    pub fn ensure_ordered(
        format: &'static str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), Self> {
        if end < start {
            return Err(Self::corrupt(
                format,
                format!("interval ends at {end} before it starts at {start}"),
            ));
        }
        Ok(())
    }
}

/// Failure of the dispatcher to find an owner for a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Every registered plugin declined the document.
    #[error("unrecognized document")]
    Unrecognized,

    /// A plugin claimed the document but rejected its content.
    #[error("corrupt {format} document: {message}")]
    Corrupt {
        format: &'static str,
        message: String,
    },
}

/// Errors raised while converting between formats.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("cannot convert {from} to unknown format {to}")]
    UnsupportedConversion { from: &'static str, to: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid diary URL: {0}")]
    Url(String),
}

/// Errors at the CSV boundary.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Errors raised while building a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("format {0} is already registered")]
    Duplicate(&'static str),
}
