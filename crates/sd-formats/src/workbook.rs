//! Shared plumbing for formats stored as a workbook or as CSV text.

use std::borrow::Cow;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use sd_core::codec::{SpreadsheetCodec, State};
use sd_core::delimited::sheet_from_csv;
use sd_core::{ParseError, Source, Spreadsheet};

/// Parses `source` as the envelope, workbook or CSV form of `format`.
///
/// A workbook (or CSV text) without the codec's headers is not this format.
/// One with the headers whose rows fail to decode is corrupt.
pub(crate) fn parse_source<T: DeserializeOwned>(
    source: &Source,
    format: &'static str,
    codec: &SpreadsheetCodec,
) -> Result<(T, Option<Spreadsheet>), ParseError> {
    let workbook = match source {
        Source::Json(_) => return source.parse_envelope(format).map(|state| (state, None)),
        Source::Spreadsheet(workbook) => Cow::Borrowed(workbook),
        Source::Text(text) => {
            let sheet = sheet_from_csv(format, text).map_err(|_| ParseError::Recoverable)?;
            Cow::Owned(Spreadsheet::new(vec![sheet]))
        }
    };

    if !codec.recognises(&workbook) {
        return Err(ParseError::Recoverable);
    }
    let mut state = State::new();
    if !codec.load(&workbook, &mut state) {
        return Err(ParseError::corrupt(format, "sheet rows do not match the expected cells"));
    }
    let parsed = serde_json::from_value(Value::Object(state))
        .map_err(|e| ParseError::corrupt(format, e.to_string()))?;

    let cached = match source {
        Source::Spreadsheet(_) => Some(workbook.into_owned()),
        _ => None,
    };
    Ok((parsed, cached))
}

/// Writes `state` into a copy of `cached` (or a fresh workbook).
pub(crate) fn synchronise<T: Serialize>(
    codec: &SpreadsheetCodec,
    state: &T,
    cached: Option<&Spreadsheet>,
) -> Option<Spreadsheet> {
    let Ok(Value::Object(state)) = serde_json::to_value(state) else {
        return None;
    };
    let mut workbook = cached.cloned().unwrap_or_default();
    if codec.synchronise(&state, &mut workbook) {
        Some(workbook)
    } else {
        tracing::debug!("state does not fit the workbook cells");
        None
    }
}
