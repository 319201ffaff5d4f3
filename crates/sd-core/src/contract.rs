//! The conversion contract every format plugin implements.
//!
//! A [`Format`] is the registered factory for one export format: it sniffs and
//! parses documents and builds its diary type from the pivot. A [`Diary`] is a
//! parsed instance. Any diary reaches any other format through
//! [`StandardDiary`], so no plugin needs to know about any other.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::{ConvertError, ParseError};
use crate::grid::Spreadsheet;
use crate::standard::StandardDiary;
use crate::types::{RecordField, Status};

/// Raw input handed to the dispatcher.
#[derive(Debug, Clone)]
pub enum Source {
    /// Plain text such as CSV.
    Text(String),
    /// Already-parsed JSON, usually an [`Envelope`].
    Json(Value),
    /// A workbook materialised by a spreadsheet binding.
    Spreadsheet(Spreadsheet),
}

impl Source {
    /// The envelope contents when this source is an envelope for `format`.
    #[must_use]
    pub fn envelope_contents(&self, format: &str) -> Option<&Value> {
        let Self::Json(Value::Object(object)) = self else {
            return None;
        };
        if object.get("file_format").and_then(Value::as_str) != Some(format) {
            return None;
        }
        object.get("contents")
    }

    /// Deserializes envelope contents for `format`.
    ///
    /// Not an envelope for `format` is recoverable; an envelope whose contents
    /// do not fit `T` is corrupt.
    pub fn parse_envelope<T: DeserializeOwned>(&self, format: &'static str) -> Result<T, ParseError> {
        let contents = self.envelope_contents(format).ok_or(ParseError::Recoverable)?;
        serde_json::from_value(contents.clone()).map_err(|e| ParseError::corrupt(format, e.to_string()))
    }
}

/// Static metadata describing one format.
#[derive(Debug)]
pub struct FormatDescriptor {
    /// Unique name, used as `file_format` in envelopes.
    pub name: &'static str,
    pub title: &'static str,
    /// Where the format is documented.
    pub url: &'static str,
    /// Usual file extension, without the dot.
    pub extension: &'static str,
    /// Statuses the format can hold.
    pub statuses: &'static [Status],
    /// Pivot fields lost when converting into this format.
    pub lossy_fields: &'static [RecordField],
}

impl FormatDescriptor {
    #[must_use]
    pub fn allows(&self, status: Status) -> bool {
        self.statuses.contains(&status)
    }

    #[must_use]
    pub fn loses(&self, field: RecordField) -> bool {
        self.lossy_fields.contains(&field)
    }
}

/// A registered format: parser plus factory.
pub trait Format: Send + Sync {
    fn descriptor(&self) -> &'static FormatDescriptor;

    /// Parses `source`, or explains why not.
    ///
    /// Return [`ParseError::Recoverable`] when the document is certainly not
    /// this format, [`ParseError::Corrupt`] when it carries this format's
    /// signature but fails validation.
    fn try_parse(&self, source: &Source) -> Result<Box<dyn Diary>, ParseError>;

    /// Builds a fresh diary of this format from the pivot.
    fn from_standard(&self, standard: &StandardDiary) -> Box<dyn Diary>;
}

/// A parsed diary.
pub trait Diary: fmt::Debug + Send + Sync {
    fn descriptor(&self) -> &'static FormatDescriptor;

    /// Converts to the pivot. Never fails.
    fn to_standard(&self) -> StandardDiary;

    /// Plugin state as JSON, without any cached workbook.
    fn contents(&self) -> Result<Value, serde_json::Error>;

    /// Adds the records of `other` to this diary, dropping duplicates.
    ///
    /// `other` is converted through the pivot first when it is a different
    /// format.
    fn merge(&mut self, other: &dyn Diary);

    /// Identity conversion: an independent copy.
    fn clone_diary(&self) -> Box<dyn Diary>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// The diary as a workbook, for formats with a spreadsheet form.
    fn to_spreadsheet(&self) -> Option<Spreadsheet> {
        None
    }

    fn format_name(&self) -> &'static str {
        self.descriptor().name
    }

    fn to_envelope(&self) -> Result<Envelope, ConvertError> {
        Ok(Envelope {
            file_format: self.descriptor().name.to_string(),
            contents: self.contents()?,
        })
    }

    fn to_json(&self) -> Result<Value, ConvertError> {
        Ok(self.to_envelope()?.into_value())
    }

    fn to_url(&self) -> Result<String, ConvertError> {
        self.to_envelope()?.to_url()
    }
}

/// Views `other` as a `T`, converting through the pivot when it is another format.
pub fn same_format<'a, T, F>(other: &'a dyn Diary, from_standard: F) -> Cow<'a, T>
where
    T: Clone + 'static,
    F: FnOnce(&StandardDiary) -> T,
{
    match other.as_any().downcast_ref::<T>() {
        Some(same) => Cow::Borrowed(same),
        None => Cow::Owned(from_standard(&other.to_standard())),
    }
}
