//! Installed formats, auto-detection and pivot routing.

use serde_json::Value;

use crate::contract::{Diary, Format, Source};
use crate::envelope::{Envelope, URL_PREFIX};
use crate::error::{ConvertError, DispatchError, ParseError, RegistryError};
use crate::standard::{STANDARD_NAME, StandardFormat};

/// Ordered list of installed formats.
///
/// Built once at startup and then shared read-only. Detection tries formats
/// in registration order.
pub struct Registry {
    formats: Vec<Box<dyn Format>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.formats.iter().map(|format| format.descriptor().name))
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry holding only the pivot format.
    #[must_use]
    pub fn new() -> Self {
        Self {
            formats: vec![Box::new(StandardFormat)],
        }
    }

    /// A registry with no formats at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Appends a format. Names must be unique.
    pub fn register(&mut self, format: impl Format + 'static) -> Result<&mut Self, RegistryError> {
        let name = format.descriptor().name;
        if self.get(name).is_some() {
            return Err(RegistryError::Duplicate(name));
        }
        self.formats.push(Box::new(format));
        Ok(self)
    }

    pub fn formats(&self) -> impl Iterator<Item = &(dyn Format + 'static)> {
        self.formats.iter().map(Box::as_ref)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&(dyn Format + 'static)> {
        self.formats().find(|format| format.descriptor().name == name)
    }

    /// Finds the first format that accepts `source`.
    ///
    /// A `sleep-diary=` URL or JSON text is decoded before any format sees it.
    /// Formats that decline are skipped. The first corrupt error stops the scan
    /// and is returned instead of trying later formats.
    pub fn parse(&self, source: Source) -> Result<Box<dyn Diary>, DispatchError> {
        let source = normalise(source)?;
        for format in self.formats() {
            let name = format.descriptor().name;
            match format.try_parse(&source) {
                Ok(diary) => {
                    tracing::debug!(format = name, "document recognised");
                    return Ok(diary);
                }
                Err(ParseError::Recoverable) => {
                    tracing::trace!(format = name, "format declined document");
                }
                Err(ParseError::Corrupt { format, message }) => {
                    tracing::warn!(format, %message, "corrupt document");
                    return Err(DispatchError::Corrupt { format, message });
                }
            }
        }
        Err(DispatchError::Unrecognized)
    }

    /// Convenience for [`Registry::parse`] on text input.
    pub fn parse_text(&self, text: impl Into<String>) -> Result<Box<dyn Diary>, DispatchError> {
        self.parse(Source::Text(text.into()))
    }

    /// Converts `diary` into the format called `target`.
    ///
    /// The same format gives a copy, `Standard` gives the pivot, and anything
    /// else is routed through the pivot.
    pub fn convert(&self, diary: &dyn Diary, target: &str) -> Result<Box<dyn Diary>, ConvertError> {
        let from = diary.format_name();
        if target == from {
            return Ok(diary.clone_diary());
        }
        if target == STANDARD_NAME {
            return Ok(Box::new(diary.to_standard()));
        }
        let format = self
            .get(target)
            .ok_or_else(|| ConvertError::UnsupportedConversion {
                from,
                to: target.to_string(),
            })?;
        tracing::debug!(from, to = target, "converting through the pivot");
        Ok(format.from_standard(&diary.to_standard()))
    }
}

/// Decodes the contract-level exchange forms.
fn normalise(source: Source) -> Result<Source, DispatchError> {
    let Source::Text(text) = source else {
        return Ok(source);
    };
    let trimmed = text.trim_start_matches('\u{feff}').trim();
    if trimmed.starts_with(URL_PREFIX) {
        let envelope = Envelope::from_url(trimmed).map_err(|e| DispatchError::Corrupt {
            format: "sleep-diary URL",
            message: e.to_string(),
        })?;
        return Ok(Source::Json(envelope.into_value()));
    }
    if trimmed.starts_with('{') {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
            return Ok(Source::Json(value));
        }
    }
    Ok(Source::Text(text))
}
