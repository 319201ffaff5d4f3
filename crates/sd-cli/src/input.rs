//! Reading diary files and rendering converted diaries.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use sd_core::delimited::sheet_to_csv;
use sd_core::{Diary, Registry, Source, Spreadsheet};
use sd_formats::ActivityLog;

use crate::Config;
use crate::cli::OutputFormat;

/// Classifies file contents for the dispatcher.
///
/// A JSON workbook dump (`{"sheets": [...]}`) becomes a spreadsheet source.
/// Everything else, envelopes and URLs included, is passed on as text.
#[must_use]
pub fn classify(text: String) -> Source {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            if value.get("sheets").is_some() && value.get("file_format").is_none() {
                if let Ok(workbook) = serde_json::from_value::<Spreadsheet>(value) {
                    return Source::Spreadsheet(workbook);
                }
            }
        }
    }
    Source::Text(text)
}

/// Reads and parses one diary file, applying configured overrides.
pub fn load_diary(registry: &Registry, config: &Config, path: &Path) -> Result<Box<dyn Diary>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut diary = registry
        .parse(classify(text))
        .with_context(|| format!("failed to parse {}", path.display()))?;
    tracing::debug!(path = %path.display(), format = diary.format_name(), "loaded diary");

    if let (Some(ms), Some(log)) = (
        config.maximum_day_length_ms,
        diary.as_any_mut().downcast_mut::<ActivityLog>(),
    ) {
        log.set_maximum_day_length_ms(ms);
    }
    Ok(diary)
}

/// Renders `diary` in the requested output encoding, without a trailing newline.
pub fn render(diary: &dyn Diary, output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Json => {
            let json = diary.to_json()?;
            serde_json::to_string_pretty(&json).context("failed to serialize diary")
        }
        OutputFormat::Url => Ok(diary.to_url()?),
        OutputFormat::Csv => {
            let workbook = diary
                .to_spreadsheet()
                .with_context(|| format!("{} has no spreadsheet form", diary.format_name()))?;
            let blocks = workbook
                .sheets
                .iter()
                .map(sheet_to_csv)
                .collect::<Result<Vec<_>, _>>()?;
            let mut csv = blocks.join("\n");
            csv.truncate(csv.trim_end_matches('\n').len());
            Ok(csv)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_workbook_dump() {
        let dump = r#"{"sheets": [{"name": "Activities", "cells": [[{"value": "start"}, {"value": "end"}]]}]}"#;
        let Source::Spreadsheet(workbook) = classify(dump.to_string()) else {
            panic!("expected a spreadsheet source");
        };
        assert_eq!(workbook.sheets[0].headers().unwrap(), vec!["start", "end"]);
    }

    #[test]
    fn test_classify_leaves_envelopes_and_csv_as_text() {
        let envelope = r#"{"file_format": "Standard", "contents": {"sheets": []}}"#;
        assert!(matches!(classify(envelope.to_string()), Source::Text(_)));
        assert!(matches!(classify("start,end\n".to_string()), Source::Text(_)));
    }
}
