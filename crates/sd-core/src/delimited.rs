//! CSV boundary: text to a single sheet and back.

use std::borrow::Cow;

use crate::error::GridError;
use crate::grid::{Cell, CellValue, Sheet};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Parses RFC 4180 style CSV into a sheet of text cells.
///
/// A leading byte-order mark is stripped and a trailing newline is enforced.
/// Empty fields become null cells. Rows may have differing lengths.
pub fn sheet_from_csv(name: &str, text: &str) -> Result<Sheet, GridError> {
    let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
    let text: Cow<'_, str> = if text.ends_with('\n') {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{text}\n"))
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut cells = Vec::new();
    for record in reader.records() {
        let record = record?;
        cells.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::new(CellValue::Null)
                    } else {
                        Cell::new(CellValue::text(field))
                    }
                })
                .collect(),
        );
    }

    Ok(Sheet {
        name: name.to_string(),
        cells,
        number_formats: Vec::new(),
    })
}

/// Renders a sheet as CSV, quoting only where needed.
pub fn sheet_to_csv(sheet: &Sheet) -> Result<String, GridError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in &sheet.cells {
        writer.write_record(row.iter().map(|cell| cell.value.display()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_fields_with_commas_and_newlines() {
        let sheet = sheet_from_csv("s", "a,b\n\"x, y\",\"line1\nline2\"\n\"he said \"\"hi\"\"\",").unwrap();
        assert_eq!(sheet.cells.len(), 3);
        assert_eq!(sheet.cells[1][0].value, CellValue::text("x, y"));
        assert_eq!(sheet.cells[1][1].value, CellValue::text("line1\nline2"));
        assert_eq!(sheet.cells[2][0].value, CellValue::text("he said \"hi\""));
        assert_eq!(sheet.cells[2][1].value, CellValue::Null);
    }

    #[test]
    fn strips_byte_order_mark() {
        let sheet = sheet_from_csv("s", "\u{feff}start,end\n1,2").unwrap();
        assert_eq!(sheet.headers().unwrap(), vec!["start", "end"]);
    }

    #[test]
    fn missing_trailing_newline_keeps_last_row() {
        let sheet = sheet_from_csv("s", "a\n1\n2").unwrap();
        assert_eq!(sheet.cells.len(), 3);
        assert_eq!(sheet.cells[2][0].value, CellValue::text("2"));
    }

    #[test]
    fn writes_quoted_csv() {
        let sheet = Sheet::from_values(
            "s",
            vec![
                vec![CellValue::text("a"), CellValue::text("b")],
                vec![CellValue::text("x, y"), CellValue::Number(4.0)],
            ],
        );
        assert_eq!(sheet_to_csv(&sheet).unwrap(), "a,b\n\"x, y\",4\n");
    }
}
