//! Generic sheet-of-cells values exchanged with workbook and CSV bindings.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub(crate) const MS_PER_DAY: i64 = 86_400_000;

/// Which day-zero a workbook counts serial dates from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Epoch {
    /// Day zero is 1899-12-30 (the usual spreadsheet convention).
    #[default]
    Excel1900,
    /// Day zero is 1904-01-01 (older Mac workbooks).
    Excel1904,
}

impl Epoch {
    /// Unix milliseconds of serial day zero.
    #[must_use]
    pub const fn base_ms(self) -> i64 {
        match self {
            Self::Excel1900 => -2_209_161_600_000,
            Self::Excel1904 => -2_082_844_800_000,
        }
    }

    /// Correction applied to instant cells read from a workbook with this epoch.
    #[must_use]
    pub const fn instant_shift_ms(self) -> i64 {
        match self {
            Self::Excel1900 => 0,
            Self::Excel1904 => 1462 * MS_PER_DAY,
        }
    }
}

/// The value held by one cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
    Instant { instant: DateTime<Utc> },
}

impl CellValue {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Instant cell from Unix milliseconds; `None` when out of range.
    #[must_use]
    pub fn instant_ms(ms: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(ms)
            .single()
            .map(|instant| Self::Instant { instant })
    }

    /// True for null cells and empty text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.is_empty(),
            Self::Number(_) | Self::Instant { .. } => false,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Renders the value the way a CSV export would show it.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{n:.0}"),
            Self::Number(n) => n.to_string(),
            Self::Text(text) => text.clone(),
            Self::Instant { instant } => instant.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

/// One cell: a value plus an opaque style string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub style: String,
}

impl Cell {
    #[must_use]
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            style: String::new(),
        }
    }
}

impl From<CellValue> for Cell {
    fn from(value: CellValue) -> Self {
        Self::new(value)
    }
}

/// One named sheet. Row 0 is the header row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    #[serde(default)]
    pub cells: Vec<Vec<Cell>>,
    #[serde(default)]
    pub number_formats: Vec<String>,
}

impl Sheet {
    /// Builds a sheet from plain values.
    #[must_use]
    pub fn from_values(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            cells: rows
                .into_iter()
                .map(|row| row.into_iter().map(Cell::new).collect())
                .collect(),
            number_formats: Vec::new(),
        }
    }

    /// Header texts with trailing blank cells removed.
    ///
    /// Returns `None` when a non-trailing header cell is not text.
    #[must_use]
    pub fn headers(&self) -> Option<Vec<&str>> {
        let row = self.cells.first()?;
        let len = row
            .iter()
            .rposition(|cell| !cell.value.is_blank())
            .map_or(0, |i| i + 1);
        row[..len].iter().map(|cell| cell.value.as_text()).collect()
    }

    /// True when the header row is exactly `expected`.
    #[must_use]
    pub fn header_matches(&self, expected: &[String]) -> bool {
        self.headers().is_some_and(|headers| {
            headers.len() == expected.len() && headers.iter().zip(expected).all(|(a, b)| a == b)
        })
    }

    /// Data rows (everything after the header).
    pub fn data_rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.iter().skip(1).map(Vec::as_slice)
    }
}

/// An ordered collection of sheets plus workbook metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spreadsheet {
    pub sheets: Vec<Sheet>,
    #[serde(default)]
    pub epoch: Epoch,
}

impl Spreadsheet {
    #[must_use]
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self {
            sheets,
            epoch: Epoch::default(),
        }
    }

    #[must_use]
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    /// A sheet name not yet used in this workbook, derived from `preferred`.
    #[must_use]
    pub fn unused_name(&self, preferred: &str) -> String {
        if self.sheet(preferred).is_none() {
            return preferred.to_string();
        }
        (2..)
            .map(|n| format!("{preferred} ({n})"))
            .find(|name| self.sheet(name).is_none())
            .unwrap_or_else(|| preferred.to_string())
    }
}
