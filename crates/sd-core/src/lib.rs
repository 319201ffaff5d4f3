//! Core of the sleep diary converter.
//!
//! This crate contains the format-independent machinery:
//! - Cell grid: the in-memory workbook every spreadsheet format works on
//! - Spreadsheet codec: declarative sheet rules that load and save plugin state
//! - Activity segmenter: turning activity streams into awake/asleep records
//! - Registry: auto-detection and conversion through the Standard pivot format

pub mod codec;
pub mod contract;
pub mod delimited;
pub mod envelope;
pub mod error;
pub mod grid;
pub mod registry;
pub mod segmenter;
pub mod standard;
pub mod time_cell;
pub mod types;

pub use codec::{CellKind, CellRule, SheetRule, SpreadsheetCodec, State};
pub use contract::{Diary, Format, FormatDescriptor, Source, same_format};
pub use envelope::Envelope;
pub use error::{ConvertError, DispatchError, GridError, ParseError, RegistryError};
pub use grid::{Cell, CellValue, Epoch, Sheet, Spreadsheet};
pub use registry::Registry;
pub use segmenter::{SegmenterConfig, coalesce, segment};
pub use standard::{STANDARD_NAME, StandardDiary, StandardFormat};
pub use types::{Activity, Comment, DerivedFields, Record, RecordField, Status};
