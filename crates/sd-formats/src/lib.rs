//! Reference diary formats.
//!
//! - `ActivityLog`: raw activity intervals, segmented into sleep on conversion
//! - `SpreadsheetTable`: one record per spreadsheet row

pub mod activity_log;
pub mod spreadsheet_table;
mod workbook;

pub use activity_log::{ActivityLog, ActivityLogFormat, ActivityLogState};
pub use spreadsheet_table::{SpreadsheetTable, SpreadsheetTableFormat, TableRow};

use sd_core::{Registry, RegistryError};

/// The pivot plus every reference format, in detection order.
pub fn default_registry() -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    registry
        .register(SpreadsheetTableFormat)?
        .register(ActivityLogFormat)?;
    Ok(registry)
}
