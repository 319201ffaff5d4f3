//! Lists the registered formats.

use std::io::Write;

use anyhow::Result;

use sd_core::{RecordField, Registry, Status};

pub fn run<W: Write>(writer: &mut W, registry: &Registry) -> Result<()> {
    for format in registry.formats() {
        let descriptor = format.descriptor();
        writeln!(
            writer,
            "{} ({}, .{})",
            descriptor.name, descriptor.title, descriptor.extension
        )?;
        let statuses: Vec<_> = descriptor.statuses.iter().map(Status::as_str).collect();
        writeln!(writer, "  statuses: {}", statuses.join(", "))?;
        if !descriptor.lossy_fields.is_empty() {
            let lossy: Vec<_> = descriptor.lossy_fields.iter().map(RecordField::as_str).collect();
            writeln!(writer, "  loses: {}", lossy.join(", "))?;
        }
    }
    Ok(())
}
