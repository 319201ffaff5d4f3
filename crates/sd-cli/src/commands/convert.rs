//! Converts one diary into another format.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use sd_core::Registry;

use crate::Config;
use crate::cli::OutputFormat;
use crate::input::{load_diary, render};

pub fn run<W: Write>(
    writer: &mut W,
    registry: &Registry,
    config: &Config,
    path: &Path,
    to: Option<&str>,
    output: OutputFormat,
) -> Result<()> {
    let diary = load_diary(registry, config, path)?;
    let target = to.unwrap_or(&config.default_format);
    let converted = registry.convert(diary.as_ref(), target)?;
    writeln!(writer, "{}", render(converted.as_ref(), output)?)?;
    Ok(())
}
