//! Reports which format recognises a file.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use sd_core::Registry;

use crate::Config;
use crate::input::load_diary;

pub fn run<W: Write>(writer: &mut W, registry: &Registry, config: &Config, path: &Path) -> Result<()> {
    let diary = load_diary(registry, config, path)?;
    writeln!(writer, "{}", diary.format_name())?;
    Ok(())
}
