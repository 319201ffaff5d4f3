//! Merges several diaries into the first one's format.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use sd_core::Registry;

use crate::Config;
use crate::cli::OutputFormat;
use crate::input::{load_diary, render};

pub fn run<W: Write>(
    writer: &mut W,
    registry: &Registry,
    config: &Config,
    files: &[PathBuf],
    output: OutputFormat,
) -> Result<()> {
    let (first, rest) = files.split_first().context("no files to merge")?;
    let mut merged = load_diary(registry, config, first)?;
    for path in rest {
        let other = load_diary(registry, config, path)?;
        tracing::debug!(
            into = merged.format_name(),
            from = other.format_name(),
            "merging diary"
        );
        merged.merge(other.as_ref());
    }
    writeln!(writer, "{}", render(merged.as_ref(), output)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_dedups_overlapping_tables() {
        let temp = tempfile::tempdir().unwrap();
        let a = temp.path().join("a.csv");
        let b = temp.path().join("b.csv");
        std::fs::write(
            &a,
            "status,start,end,tags,comments\nasleep,2024-01-01T23:00:00Z,2024-01-02T07:00:00Z,,\n",
        )
        .unwrap();
        std::fs::write(
            &b,
            "status,start,end,tags,comments\n\
             asleep,2024-01-01T23:00:00Z,2024-01-02T07:00:00Z,,\n\
             meal,2024-01-02T08:00:00Z,2024-01-02T08:00:00Z,,\n",
        )
        .unwrap();

        let registry = sd_formats::default_registry().unwrap();
        let mut out = Vec::new();
        run(&mut out, &registry, &Config::default(), &[a, b], OutputFormat::Json).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["file_format"], "SpreadsheetTable");
        assert_eq!(value["contents"]["records"].as_array().unwrap().len(), 2);
    }
}
