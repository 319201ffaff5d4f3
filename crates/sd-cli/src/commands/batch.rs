//! Converts many files in parallel.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;

use sd_core::Registry;

use crate::Config;
use crate::cli::OutputFormat;
use crate::input::{load_diary, render};

/// Converts every file to `to`, writing `<stem>.<to>.json` next to the input
/// or into `out_dir`.
///
/// Files are independent: one failure does not stop the others. The command
/// fails at the end if any file failed.
pub fn run<W: Write>(
    writer: &mut W,
    registry: &Registry,
    config: &Config,
    files: &[PathBuf],
    to: &str,
    out_dir: Option<&Path>,
) -> Result<()> {
    let results: Vec<(&PathBuf, Result<PathBuf>)> = files
        .par_iter()
        .map(|path| (path, convert_file(registry, config, path, to, out_dir)))
        .collect();

    let mut failed = 0;
    for (path, result) in &results {
        match result {
            Ok(written) => writeln!(writer, "{} -> {}", path.display(), written.display())?,
            Err(e) => {
                failed += 1;
                tracing::warn!(path = %path.display(), error = %e, "conversion failed");
                writeln!(writer, "{}: {e:#}", path.display())?;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} files failed to convert", results.len());
    }
    Ok(())
}

fn convert_file(
    registry: &Registry,
    config: &Config,
    path: &Path,
    to: &str,
    out_dir: Option<&Path>,
) -> Result<PathBuf> {
    let diary = load_diary(registry, config, path)?;
    let converted = registry.convert(diary.as_ref(), to)?;
    let rendered = render(converted.as_ref(), OutputFormat::Json)?;

    let stem = path
        .file_stem()
        .with_context(|| format!("{} has no file name", path.display()))?;
    let dir = out_dir.or_else(|| path.parent()).unwrap_or_else(|| Path::new("."));
    let target = dir.join(format!("{}.{to}.json", stem.to_string_lossy()));
    std::fs::write(&target, rendered)
        .with_context(|| format!("failed to write {}", target.display()))?;
    Ok(target)
}
