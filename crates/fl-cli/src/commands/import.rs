//! Import command for reading CSV exports into the `SQLite` store.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use fl_core::{ImportSummary, Importer, Locale, Normalizer};
use fl_db::Database;

use crate::encoding::decode;

/// Imports `path` in one unit of work.
///
/// Nothing is written unless the whole file imports successfully.
pub fn run<W: Write>(writer: &mut W, db: &mut Database, path: &Path, locale: Locale) -> Result<ImportSummary> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let (text, encoding) = decode(&bytes);
    tracing::debug!(?encoding, bytes = bytes.len(), "decoded input");

    let source_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let importer = Importer::new(Normalizer::new(locale));
    let mut work = db.working_copy().context("failed to open database transaction")?;
    let summary = importer
        .import(&mut work, &text, &source_name)
        .with_context(|| format!("failed to import {}", path.display()))?;
    work.commit().context("failed to save imported data")?;

    writeln!(
        writer,
        "Imported {} events for {} cars ({} format)",
        summary.events, summary.cars, summary.dialect
    )?;
    if summary.baseline > 0 {
        writeln!(
            writer,
            "Skipped {} records before the first full fill-up",
            summary.baseline
        )?;
    }
    if summary.skipped > 0 {
        writeln!(writer, "Skipped {} incomplete records", summary.skipped)?;
    }
    Ok(summary)
}
