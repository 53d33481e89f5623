//! Writing reports to disk and handing them to the platform.
//!
//! Files are written to a temporary sibling, synced, then renamed over the
//! target so a reader never sees a partial report.

use crate::{Error, Result, TakenRow};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A row in the CSV history export
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Amount")]
    amount: &'a str,
    #[serde(rename = "Times")]
    times: &'a str,
    #[serde(rename = "Period")]
    period: &'a str,
    #[serde(rename = "Time Taken")]
    time_taken: &'a str,
    #[serde(rename = "Date")]
    date: &'a str,
    #[serde(rename = "Status")]
    status: &'a str,
}

impl<'a> From<&'a TakenRow> for CsvRow<'a> {
    fn from(row: &'a TakenRow) -> Self {
        CsvRow {
            name: &row.name,
            amount: &row.amount,
            times: &row.times,
            period: &row.period,
            time_taken: &row.time_taken,
            date: &row.date,
            status: &row.status,
        }
    }
}

/// Atomically write `contents` to `path`, returning the written path
pub fn export_document(contents: &str, path: &Path) -> Result<PathBuf> {
    write_atomically(path, |file| {
        file.write_all(contents.as_bytes())?;
        Ok(())
    })?;
    tracing::info!("Exported document to {:?}", path);
    Ok(path.to_path_buf())
}

/// Write the taken-dose history as CSV with a header row
///
/// Returns the number of rows written.
pub fn write_history_csv(rows: &[TakenRow], path: &Path) -> Result<usize> {
    write_atomically(path, |file| {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);
        for row in rows {
            writer.serialize(CsvRow::from(row))?;
        }
        writer.flush()?;
        Ok(())
    })?;

    tracing::info!("Wrote {} history rows to {:?}", rows.len(), path);
    Ok(rows.len())
}

/// Open an exported file with the platform's default handler
pub fn share(path: &Path) -> Result<()> {
    open::that(path)?;
    tracing::info!("Handed {:?} to the platform opener", path);
    Ok(())
}

fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut std::fs::File) -> Result<()>,
{
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    write(temp.as_file_mut())?;
    temp.as_file().sync_all()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
