use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ScrapeError;
use crate::record::ProductRecord;

/// Append-only accumulator, flushed to disk once at the end of a run.
#[derive(Debug, Default)]
pub struct RecordSink {
    records: Vec<ProductRecord>,
}

impl RecordSink {
    pub fn push(&mut self, record: ProductRecord) {
        self.records.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[cfg(test)]
    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    /// Write every record as CSV. The file is written beside `path` and
    /// renamed into place, so a failure never leaves a half-written target.
    pub fn flush(self, path: &Path) -> Result<usize, ScrapeError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = temp_path(path);

        let written = write_csv(&tmp, &self.records).and_then(|n| {
            fs::rename(&tmp, path)?;
            Ok(n)
        });
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        let n = written?;
        info!(rows = n, path = %path.display(), "output flushed");
        Ok(n)
    }
}

fn write_csv(path: &Path, records: &[ProductRecord]) -> Result<usize, ScrapeError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(ProductRecord::header())?;
    for record in records {
        wtr.write_record(record.to_row())?;
    }
    wtr.flush()?;
    Ok(records.len())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}
