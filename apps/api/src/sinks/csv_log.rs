use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use super::log_row::{LogRow, JOB_ID_COLUMN, LOG_HEADERS};
use super::{ExternalLog, SinkError};

/// External log kept as a CSV file. File I/O runs on the blocking pool;
/// appends are serialized so the header is written exactly once.
pub struct CsvExternalLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvExternalLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_job_ids(path: &Path) -> Result<HashSet<String>, SinkError> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut ids = HashSet::new();
    for record in reader.records() {
        let record = record?;
        if let Some(id) = record.get(JOB_ID_COLUMN).filter(|id| !id.is_empty()) {
            ids.insert(id.to_string());
        }
    }
    Ok(ids)
}

fn write_rows(path: &Path, rows: &[LogRow]) -> Result<(), SinkError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_new {
        writer.write_record(LOG_HEADERS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[async_trait]
impl ExternalLog for CsvExternalLog {
    async fn job_ids(&self) -> Result<HashSet<String>, SinkError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_job_ids(&path))
            .await
            .map_err(|e| SinkError::Task(e.to_string()))?
    }

    async fn append_rows(&self, rows: &[LogRow]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        let owned = rows.to_vec();
        tokio::task::spawn_blocking(move || write_rows(&path, &owned))
            .await
            .map_err(|e| SinkError::Task(e.to_string()))??;
        info!("Appended {} row(s) to {}", rows.len(), self.path.display());
        Ok(())
    }
}
