use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::request::Record;
use crate::{Error, Result};

/// CSV files under one output directory, one file per target and kind.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn submissions_path(&self, target: &str) -> PathBuf {
        self.dir.join(format!("{target}_submissions.csv"))
    }

    pub fn comments_path(&self, target: &str) -> PathBuf {
        self.dir.join(format!("{target}_comments.csv"))
    }

    pub fn batch_path(&self, target: &str, index: usize) -> PathBuf {
        self.dir.join(format!("{target}_comments_{index}.csv"))
    }

    /// Overwrites `path` with `records`.
    ///
    /// The header is taken from the keys of the first record. Cells for keys a later record
    /// lacks are left empty and keys the first record lacks are dropped.
    pub fn write_records(&self, path: &Path, records: &[Record]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut wtr = csv::Writer::from_path(path)?;

        if let Some(first) = records.first() {
            let header: Vec<&str> = first.keys().map(String::as_str).collect();
            wtr.write_record(&header)?;
            for record in records {
                wtr.write_record(header.iter().map(|key| cell(record.get(*key))))?;
            }
        }
        wtr.flush()?;
        debug!(path = %path.display(), rows = records.len(), "wrote records");
        Ok(())
    }

    /// Reads the `id` column of a file written by `write_records`, in row order.
    pub fn read_ids(&self, path: &Path) -> Result<Vec<String>> {
        let mut rdr = csv::Reader::from_path(path)?;
        let headers = rdr.headers()?;
        // An empty record set is persisted as an empty file.
        if headers.is_empty() {
            return Ok(Vec::new());
        }
        let id_col = headers
            .iter()
            .position(|h| h == "id")
            .ok_or_else(|| Error::MissingIdColumn(path.to_path_buf()))?;

        let mut ids = Vec::new();
        for row in rdr.records() {
            let row = row?;
            if let Some(id) = row.get(id_col) {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
