//! Storage collaborators for the run logs.
//!
//! The engine never talks to a database directly. Logs are handed to a [`BulkAppend`]
//! implementation that clears a table and appends rows in fixed-size chunks.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::errors::Result;

/// Default number of rows per appended chunk.
pub const CHUNK_SIZE: usize = 5000;

/// A tabular store that can be bulk-replaced.
pub trait BulkAppend {
    /// Removes every row of `table`, creating it if needed.
    fn clear(&mut self, table: &str) -> Result<()>;

    /// Appends one chunk of rows to `table`.
    fn append(&mut self, table: &str, rows: Vec<Value>) -> Result<()>;

    /// Replaces the content of `table` with `rows`, `chunk_size` rows at a time.
    fn replace<R: Serialize>(&mut self, table: &str, rows: &[R], chunk_size: usize) -> Result<()>
    where
        Self: Sized,
    {
        self.clear(table)?;
        for chunk in rows.chunks(chunk_size.max(1)) {
            let values = chunk
                .iter()
                .map(serde_json::to_value)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            self.append(table, values)?;
        }
        Ok(())
    }
}

/// In-memory store, mostly useful to inspect what a run would persist.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Vec<Value>>,
    chunks: BTreeMap<String, Vec<usize>>,
}

impl MemoryStore {
    /// Returns the rows of `table`, empty if it does not exist.
    pub fn table(&self, table: &str) -> &[Value] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the size of each chunk appended to `table` since it was last cleared.
    pub fn chunks(&self, table: &str) -> &[usize] {
        self.chunks.get(table).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the names of the known tables.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl BulkAppend for MemoryStore {
    fn clear(&mut self, table: &str) -> Result<()> {
        self.tables.insert(table.to_owned(), Vec::new());
        self.chunks.insert(table.to_owned(), Vec::new());
        Ok(())
    }

    fn append(&mut self, table: &str, mut rows: Vec<Value>) -> Result<()> {
        self.chunks.entry(table.to_owned()).or_default().push(rows.len());
        self.tables.entry(table.to_owned()).or_default().append(&mut rows);
        Ok(())
    }
}

/// Store writing one JSON-lines file per table in a directory.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Opens a store in `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Returns the file backing `table`.
    pub fn path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.jsonl"))
    }

    /// Reads back every row of `table`.
    pub fn read(&self, table: &str) -> Result<Vec<Value>> {
        let reader = BufReader::new(File::open(self.path(table))?);
        let mut rows = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.is_empty() {
                rows.push(serde_json::from_str(&line)?);
            }
        }
        Ok(rows)
    }
}

impl BulkAppend for JsonStore {
    fn clear(&mut self, table: &str) -> Result<()> {
        File::create(self.path(table))?;
        Ok(())
    }

    fn append(&mut self, table: &str, rows: Vec<Value>) -> Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(self.path(table))?;
        let mut writer = BufWriter::new(file);
        for row in &rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}
