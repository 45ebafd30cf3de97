//! Run configuration.
//!
//! The broker never reads it: callers pass the window bounds to [`Broker::reset`](crate::engine::Broker::reset).

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::Bar;
use crate::errors::Result;
use crate::store::CHUNK_SIZE;
use crate::utils::get_data_from_file;

/// Settings of a run, usually read from a JSON file.
///
/// ### Example
/// ```json
/// {
///   "data": "data/rb_1h.json",
///   "start_time": "2023-05-11 09:00:00",
///   "end_time": "2023-06-30 15:00:00",
///   "output": "out",
///   "log_level": "info"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// JSON file holding the bar series.
    pub data: PathBuf,
    /// Timestamp the trading window starts after.
    pub start_time: String,
    /// Last timestamp of the trading window.
    pub end_time: String,
    /// Directory of the result tables.
    pub output: PathBuf,
    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,
    /// Rows per bulk-append chunk.
    pub chunk_size: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("bars.json"),
            start_time: String::new(),
            end_time: String::new(),
            output: PathBuf::from("output"),
            log_level: String::from("info"),
            chunk_size: CHUNK_SIZE,
        }
    }
}

impl RunConfig {
    /// Reads a configuration file, missing keys take their default value.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Loads the bar series named by `data`.
    pub fn load_bars(&self) -> Result<Arc<[Bar]>> {
        Ok(get_data_from_file(&self.data)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config: RunConfig = serde_json::from_str(r#"{"start_time": "2023-01-01 00:00:00"}"#).unwrap();
        assert_eq!(config.start_time, "2023-01-01 00:00:00");
        assert_eq!(config.chunk_size, 5000);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn from_file_and_load_bars() {
        let dir = tempfile::tempdir().unwrap();
        let bars = dir.path().join("bars.json");
        std::fs::write(
            &bars,
            r#"[{"idx": 0, "datetime": "2023-01-01 00:00:00", "open_price": 1.0, "high_price": 2.0, "low_price": 0.5, "close_price": 1.5}]"#,
        )
        .unwrap();

        let mut file = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
        write!(
            file,
            r#"{{"data": {:?}, "start_time": "a", "end_time": "b", "chunk_size": 10}}"#,
            bars.to_string_lossy()
        )
        .unwrap();

        let config = RunConfig::from_file(file.path()).unwrap();
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.end_time, "b");

        let bars = config.load_bars().unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].high(), 2.0);
    }
}
