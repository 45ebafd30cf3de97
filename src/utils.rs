use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::engine::{Bar, RawBar};
use crate::errors::{Error, Result};

// [
//   {"index": 0, "datetime": "2023-05-11 09:00:00", "open": 3850.2, "high": 3861.0, "low": 3844.8, "close": 3858.6},
//   ...
// ]

/// Reads bars from a JSON array in `filepath`.
///
/// Bars are returned in file order, they are expected to be sorted by timestamp.
/// Every row is validated like a built bar; a row without index gets its position in the file.
pub fn get_data_from_file(filepath: impl AsRef<Path>) -> Result<Vec<Bar>> {
    let file = File::open(filepath.as_ref())?;
    let reader = BufReader::new(file);
    let rows: Vec<RawBar> = serde_json::from_reader(reader).map_err(Error::from)?;
    let bars = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| row.build(i))
        .collect::<Result<Vec<_>>>()?;

    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        tracing::info!(
            size = bars.len(),
            start = first.datetime(),
            end = last.datetime(),
            "bar data loaded"
        );
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_bars() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"index": 0, "datetime": "2023-05-11 09:00:00", "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5}},
                {{"index": 1, "datetime": "2023-05-11 10:00:00", "open": 1.5, "high": 2.5, "low": 1.0, "close": 2.0}}
            ]"#
        )
        .unwrap();

        let bars = get_data_from_file(file.path()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].datetime(), "2023-05-11 10:00:00");
        assert_eq!(bars[1].close(), 2.0);
    }

    #[test]
    fn missing_index_takes_file_position() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"datetime": "2023-01-01 00:00:00", "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5}},
                {{"datetime": "2023-01-01 01:00:00", "open": 1.5, "high": 2.5, "low": 1.0, "close": 2.0}}
            ]"#
        )
        .unwrap();

        let bars = get_data_from_file(file.path()).unwrap();
        assert_eq!(bars[0].index(), 0);
        assert_eq!(bars[1].index(), 1);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"datetime": "2023-01-01 00:00:00", "open": 1.0, "high": 0.5, "low": 2.0, "close": 1.5}}]"#
        )
        .unwrap();

        assert!(matches!(get_data_from_file(file.path()), Err(Error::InvalidBar(_))));
    }

    #[test]
    fn missing_file() {
        let result = get_data_from_file("does/not/exist.json");
        assert!(matches!(result, Err(Error::IoError(_))));
    }

    #[test]
    fn malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[{{\"index\": 0}}]").unwrap();
        assert!(matches!(get_data_from_file(file.path()), Err(Error::JsonError(_))));
    }
}
