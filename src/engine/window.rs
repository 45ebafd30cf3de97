use crate::engine::Bar;
use crate::errors::{Error, Result};

/// Inclusive range of bar indices a run trades over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: usize,
    end: usize,
}

impl Window {
    /// Resolves `[start_time, end_time)` to an inclusive index range over `bars`.
    ///
    /// `bars` must be sorted by timestamp; timestamps are compared lexically.
    ///
    /// - `start` is the first bar strictly after `start_time`. If a bar past `end_time`
    ///   shows up first, `start` is the bar before it.
    /// - `end` is the bar before the first one past `end_time`, or the first bar equal
    ///   to `end_time`. When neither exists it defaults to the last bar with a warning.
    ///
    /// ### Returns
    /// The window, or [`Error::InvalidWindow`] when the range is empty or inverted.
    pub fn resolve(bars: &[Bar], start_time: &str, end_time: &str) -> Result<Self> {
        let invalid = || Error::InvalidWindow {
            start_time: start_time.to_owned(),
            end_time: end_time.to_owned(),
        };

        let (first, last) = match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(Error::BarDataEmpty),
        };

        let mut start = 0;
        for (i, bar) in bars.iter().enumerate() {
            if start_time < bar.datetime() {
                start = i;
                break;
            } else if end_time < bar.datetime() {
                start = i.checked_sub(1).ok_or_else(invalid)?;
                break;
            }
        }

        let mut end = None;
        for (i, bar) in bars.iter().enumerate() {
            if end_time < bar.datetime() {
                end = Some(i.checked_sub(1).ok_or_else(invalid)?);
                break;
            } else if end_time == bar.datetime() {
                end = Some(i);
                break;
            }
        }

        let end = match end {
            Some(end) => end,
            None => {
                tracing::warn!(
                    start_time,
                    end_time,
                    data_start = first.datetime(),
                    data_end = last.datetime(),
                    "end time not found in data, window ends on the last bar"
                );
                bars.len() - 1
            }
        };

        if start >= end {
            tracing::error!(start_time, end_time, start, end, "empty or inverted window");
            return Err(invalid());
        }

        Ok(Self { start, end })
    }

    /// Returns the index of the first bar of the window.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Returns the index of the last bar of the window (inclusive).
    pub fn end(&self) -> usize {
        self.end
    }

    /// Returns the number of bars in the window.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always `false`, a resolved window holds at least two bars.
    pub fn is_empty(&self) -> bool {
        false
    }
}
