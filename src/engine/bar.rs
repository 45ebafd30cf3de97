use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Format used for generated timestamps, lexical order equals time order.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One OHLC price sample.
///
/// Bars are immutable once built and shared read-only by every run.
/// The `datetime` is compared lexically, so it must be an ISO-like string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBar")]
pub struct Bar {
    index: usize,
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// Bar row as found in data files, not validated yet.
///
/// Accepts the legacy column names (`idx`, `open_price`, `high_price`, `low_price`,
/// `close_price`). The index column is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBar {
    #[serde(alias = "idx")]
    index: Option<usize>,
    datetime: String,
    #[serde(alias = "open_price")]
    open: f64,
    #[serde(alias = "high_price")]
    high: f64,
    #[serde(alias = "low_price")]
    low: f64,
    #[serde(alias = "close_price")]
    close: f64,
}

impl RawBar {
    /// Validates the row through [`BarBuilder`], `default_index` stands in for a missing index.
    pub fn build(self, default_index: usize) -> Result<Bar> {
        BarBuilder::builder()
            .index(self.index.unwrap_or(default_index))
            .datetime(self.datetime)
            .open(self.open)
            .high(self.high)
            .low(self.low)
            .close(self.close)
            .build()
    }
}

impl TryFrom<RawBar> for Bar {
    type Error = Error;

    fn try_from(raw: RawBar) -> Result<Self> {
        raw.build(0)
    }
}

impl Bar {
    /// Returns the position of the bar in its series.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the timestamp of the bar.
    pub fn datetime(&self) -> &str {
        &self.datetime
    }

    /// Returns the open price.
    pub fn open(&self) -> f64 {
        self.open
    }

    /// Returns the highest price.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Returns the lowest price.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Returns the close price, the price every order fills at.
    pub fn close(&self) -> f64 {
        self.close
    }
}

/// Builder for [`Bar`].
///
/// ### Example
/// ```rust
/// use replay_broker::prelude::*;
///
/// let bar = BarBuilder::builder()
///     .index(0)
///     .datetime("2023-01-03 09:00:00")
///     .open(100.0)
///     .high(110.0)
///     .low(95.0)
///     .close(105.0)
///     .build()
///     .unwrap();
///
/// assert_eq!(bar.close(), 105.0);
/// ```
#[derive(Debug, Default)]
pub struct BarBuilder {
    index: usize,
    datetime: Option<String>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
}

impl BarBuilder {
    /// Starts an empty builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the index of the bar in its series.
    pub fn index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Sets the timestamp as given.
    pub fn datetime(mut self, datetime: impl ToString) -> Self {
        self.datetime = Some(datetime.to_string());
        self
    }

    /// Sets the timestamp from a chrono value, formatted with [`DATETIME_FORMAT`].
    pub fn datetime_utc(mut self, datetime: NaiveDateTime) -> Self {
        self.datetime = Some(datetime.format(DATETIME_FORMAT).to_string());
        self
    }

    /// Sets the open price.
    pub fn open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    /// Sets the highest price.
    pub fn high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    /// Sets the lowest price.
    pub fn low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    /// Sets the close price.
    pub fn close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    /// Builds the bar.
    ///
    /// ### Returns
    /// The bar, or [`Error::InvalidBar`] when a field is missing, a price is not finite
    /// or `high` is below `low`.
    pub fn build(self) -> Result<Bar> {
        let datetime = self.datetime.ok_or_else(|| Error::InvalidBar("missing datetime".into()))?;
        let open = self.open.ok_or_else(|| Error::InvalidBar("missing open".into()))?;
        let high = self.high.ok_or_else(|| Error::InvalidBar("missing high".into()))?;
        let low = self.low.ok_or_else(|| Error::InvalidBar("missing low".into()))?;
        let close = self.close.ok_or_else(|| Error::InvalidBar("missing close".into()))?;

        if ![open, high, low, close].iter().all(|p| p.is_finite()) {
            return Err(Error::InvalidBar(format!("non-finite price at {datetime}")));
        }
        if high < low {
            return Err(Error::InvalidBar(format!("high {high} below low {low} at {datetime}")));
        }

        Ok(Bar {
            index: self.index,
            datetime,
            open,
            high,
            low,
            close,
        })
    }
}
