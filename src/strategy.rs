//! Signal producers.
//!
//! A strategy sees every bar exactly once, in order, and answers with a signed volume.
//! Indicators are supplied by the caller (e.g. the [`ta`](https://crates.io/crates/ta) crate).

use serde::{Deserialize, Serialize};

use crate::engine::Bar;

/// Table the signal records are saved to.
pub const SIGNAL_TABLE: &str = "signal";

/// Trait implemented by every signal producer.
pub trait Strategy {
    /// Consumes a bar of the trading window and returns the volume to trade.
    fn update(&mut self, bar: &Bar) -> f64;

    /// Consumes a bar before the trading window. The default discards the volume.
    fn warm_up(&mut self, bar: &Bar) {
        let _ = self.update(bar);
    }

    /// Called once between the warm-up bars and the first traded bar.
    fn start(&mut self) {}

    /// Returns what the strategy wants persisted next to the run logs.
    fn export(&self) -> Vec<SignalRecord> {
        Vec::new()
    }
}

impl<F> Strategy for F
where
    F: FnMut(&Bar) -> f64,
{
    fn update(&mut self, bar: &Bar) -> f64 {
        self(bar)
    }
}

/// Row of the signal table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    /// Timestamp of the bar.
    pub datetime: String,
    /// Open price of the bar.
    pub open_price: f64,
    /// Highest price of the bar.
    pub high_price: f64,
    /// Lowest price of the bar.
    pub low_price: f64,
    /// Close price of the bar.
    pub close_price: f64,
    /// Change of the indicator since the previous bar.
    pub signal: f64,
    /// Volume requested on this bar.
    pub order_volume: f64,
}

/// Trend-following rule on the slope of an indicator.
///
/// The slope is `indicator(t) - indicator(t-1)`. Compared to the previous slope:
/// - same direction: no order;
/// - turning up or down from a flat slope: one unit in that direction;
/// - reversing: two units, enough to flip a one-unit position.
///
/// The indicator reports `0.0` while it is not ready.
pub struct CrossSignal<I> {
    indicator: I,
    unit: f64,
    previous: f64,
    previous_signal: f64,
    armed: bool,
    records: Vec<SignalRecord>,
}

impl<I> CrossSignal<I>
where
    I: FnMut(f64) -> f64,
{
    /// Creates a rule trading one unit over `indicator`.
    pub fn new(indicator: I) -> Self {
        Self::with_unit(indicator, 1.0)
    }

    /// Creates a rule trading `unit` volume per step over `indicator`.
    pub fn with_unit(indicator: I, unit: f64) -> Self {
        Self {
            indicator,
            unit,
            previous: 0.0,
            previous_signal: 0.0,
            armed: false,
            records: Vec::new(),
        }
    }

    fn order_volume(&self, signal: f64) -> f64 {
        let steps = match (signal, self.previous_signal) {
            (s, p) if s > 0.0 && p > 0.0 => 0.0,
            (s, p) if s > 0.0 && p == 0.0 => 1.0,
            (s, p) if s > 0.0 && p < 0.0 => 2.0,
            (s, p) if s < 0.0 && p < 0.0 => 0.0,
            (s, p) if s < 0.0 && p == 0.0 => -1.0,
            (s, p) if s < 0.0 && p > 0.0 => -2.0,
            _ => 0.0,
        };
        steps * self.unit
    }
}

impl<I> Strategy for CrossSignal<I>
where
    I: FnMut(f64) -> f64,
{
    fn update(&mut self, bar: &Bar) -> f64 {
        let value = (self.indicator)(bar.close());
        if self.previous == 0.0 {
            self.previous = value;
            return 0.0;
        }
        let signal = value - self.previous;
        self.previous = value;

        let order_volume = if self.armed { self.order_volume(signal) } else { 0.0 };
        self.records.push(SignalRecord {
            datetime: bar.datetime().to_owned(),
            open_price: bar.open(),
            high_price: bar.high(),
            low_price: bar.low(),
            close_price: bar.close(),
            signal,
            order_volume,
        });

        tracing::trace!(datetime = bar.datetime(), value, signal, order_volume, "cross signal");
        self.previous_signal = signal;
        order_volume
    }

    fn warm_up(&mut self, bar: &Bar) {
        self.armed = false;
        self.update(bar);
    }

    fn start(&mut self) {
        self.previous_signal = 0.0;
        self.armed = true;
    }

    fn export(&self) -> Vec<SignalRecord> {
        self.records.clone()
    }
}
