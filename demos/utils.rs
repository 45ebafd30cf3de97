#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use replay_broker::engine::{Bar, BarBuilder, DATETIME_FORMAT};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Setup logging, `RUST_LOG` wins over `level`.
pub fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
}

/// Generates deterministic hourly bars.
pub fn generate_sample_bars(max: usize, seed: i32, base_price: f64) -> Vec<Bar> {
    let mut open = base_price;

    (0..=max)
        .map(|i| {
            // trend + oscillation, so that a cross rule has turns to trade
            let trend = base_price + 0.2 * i as f64;
            let variation = 8.0 * (i as f64 * 0.15 + seed as f64).sin();

            let close = trend + variation;
            let high = close.max(open) + 0.5;
            let low = close.min(open) - 0.5;

            let bar = BarBuilder::builder()
                .index(i)
                .datetime_utc(bar_time(i))
                .open(open)
                .high(high)
                .low(low)
                .close(close)
                .build()
                .unwrap();

            open = close;
            bar
        })
        .collect()
}

fn bar_time(i: usize) -> NaiveDateTime {
    let origin = NaiveDate::from_ymd_opt(2023, 5, 11)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .unwrap_or_default();
    origin + TimeDelta::hours(i as i64)
}

/// Timestamp of the `i`-th generated bar.
pub fn sample_time(i: usize) -> String {
    bar_time(i).format(DATETIME_FORMAT).to_string()
}
