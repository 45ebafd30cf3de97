//! # Single EMA Cross Run
//!
//! Replays sample bars (or the bars of a config file given as first argument) through an
//! EMA cross rule, then writes the order, position and signal tables as JSON lines.
mod utils;

use std::sync::Arc;

use replay_broker::prelude::*;
use ta::{Next, indicators::ExponentialMovingAverage};

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (config, bars) = match std::env::args().nth(1) {
        Some(path) => {
            let config = RunConfig::from_file(path)?;
            let bars = config.load_bars()?;
            (config, bars)
        }
        None => {
            let config = RunConfig {
                start_time: utils::sample_time(48),
                end_time: utils::sample_time(400),
                output: std::env::temp_dir().join("replay-broker-single"),
                ..Default::default()
            };
            (config, Arc::from_iter(utils::generate_sample_bars(500, 3, 100.0)))
        }
    };
    utils::setup_logging(&config.log_level);

    let mut broker = Broker::new(bars)?;
    broker.reset(&config.start_time, &config.end_time)?;

    let mut ema = ExponentialMovingAverage::new(20)?;
    let mut strategy = CrossSignal::new(move |price| ema.next(price));
    let pnl = broker.run(&mut strategy)?;
    broker.show_position();

    let mut store = JsonStore::new(&config.output)?;
    broker.save_result(&mut store, config.chunk_size)?;
    store.replace(SIGNAL_TABLE, &strategy.export(), config.chunk_size)?;

    let curve = broker.positions().pnl();
    let worst = curve.iter().copied().fold(f64::INFINITY, f64::min);
    println!("orders {} / bars {}", broker.orders().len(), curve.len());
    println!("final pnl {pnl:.2}, worst pnl {worst:.2}");
    println!("tables written to {}", config.output.display());

    Ok(())
}
