//! # Parallel EMA Period Sweep
//!
//! Runs the EMA cross rule for every period of a grid in parallel and keeps the final pnl of each.
mod utils;

use std::sync::Arc;

use replay_broker::prelude::*;
use ta::{Next, indicators::ExponentialMovingAverage};

const START: usize = 5;
const END: usize = 60;

struct Periods;

impl ParameterCombination for Periods {
    type Output = (usize, f64);

    fn generate() -> Vec<Self::Output> {
        (START..=END)
            .step_by(5)
            .flat_map(|period| [1.0, 2.0].map(move |unit| (period, unit)))
            .collect()
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    utils::setup_logging("warn");

    let bars = Arc::from_iter(utils::generate_sample_bars(2_000, 7, 100.0));
    let sweep = Sweep::<Periods>::new(bars, utils::sample_time(100), utils::sample_time(1_900))?;

    let results = sweep.with(|&(period, unit)| {
        let mut ema = ExponentialMovingAverage::new(period).map_err(|e| Error::InvalidParameter(e.to_string()))?;
        Ok(CrossSignal::with_unit(move |price| ema.next(price), unit))
    });

    let best = results
        .iter()
        .max_by(|a, b| a.final_pnl.total_cmp(&b.final_pnl))
        .ok_or("no sweep result")?;
    println!("{} points, best {:?} with pnl {:.2}", results.len(), best.params, best.final_pnl);

    let output = std::env::temp_dir().join("replay-broker-sweep");
    let mut store = JsonStore::new(&output)?;
    Sweep::<Periods>::save(&results, &mut store, CHUNK_SIZE)?;
    println!("params table written to {}", store.path(PARAMS_TABLE).display());

    Ok(())
}
