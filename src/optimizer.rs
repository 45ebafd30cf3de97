//! Strategy parameter sweep.
//!
//! This module runs one broker simulation per parameter combination and keeps the final pnl of each.
//! The `Sweep` struct handles the parallel execution of runs, while the
//! `ParameterCombination` trait defines the grid to explore.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::engine::{Bar, Broker};
use crate::errors::Result;
use crate::store::BulkAppend;
use crate::strategy::Strategy;

/// Table the sweep results are saved to.
pub const PARAMS_TABLE: &str = "params";

/// Trait defining how to generate parameter combinations for a sweep.
///
/// Implement this trait for your parameter types to define how combinations should be generated.
/// The associated type `Output` represents a single parameter combination (e.g., a tuple of values).
pub trait ParameterCombination: Sync {
    /// Type representing a single parameter combination (e.g., `(usize, f64)`).
    type Output: Clone + Debug + Send + Sync;

    /// Generates all the parameter combinations to test.
    ///
    /// ### Returns
    /// A vector containing all parameter combinations, in grid order.
    fn generate() -> Vec<Self::Output>;
}

/// Final pnl of one parameter combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult<P> {
    /// Parameter combination of the run.
    pub params: P,
    /// `total_pnl` of the last settled snapshot.
    pub final_pnl: f64,
}

/// Runs the same window over every combination of a parameter grid.
///
/// Every run owns its broker: workers share the bar data only.
pub struct Sweep<PC: ParameterCombination> {
    broker: Broker,
    start_time: String,
    end_time: String,
    _marker: PhantomData<PC>,
}

impl<PC: ParameterCombination> Sweep<PC> {
    /// Creates a new `Sweep` over `data` restricted to `[start_time, end_time]`.
    ///
    /// ### Arguments
    /// * `data` - Bar series shared by every run.
    /// * `start_time` - First timestamp of the trading window.
    /// * `end_time` - Last timestamp of the trading window.
    ///
    /// ### Returns
    /// An error if the data is empty or the window does not resolve.
    pub fn new(data: Arc<[Bar]>, start_time: impl ToString, end_time: impl ToString) -> Result<Self> {
        let start_time = start_time.to_string();
        let end_time = end_time.to_string();
        let mut broker = Broker::new(data)?;
        broker.reset(&start_time, &end_time)?;

        Ok(Self {
            broker,
            start_time,
            end_time,
            _marker: PhantomData,
        })
    }

    /// Runs every parameter combination.
    ///
    /// ### Arguments
    /// * `factory` - Builds a fresh strategy for a parameter combination.
    ///
    /// ### Returns
    /// One result per successful combination, in grid order. A combination whose
    /// strategy cannot be built or whose run fails is logged and left out.
    pub fn with<S, C>(&self, factory: C) -> Vec<SweepResult<PC::Output>>
    where
        S: Strategy,
        C: Fn(&PC::Output) -> Result<S> + Sync,
    {
        let combinations = PC::generate();
        let chunk_size = combinations.len().div_ceil(num_cpus::get()).max(1);
        tracing::info!(combinations = combinations.len(), chunk_size, "sweep started");

        combinations
            .par_chunks(chunk_size)
            .map(|par_combinations| {
                let mut broker = self.broker.clone();
                let mut local_results = Vec::with_capacity(par_combinations.len());

                for params in par_combinations {
                    match self.run_one(&mut broker, &factory, params) {
                        Ok(final_pnl) => {
                            tracing::info!(?params, final_pnl, "sweep point done");
                            local_results.push(SweepResult {
                                params: params.clone(),
                                final_pnl,
                            });
                        }
                        Err(e) => tracing::error!(?params, error = %e, "sweep point failed"),
                    }
                }

                local_results
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }

    fn run_one<S, C>(&self, broker: &mut Broker, factory: &C, params: &PC::Output) -> Result<f64>
    where
        S: Strategy,
        C: Fn(&PC::Output) -> Result<S>,
    {
        let mut strategy = factory(params)?;
        broker.reset(&self.start_time, &self.end_time)?;
        broker.run(&mut strategy)
    }

    /// Replaces the `params` table of `store` with `results`.
    pub fn save<S>(results: &[SweepResult<PC::Output>], store: &mut S, chunk_size: usize) -> Result<()>
    where
        S: BulkAppend,
        PC::Output: Serialize,
    {
        store.replace(PARAMS_TABLE, results, chunk_size)
    }
}
