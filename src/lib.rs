//! # Replay Broker: deterministic broker simulation for bar replays
//!
//! **Replay Broker** replays a time-ordered series of price bars against a trading strategy
//! and produces an auditable equity curve.
//!
//! The core is a broker state machine: signed order volumes become long/short open/close
//! transitions, the position is revalued on every bar and realized/unrealized pnl is booked
//! under a strict three-phase protocol.
//!
//! ## Core Components
//! | Component   | Description                                                                    |
//! |-------------|--------------------------------------------------------------------------------|
//! | **`Bar`**      | OHLC sample of one time period, immutable and shared by every run.          |
//! | **`Window`**   | Index range a run trades over, resolved from two timestamps.                |
//! | **`Position`** | The ledger: volume, average price and pnl of the run.                       |
//! | **`Execution`** | Turns a signed volume into orders and ledger transitions.                  |
//! | **`Broker`**   | Drives `pre_trade` → `insert_order` → `post_trade` and records snapshots.   |
//! | **`Strategy`** | Produces one signed volume per bar.                                          |
//! | **`Sweep`**    | Runs a parameter grid in parallel *(feature `optimizer`)*.                   |
//!
//! ## Getting Started
//! ```rust
//! use replay_broker::prelude::*;
//! use std::sync::Arc;
//!
//! let bars: Arc<[Bar]> = [10.0, 12.0, 15.0]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &close)| {
//!         BarBuilder::builder()
//!             .index(i)
//!             .datetime(format!("2023-01-01 0{i}:00:00"))
//!             .open(close)
//!             .high(close)
//!             .low(close)
//!             .close(close)
//!             .build()
//!             .unwrap()
//!     })
//!     .collect();
//!
//! let mut broker = Broker::new(bars).unwrap();
//! broker.reset("2023-01-01 00:00:00", "2023-01-01 02:00:00").unwrap();
//!
//! // buy 1 on the first traded bar, sell it on the last
//! broker.pre_trade().unwrap();
//! broker.insert_order(1.0).unwrap();
//! broker.post_trade().unwrap();
//! broker.pre_trade().unwrap();
//! broker.insert_order(-1.0).unwrap();
//! broker.post_trade().unwrap();
//!
//! assert_eq!(broker.get_current_position().realized_pnl(), 3.0);
//! ```
//!
//! ## Error Handling
//! Configuration errors (empty data, bad window) stop a run before it starts.
//! Execution errors reject one order and leave the ledger untouched.
#![warn(missing_docs)]

/// Broker engine: bars, window, ledger, execution and protocol.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Bulk-append storage of the result tables.
pub mod store;

/// Signal producers.
pub mod strategy;

/// Run configuration.
pub mod config;

/// Utility functions and helpers.
pub mod utils;

/// Strategy parameter sweep.
#[cfg(feature = "optimizer")]
pub mod optimizer;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use super::*;
    pub use crate::config::*;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::store::*;
    pub use crate::strategy::*;

    #[cfg(feature = "optimizer")]
    pub use crate::optimizer::*;
}
