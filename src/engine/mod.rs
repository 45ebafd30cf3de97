//! Broker simulation engine.
//!
//! This module provides the fundamental types of a run:
//! - `Bar`: OHLC sample, immutable and shared.
//! - `Window`: index range a run trades over.
//! - `Position`: the single mutable ledger of a run.
//! - `Execution`: turns requested volumes into orders.
//! - `Broker`: drives the pre_trade / insert_order / post_trade protocol.

mod bar;
mod broker;
mod execution;
mod order;
mod position;
mod records;
mod window;

pub use bar::*;
pub use broker::*;
pub use execution::*;
pub use order::*;
pub use position::*;
pub use records::*;
pub use window::*;
