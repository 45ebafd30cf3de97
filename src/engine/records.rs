use crate::engine::{Order, Position, PositionStatus};
use crate::errors::Result;
use crate::store::BulkAppend;

/// Table the order log is saved to.
pub const ORDER_TABLE: &str = "order";
/// Table the position log is saved to.
pub const POSITION_TABLE: &str = "position";

/// Append-only log of executed orders.
#[derive(Debug, Clone, Default)]
pub struct OrderLog {
    store: Vec<Order>,
}

impl OrderLog {
    pub(crate) fn insert_record(&mut self, order: Order) {
        self.store.push(order);
    }

    pub(crate) fn clear(&mut self) {
        self.store.clear();
    }

    /// Returns an iterator over the orders, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Order> {
        self.store.iter()
    }

    /// Returns the number of orders.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` when no order was executed.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Replaces the order table of `store` with this log.
    pub fn save<S: BulkAppend>(&self, store: &mut S, chunk_size: usize) -> Result<()> {
        store.replace(ORDER_TABLE, &self.store, chunk_size)
    }
}

/// Append-only log of position snapshots, two per simulated bar.
#[derive(Debug, Clone, Default)]
pub struct PositionLog {
    store: Vec<Position>,
}

impl PositionLog {
    pub(crate) fn insert_record(&mut self, position: Position) {
        self.store.push(position);
    }

    pub(crate) fn clear(&mut self) {
        self.store.clear();
    }

    /// Returns an iterator over every snapshot, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Position> {
        self.store.iter()
    }

    /// Returns the number of snapshots.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns the settled snapshots, one per bar.
    pub fn settled(&self) -> impl Iterator<Item = &Position> {
        self.store.iter().filter(|p| p.status() == PositionStatus::PostTrade)
    }

    /// Returns the equity curve: total pnl after each bar.
    pub fn pnl(&self) -> Vec<f64> {
        self.settled().map(Position::total_pnl).collect()
    }

    /// Returns the close price of each bar.
    pub fn prices(&self) -> Vec<f64> {
        self.settled().map(Position::current_price).collect()
    }

    /// Returns the timestamp of each bar.
    pub fn datetimes(&self) -> Vec<&str> {
        self.settled().map(Position::datetime).collect()
    }

    /// Returns the exposure held after each bar.
    pub fn volumes(&self) -> Vec<f64> {
        self.settled().map(Position::volume).collect()
    }

    /// Returns the total pnl of the last settled bar.
    pub fn final_pnl(&self) -> Option<f64> {
        self.settled().last().map(Position::total_pnl)
    }

    /// Replaces the position table of `store` with this log.
    pub fn save<S: BulkAppend>(&self, store: &mut S, chunk_size: usize) -> Result<()> {
        store.replace(POSITION_TABLE, &self.store, chunk_size)
    }
}
