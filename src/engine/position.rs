use serde::{Deserialize, Serialize};

use crate::engine::Bar;

/// Where the position stands in the per-bar protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    /// Freshly reset, no bar marked yet.
    #[default]
    Idle,
    /// Marked to the bar close, before matching.
    PreTrade,
    /// An order was matched on the current bar.
    Trade,
    /// Settled, ready for the next bar.
    PostTrade,
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::PreTrade => write!(f, "pre_trade"),
            Self::Trade => write!(f, "trade"),
            Self::PostTrade => write!(f, "post_trade"),
        }
    }
}

/// The single mutable position record of a run.
///
/// Serializes as the position log row `(status, datetime, average_price, current_price,
/// volume, floating_pnl, closing_pnl, realized_pnl, total_pnl)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(skip)]
    pub(crate) index: usize,
    pub(crate) status: PositionStatus,
    pub(crate) datetime: String,
    pub(crate) average_price: f64,
    pub(crate) current_price: f64,
    pub(crate) volume: f64,
    pub(crate) floating_pnl: f64,
    pub(crate) closing_pnl: f64,
    pub(crate) realized_pnl: f64,
    pub(crate) total_pnl: f64,
}

impl Position {
    /// Returns the index of the bar the position was last marked on.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the protocol status.
    pub fn status(&self) -> PositionStatus {
        self.status
    }

    /// Returns the timestamp of the bar the position was last marked on.
    pub fn datetime(&self) -> &str {
        &self.datetime
    }

    /// Returns the volume weighted entry price, `0.0` when flat.
    pub fn average_price(&self) -> f64 {
        self.average_price
    }

    /// Returns the last marked price.
    pub fn current_price(&self) -> f64 {
        self.current_price
    }

    /// Returns the signed exposure (> 0 long, < 0 short, 0 flat).
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Returns the unrealized profit of the open exposure.
    pub fn floating_pnl(&self) -> f64 {
        self.floating_pnl
    }

    /// Returns the profit booked by a close on the current bar, not yet settled.
    pub fn closing_pnl(&self) -> f64 {
        self.closing_pnl
    }

    /// Returns the cumulative booked profit.
    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    /// Returns `realized_pnl + floating_pnl` as of the last mark.
    pub fn total_pnl(&self) -> f64 {
        self.total_pnl
    }

    /// Returns `true` when there is no exposure.
    pub fn is_flat(&self) -> bool {
        self.volume == 0.0
    }

    /// Marks the position to the close of `bar`, found at `index` in the series.
    pub(crate) fn mark(&mut self, index: usize, bar: &Bar) {
        self.index = index;
        self.datetime = bar.datetime().to_owned();
        self.current_price = bar.close();
        self.floating_pnl = self.estimate_pnl(self.current_price);
        self.total_pnl = self.realized_pnl + self.floating_pnl;
    }

    /// Folds the closing profit into the realized profit.
    pub(crate) fn settle(&mut self) {
        self.realized_pnl += self.closing_pnl;
        self.closing_pnl = 0.0;
        self.total_pnl = self.realized_pnl + self.floating_pnl;
    }

    /// Profit of the whole exposure if it were closed at `price`.
    pub(crate) fn estimate_pnl(&self, price: f64) -> f64 {
        if self.is_flat() {
            return 0.0;
        }
        (price - self.average_price) * self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BarBuilder;

    fn bar(index: usize, close: f64) -> Bar {
        BarBuilder::builder()
            .index(index)
            .datetime(format!("2023-01-01 {:02}:00:00", index))
            .open(close)
            .high(close)
            .low(close)
            .close(close)
            .build()
            .unwrap()
    }

    #[test]
    fn mark_flat_position() {
        let mut position = Position::default();
        position.realized_pnl = 4.0;
        position.mark(2, &bar(2, 50.0));

        assert_eq!(position.index(), 2);
        assert_eq!(position.current_price(), 50.0);
        assert_eq!(position.floating_pnl(), 0.0);
        assert_eq!(position.total_pnl(), 4.0);
    }

    #[test]
    fn mark_short_position() {
        let mut position = Position {
            volume: -2.0,
            average_price: 100.0,
            ..Default::default()
        };
        position.mark(0, &bar(0, 90.0));

        assert_eq!(position.floating_pnl(), 20.0);
        assert_eq!(position.total_pnl(), 20.0);
    }

    #[test]
    fn settle_folds_closing_pnl() {
        let mut position = Position {
            closing_pnl: 15.0,
            realized_pnl: 5.0,
            floating_pnl: 1.0,
            ..Default::default()
        };
        position.settle();

        assert_eq!(position.closing_pnl(), 0.0);
        assert_eq!(position.realized_pnl(), 20.0);
        assert_eq!(position.total_pnl(), 21.0);
    }

    #[test]
    fn position_row() {
        let position = Position {
            status: PositionStatus::PostTrade,
            datetime: "2023-01-01 10:00:00".into(),
            ..Default::default()
        };
        let row = serde_json::to_value(&position).unwrap();
        assert_eq!(row["status"], "post_trade");
        assert!(row.get("index").is_none());
        assert_eq!(row.as_object().unwrap().len(), 9);
    }
}
