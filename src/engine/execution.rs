//! Order matching against the position ledger.
//!
//! A requested signed volume becomes one or two elementary transitions. The volume sign
//! never flips inside a single transition: crossing through zero is a full close followed
//! by an opening order for the remainder.

use crate::engine::{Bar, Order, OrderType, Position};
use crate::errors::{Error, Result};

/// Turns requested volumes into orders and applies them to a [`Position`].
///
/// Orders fill at the bar close. Sequence ids are strictly increasing and only consumed by
/// orders that pass validation.
#[derive(Debug, Clone, Default)]
pub struct Execution {
    next_id: usize,
}

impl Execution {
    /// Restarts the order sequence.
    pub fn reset(&mut self) {
        self.next_id = 0;
    }

    /// Applies `volume` to `position` at the close of `bar`.
    ///
    /// ### Arguments
    /// * `position` - The ledger to update.
    /// * `bar` - The bar the orders fill on.
    /// * `volume` - Requested signed volume (> 0 buys, < 0 sells, 0 does nothing).
    ///
    /// ### Returns
    /// The orders emitted (zero, one or two), or an execution error. On error the
    /// position is left untouched.
    pub fn execute(&mut self, position: &mut Position, bar: &Bar, volume: f64) -> Result<Vec<Order>> {
        if !volume.is_finite() {
            return Err(Error::InvalidVolume(volume));
        }
        if volume == 0.0 {
            return Ok(Vec::new());
        }

        let current = position.volume;
        let orders = if current == 0.0 {
            if volume > 0.0 {
                vec![self.long_open(position, bar, volume)?]
            } else {
                vec![self.short_open(position, bar, volume)?]
            }
        } else if current > 0.0 {
            let remainder = current + volume;
            if volume > 0.0 {
                vec![self.long_open(position, bar, volume)?]
            } else if remainder >= 0.0 {
                vec![self.long_close(position, bar, volume)?]
            } else {
                let close = self.long_close(position, bar, -current)?;
                let open = self.short_open(position, bar, remainder)?;
                vec![close, open]
            }
        } else {
            let remainder = current + volume;
            if volume < 0.0 {
                vec![self.short_open(position, bar, volume)?]
            } else if remainder <= 0.0 {
                vec![self.short_close(position, bar, volume)?]
            } else {
                let close = self.short_close(position, bar, -current)?;
                let open = self.long_open(position, bar, remainder)?;
                vec![close, open]
            }
        };

        Ok(orders)
    }

    /// Buys `volume > 0` while flat or long.
    pub fn long_open(&mut self, position: &mut Position, bar: &Bar, volume: f64) -> Result<Order> {
        if volume <= 0.0 || position.volume < 0.0 {
            return Err(Error::OpenVolume {
                order_type: OrderType::LongOpen,
                volume,
                position: position.volume,
            });
        }

        let order = self.record(OrderType::LongOpen, bar, volume);
        Self::open(position, &order);
        Ok(order)
    }

    /// Sells `volume < 0` of an existing long, at most the whole position.
    pub fn long_close(&mut self, position: &mut Position, bar: &Bar, volume: f64) -> Result<Order> {
        if volume >= 0.0 || position.volume <= 0.0 || -volume > position.volume {
            return Err(Error::CloseVolume {
                order_type: OrderType::LongClose,
                volume,
                position: position.volume,
            });
        }

        let order = self.record(OrderType::LongClose, bar, volume);
        Self::close(position, &order);
        Ok(order)
    }

    /// Sells `volume < 0` while flat or short.
    pub fn short_open(&mut self, position: &mut Position, bar: &Bar, volume: f64) -> Result<Order> {
        if volume >= 0.0 || position.volume > 0.0 {
            return Err(Error::OpenVolume {
                order_type: OrderType::ShortOpen,
                volume,
                position: position.volume,
            });
        }

        let order = self.record(OrderType::ShortOpen, bar, volume);
        Self::open(position, &order);
        Ok(order)
    }

    /// Buys back `volume > 0` of an existing short, at most the whole position.
    pub fn short_close(&mut self, position: &mut Position, bar: &Bar, volume: f64) -> Result<Order> {
        if volume <= 0.0 || position.volume >= 0.0 || volume > -position.volume {
            return Err(Error::CloseVolume {
                order_type: OrderType::ShortClose,
                volume,
                position: position.volume,
            });
        }

        let order = self.record(OrderType::ShortClose, bar, volume);
        Self::close(position, &order);
        Ok(order)
    }

    fn record(&mut self, order_type: OrderType, bar: &Bar, volume: f64) -> Order {
        let order = Order::from((self.next_id, order_type, bar.datetime().to_owned(), bar.close(), volume));
        self.next_id += 1;
        tracing::debug!(
            id = order.id(),
            order_type = %order_type,
            datetime = order.datetime(),
            price = order.price(),
            volume,
            "order filled"
        );
        order
    }

    fn open(position: &mut Position, order: &Order) {
        let volume = position.volume + order.volume();
        position.average_price =
            (position.average_price * position.volume + order.price() * order.volume()) / volume;
        position.volume = volume;
    }

    fn close(position: &mut Position, order: &Order) {
        if position.volume + order.volume() == 0.0 {
            position.closing_pnl += (order.price() - position.average_price) * position.volume;
            position.volume = 0.0;
            position.average_price = 0.0;
            position.floating_pnl = 0.0;
        } else {
            position.closing_pnl += -order.price() * order.volume() + position.average_price * order.volume();
            position.volume += order.volume();
            position.floating_pnl = position.estimate_pnl(position.current_price);
        }
    }
}
