use std::sync::Arc;

use crate::engine::*;
use crate::errors::{Error, Phase, Result};
use crate::store::BulkAppend;
use crate::strategy::Strategy;

/// Broker simulation driving the per-bar protocol.
///
/// Every bar of the window goes through exactly one `pre_trade` (mark), at most one
/// `insert_order` (match) and one `post_trade` (settle). The broker owns the position and
/// both logs for the whole run.
#[derive(Debug, Clone)]
pub struct Broker {
    data: Arc<[Bar]>,
    window: Option<Window>,
    cursor: usize,
    last_phase: Phase,
    position: Position,
    execution: Execution,
    orders: OrderLog,
    positions: PositionLog,
}

impl Broker {
    /// Creates a new broker over a bar series.
    ///
    /// ### Arguments
    /// * `data` - Bars sorted by timestamp. They are never re-sorted.
    ///
    /// ### Returns
    /// The broker, or [`Error::BarDataEmpty`].
    ///
    /// ### Example
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use replay_broker::prelude::*;
    ///
    /// let bars = (0..3)
    ///     .map(|i| {
    ///         BarBuilder::builder()
    ///             .index(i)
    ///             .datetime(format!("2023-01-0{} 09:00:00", i + 1))
    ///             .open(100.0)
    ///             .high(100.0)
    ///             .low(100.0)
    ///             .close(100.0)
    ///             .build()
    ///             .unwrap()
    ///     })
    ///     .collect::<Vec<_>>();
    ///
    /// let mut broker = Broker::new(Arc::from_iter(bars)).unwrap();
    /// broker.reset("2022-12-31", "2023-01-03 09:00:00").unwrap();
    /// assert_eq!(broker.start_idx(), Some(0));
    /// assert_eq!(broker.end_idx(), Some(2));
    /// ```
    pub fn new(data: Arc<[Bar]>) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::BarDataEmpty);
        }

        Ok(Self {
            data,
            window: None,
            cursor: 0,
            last_phase: Phase::Reset,
            position: Position::default(),
            execution: Execution::default(),
            orders: OrderLog::default(),
            positions: PositionLog::default(),
        })
    }

    /// Returns the number of bars.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`, empty data is rejected by [`Broker::new`].
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns an iterator over the bars.
    pub fn bars(&self) -> std::slice::Iter<'_, Bar> {
        self.data.iter()
    }

    /// Returns the bar at `idx`.
    pub fn get_bar(&self, idx: usize) -> Result<&Bar> {
        self.data.get(idx).ok_or(Error::BarNotFound(idx))
    }

    /// Returns the bar under the cursor.
    pub fn get_current_bar(&self) -> Result<&Bar> {
        self.get_bar(self.cursor)
    }

    /// Returns the bar before the cursor, `None` on the first bar.
    pub fn get_pre_bar(&self) -> Option<&Bar> {
        self.cursor.checked_sub(1).and_then(|idx| self.data.get(idx))
    }

    /// Returns the current position.
    pub fn get_current_position(&self) -> &Position {
        &self.position
    }

    /// Returns the resolved window, if any.
    pub fn window(&self) -> Option<Window> {
        self.window
    }

    /// Returns the index of the first traded bar.
    pub fn start_idx(&self) -> Option<usize> {
        self.window.map(|w| w.start())
    }

    /// Returns the index of the last traded bar (inclusive).
    pub fn end_idx(&self) -> Option<usize> {
        self.window.map(|w| w.end())
    }

    /// Returns the order log.
    pub fn orders(&self) -> &OrderLog {
        &self.orders
    }

    /// Returns the position log.
    pub fn positions(&self) -> &PositionLog {
        &self.positions
    }

    /// Starts a new run over `[start_time, end_time)`.
    ///
    /// The position, the order sequence and both logs are discarded. When the window does
    /// not resolve, the broker stays unusable until the next successful reset.
    ///
    /// ### Returns
    /// The resolved window, or a configuration error.
    pub fn reset(&mut self, start_time: &str, end_time: &str) -> Result<Window> {
        self.window = None;
        self.cursor = 0;
        self.last_phase = Phase::Reset;
        self.position = Position::default();
        self.execution.reset();
        self.orders.clear();
        self.positions.clear();

        let window = Window::resolve(&self.data, start_time, end_time)?;
        self.window = Some(window);
        self.cursor = window.start();
        tracing::info!(
            start_time = self.data[window.start()].datetime(),
            end_time = self.data[window.end()].datetime(),
            current_idx = self.cursor,
            "reset"
        );
        Ok(window)
    }

    fn check_phase(&self, phase: Phase) -> Result<Window> {
        let window = self.window.ok_or(Error::NotReset)?;
        let legal = match phase {
            Phase::Reset => true,
            Phase::PreTrade => matches!(self.last_phase, Phase::Reset | Phase::PostTrade),
            Phase::InsertOrder => self.last_phase == Phase::PreTrade,
            Phase::PostTrade => matches!(self.last_phase, Phase::PreTrade | Phase::InsertOrder),
        };
        if !legal {
            return Err(Error::PhaseOrder {
                phase,
                previous: self.last_phase,
            });
        }
        Ok(window)
    }

    /// Marks the position to the close of the current bar and records a snapshot.
    pub fn pre_trade(&mut self) -> Result<()> {
        let window = self.check_phase(Phase::PreTrade)?;
        if self.cursor > window.end() {
            return Err(Error::WindowExhausted(self.cursor));
        }
        let bar = self.data.get(self.cursor).ok_or(Error::BarNotFound(self.cursor))?;

        self.position.mark(self.cursor, bar);
        self.position.status = PositionStatus::PreTrade;
        self.positions.insert_record(self.position.clone());
        self.last_phase = Phase::PreTrade;
        Ok(())
    }

    /// Matches a requested signed volume at the close of the current bar.
    ///
    /// ### Arguments
    /// * `volume` - Signed volume (> 0 buys, < 0 sells, 0 does nothing).
    ///
    /// ### Returns
    /// Ok if the orders were executed. An execution error rejects the whole request and
    /// leaves the position untouched; the bar can still be settled.
    pub fn insert_order(&mut self, volume: f64) -> Result<()> {
        self.check_phase(Phase::InsertOrder)?;
        self.last_phase = Phase::InsertOrder;
        if volume == 0.0 {
            return Ok(());
        }
        let bar = self.data.get(self.cursor).ok_or(Error::BarNotFound(self.cursor))?;

        let orders = self.execution.execute(&mut self.position, bar, volume)?;
        self.position.status = PositionStatus::Trade;
        for order in orders {
            self.orders.insert_record(order);
        }
        Ok(())
    }

    /// Settles the current bar, records a snapshot and moves to the next bar.
    pub fn post_trade(&mut self) -> Result<()> {
        self.check_phase(Phase::PostTrade)?;
        let bar = self.data.get(self.cursor).ok_or(Error::BarNotFound(self.cursor))?;

        self.position.mark(self.cursor, bar);
        self.position.settle();
        self.position.status = PositionStatus::PostTrade;
        self.positions.insert_record(self.position.clone());
        self.last_phase = Phase::PostTrade;
        self.cursor += 1;
        Ok(())
    }

    /// Runs a strategy over the window resolved by the last [`Broker::reset`].
    ///
    /// Bars before the window warm the strategy up without trading. Orders rejected by
    /// the execution rules are logged and dropped.
    ///
    /// ### Arguments
    /// * `strategy` - The signal producer, called once per bar.
    ///
    /// ### Returns
    /// The final total pnl, or an error.
    ///
    /// ### Example
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use replay_broker::prelude::*;
    ///
    /// let bars = [100.0, 105.0, 103.0]
    ///     .iter()
    ///     .enumerate()
    ///     .map(|(i, &close)| {
    ///         BarBuilder::builder()
    ///             .index(i)
    ///             .datetime(format!("2023-01-0{} 09:00:00", i + 1))
    ///             .open(close)
    ///             .high(close)
    ///             .low(close)
    ///             .close(close)
    ///             .build()
    ///             .unwrap()
    ///     })
    ///     .collect::<Vec<_>>();
    ///
    /// let mut broker = Broker::new(Arc::from_iter(bars)).unwrap();
    /// broker.reset("2022-12-31", "2023-01-03 09:00:00").unwrap();
    ///
    /// // buy one unit on the first bar, hold
    /// let mut first = true;
    /// let pnl = broker
    ///     .run(&mut |_: &Bar| if std::mem::take(&mut first) { 1.0 } else { 0.0 })
    ///     .unwrap();
    /// assert_eq!(pnl, 3.0);
    /// ```
    pub fn run<S>(&mut self, strategy: &mut S) -> Result<f64>
    where
        S: Strategy + ?Sized,
    {
        let window = self.check_phase(Phase::PreTrade)?;
        if self.last_phase != Phase::Reset {
            return Err(Error::PhaseOrder {
                phase: Phase::PreTrade,
                previous: self.last_phase,
            });
        }

        let bars = Arc::clone(&self.data);
        for bar in bars[..window.start()].iter() {
            strategy.warm_up(bar);
        }

        strategy.start();
        for bar in bars[window.start()..=window.end()].iter() {
            self.pre_trade()?;
            let volume = strategy.update(bar);
            match self.insert_order(volume) {
                Ok(()) => {}
                Err(e) if e.is_execution() => {
                    tracing::error!(datetime = bar.datetime(), volume, error = %e, "order dropped");
                }
                Err(e) => return Err(e),
            }
            self.post_trade()?;
        }

        Ok(self.position.total_pnl())
    }

    /// Bulk-replaces the order and position tables of `store`.
    pub fn save_result<S: BulkAppend>(&self, store: &mut S, chunk_size: usize) -> Result<()> {
        self.orders.save(store, chunk_size)?;
        self.positions.save(store, chunk_size)
    }

    /// Logs the current position.
    pub fn show_position(&self) {
        let p = &self.position;
        tracing::info!(
            idx = p.index(),
            status = %p.status(),
            datetime = p.datetime(),
            total_pnl = p.total_pnl(),
            realized_pnl = p.realized_pnl(),
            closing_pnl = p.closing_pnl(),
            floating_pnl = p.floating_pnl(),
            average_price = p.average_price(),
            current_price = p.current_price(),
            volume = p.volume(),
            "position"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CHUNK_SIZE, JsonStore, MemoryStore};

    fn get_data(closes: &[f64]) -> Arc<[Bar]> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                BarBuilder::builder()
                    .index(i)
                    .datetime(format!("2023-01-01 {:02}:00:00", i))
                    .open(close)
                    .high(close)
                    .low(close)
                    .close(close)
                    .build()
                    .unwrap()
            })
            .collect()
    }

    fn step(broker: &mut Broker, volume: f64) -> Result<()> {
        broker.pre_trade()?;
        broker.insert_order(volume)?;
        broker.post_trade()
    }

    #[test]
    fn empty_data() {
        assert!(matches!(Broker::new(Arc::from_iter(Vec::new())), Err(Error::BarDataEmpty)));
    }

    #[test]
    fn open_then_full_close() {
        let mut broker = Broker::new(get_data(&[99.0, 100.0, 105.0, 106.0])).unwrap();
        broker.reset("2023-01-01 00:00:00", "2023-01-01 03:00:00").unwrap();
        assert_eq!(broker.get_current_bar().unwrap().close(), 100.0);

        step(&mut broker, 3.0).unwrap();
        let position = broker.get_current_position();
        assert_eq!(position.average_price(), 100.0);
        assert_eq!(position.volume(), 3.0);
        assert_eq!(position.realized_pnl(), 0.0);

        broker.pre_trade().unwrap();
        assert_eq!(broker.get_current_position().floating_pnl(), 15.0);
        broker.insert_order(-3.0).unwrap();
        assert_eq!(broker.get_current_position().closing_pnl(), 15.0);
        assert_eq!(broker.get_current_position().status(), PositionStatus::Trade);
        broker.post_trade().unwrap();

        let position = broker.get_current_position();
        assert_eq!(position.realized_pnl(), 15.0);
        assert_eq!(position.closing_pnl(), 0.0);
        assert_eq!(position.volume(), 0.0);
        assert_eq!(position.average_price(), 0.0);
        assert_eq!(position.total_pnl(), 15.0);

        let orders = broker.orders().iter().collect::<Vec<_>>();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_type(), OrderType::LongOpen);
        assert_eq!(orders[1].order_type(), OrderType::LongClose);
        assert_eq!(orders[1].volume(), -3.0);
        assert_eq!(orders[1].price(), 105.0);
    }

    #[test]
    fn two_snapshots_per_bar() {
        let mut broker = Broker::new(get_data(&[1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
        let window = broker.reset("2022", "2023-01-01 04:00:00").unwrap();
        for volume in [1.0, 0.0, -2.0, 1.0, 0.0] {
            step(&mut broker, volume).unwrap();
        }

        let log = broker.positions();
        let pre = log.iter().filter(|p| p.status() == PositionStatus::PreTrade).count();
        let post = log.iter().filter(|p| p.status() == PositionStatus::PostTrade).count();
        assert_eq!(pre, window.len());
        assert_eq!(post, window.len());
        assert_eq!(log.len(), 2 * window.len());
        for p in log.iter() {
            assert_eq!(p.total_pnl(), p.realized_pnl() + p.floating_pnl());
        }
    }

    #[test]
    fn pre_trade_does_not_move_exposure() {
        let mut broker = Broker::new(get_data(&[10.0, 10.0, 12.0])).unwrap();
        broker.reset("2022", "2023-01-01 02:00:00").unwrap();
        step(&mut broker, -2.0).unwrap();
        step(&mut broker, 0.0).unwrap();

        broker.pre_trade().unwrap();
        let last = broker.positions().iter().last().unwrap();
        assert_eq!(last.status(), PositionStatus::PreTrade);
        assert_eq!(last.volume(), -2.0);
        assert_eq!(last.average_price(), 10.0);
        assert_eq!(last.floating_pnl(), -4.0);
    }

    #[test]
    fn window_exhausted() {
        let mut broker = Broker::new(get_data(&[1.0, 2.0, 3.0])).unwrap();
        broker.reset("2022", "2023-01-01 01:00:00").unwrap();
        step(&mut broker, 0.0).unwrap();
        step(&mut broker, 0.0).unwrap();
        assert!(matches!(broker.pre_trade(), Err(Error::WindowExhausted(2))));
    }

    #[test]
    fn phases_out_of_order() {
        let mut broker = Broker::new(get_data(&[1.0, 2.0, 3.0])).unwrap();
        assert!(matches!(broker.pre_trade(), Err(Error::NotReset)));

        broker.reset("2022", "2023-01-01 02:00:00").unwrap();
        assert!(matches!(
            broker.insert_order(1.0),
            Err(Error::PhaseOrder {
                phase: Phase::InsertOrder,
                previous: Phase::Reset
            })
        ));
        assert!(matches!(broker.post_trade(), Err(Error::PhaseOrder { .. })));

        broker.pre_trade().unwrap();
        assert!(matches!(broker.pre_trade(), Err(Error::PhaseOrder { .. })));
        broker.insert_order(0.0).unwrap();
        assert!(matches!(broker.insert_order(1.0), Err(Error::PhaseOrder { .. })));
        broker.post_trade().unwrap();
        assert!(matches!(broker.post_trade(), Err(Error::PhaseOrder { .. })));
        assert!(broker.orders().is_empty());
    }

    #[test]
    fn failed_reset_disables_broker() {
        let mut broker = Broker::new(get_data(&[1.0, 2.0, 3.0])).unwrap();
        broker.reset("2022", "2023-01-01 02:00:00").unwrap();
        step(&mut broker, 1.0).unwrap();

        let result = broker.reset("2023-01-01 02:00:00", "2023-01-01 00:00:00");
        assert!(matches!(result, Err(Error::InvalidWindow { .. })));
        assert!(broker.orders().is_empty());
        assert!(broker.positions().is_empty());
        assert_eq!(broker.start_idx(), None);
        assert!(matches!(broker.pre_trade(), Err(Error::NotReset)));
    }

    #[test]
    fn rejected_order_keeps_ledger() {
        let mut broker = Broker::new(get_data(&[1.0, 2.0, 3.0])).unwrap();
        broker.reset("2022", "2023-01-01 02:00:00").unwrap();
        step(&mut broker, 1.0).unwrap();

        broker.pre_trade().unwrap();
        let before = broker.get_current_position().clone();
        assert!(broker.insert_order(f64::INFINITY).unwrap_err().is_execution());
        assert_eq!(broker.get_current_position(), &before);
        broker.post_trade().unwrap();
        assert_eq!(broker.orders().len(), 1);
    }

    #[test]
    fn run_with_warm_up() {
        let mut broker = Broker::new(get_data(&[5.0, 6.0, 10.0, 12.0, 11.0])).unwrap();
        broker.reset("2023-01-01 01:00:00", "2023-01-01 04:00:00").unwrap();
        assert_eq!(broker.start_idx(), Some(2));

        let mut warmed = Vec::new();
        let mut seen = Vec::new();
        struct Recorder<'a> {
            warmed: &'a mut Vec<f64>,
            seen: &'a mut Vec<f64>,
        }
        impl Strategy for Recorder<'_> {
            fn update(&mut self, bar: &Bar) -> f64 {
                self.seen.push(bar.close());
                if self.seen.len() == 1 { 2.0 } else { 0.0 }
            }
            fn warm_up(&mut self, bar: &Bar) {
                self.warmed.push(bar.close());
            }
        }

        let pnl = broker
            .run(&mut Recorder {
                warmed: &mut warmed,
                seen: &mut seen,
            })
            .unwrap();

        assert_eq!(warmed, vec![5.0, 6.0]);
        assert_eq!(seen, vec![10.0, 12.0, 11.0]);
        assert_eq!(pnl, 2.0);
        assert_eq!(broker.positions().pnl(), vec![0.0, 4.0, 2.0]);
        assert_eq!(broker.positions().final_pnl(), Some(2.0));

        // a second run needs a fresh reset
        assert!(matches!(broker.run(&mut |_: &Bar| 0.0), Err(Error::PhaseOrder { .. })));
    }

    #[test]
    fn run_drops_rejected_orders() {
        let mut broker = Broker::new(get_data(&[1.0, 2.0, 3.0])).unwrap();
        broker.reset("2022", "2023-01-01 02:00:00").unwrap();
        let pnl = broker.run(&mut |bar: &Bar| if bar.index() == 1 { f64::NAN } else { 1.0 }).unwrap();

        assert_eq!(broker.orders().len(), 2);
        assert_eq!(broker.get_current_position().volume(), 2.0);
        assert_eq!(broker.get_current_position().average_price(), 2.0);
        assert_eq!(pnl, 2.0);
    }

    #[test]
    fn pre_bar() {
        let mut broker = Broker::new(get_data(&[1.0, 2.0, 3.0])).unwrap();
        broker.reset("2022", "2023-01-01 02:00:00").unwrap();
        assert!(broker.get_pre_bar().is_none());
        step(&mut broker, 0.0).unwrap();
        assert_eq!(broker.get_pre_bar().unwrap().close(), 1.0);
        assert_eq!(broker.get_current_bar().unwrap().close(), 2.0);
    }

    #[test]
    fn save_result_tables() {
        let mut broker = Broker::new(get_data(&[1.0, 2.0, 3.0])).unwrap();
        broker.reset("2022", "2023-01-01 02:00:00").unwrap();
        broker.run(&mut |_: &Bar| 1.0).unwrap();

        let mut store = MemoryStore::default();
        broker.save_result(&mut store, CHUNK_SIZE).unwrap();
        assert_eq!(store.table(ORDER_TABLE).len(), 3);
        assert_eq!(store.table(POSITION_TABLE).len(), 6);
        assert_eq!(store.table(POSITION_TABLE)[0]["status"], "pre_trade");
        assert_eq!(store.table(POSITION_TABLE)[5]["status"], "post_trade");
        assert_eq!(store.table(ORDER_TABLE)[0]["type"], "long_open");
    }

    #[test]
    fn snapshot_index_follows_cursor() {
        // bars without an index column all carry index 0
        let bars = (0..3)
            .map(|i| {
                BarBuilder::builder()
                    .datetime(format!("2023-01-01 {:02}:00:00", i))
                    .open(1.0)
                    .high(1.0)
                    .low(1.0)
                    .close(1.0)
                    .build()
                    .unwrap()
            })
            .collect::<Vec<_>>();
        let mut broker = Broker::new(Arc::from_iter(bars)).unwrap();
        broker.reset("2023-01-01 00:00:00", "2023-01-01 02:00:00").unwrap();

        step(&mut broker, 1.0).unwrap();
        assert_eq!(broker.get_current_position().index(), 1);
        step(&mut broker, 0.0).unwrap();
        assert_eq!(broker.get_current_position().index(), 2);

        let indices: Vec<usize> = broker.positions().iter().map(|p| p.index()).collect();
        assert_eq!(indices, vec![1, 1, 2, 2]);
    }

    #[test]
    fn failed_save_keeps_logs() {
        let mut broker = Broker::new(get_data(&[1.0, 2.0, 3.0])).unwrap();
        broker.reset("2022", "2023-01-01 02:00:00").unwrap();
        broker.run(&mut |_: &Bar| 1.0).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).unwrap();
        // a directory where the order table file should be
        std::fs::create_dir(store.path(ORDER_TABLE)).unwrap();

        let result = broker.save_result(&mut store, CHUNK_SIZE);
        assert!(matches!(result, Err(Error::IoError(_))));
        assert_eq!(broker.orders().len(), 3);
        assert_eq!(broker.positions().len(), 6);
    }
}
