use serde::{Deserialize, Serialize};

/// Elementary transition applied to the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Opens or adds to a long position.
    LongOpen,
    /// Reduces or flattens a long position.
    LongClose,
    /// Opens or adds to a short position.
    ShortOpen,
    /// Reduces or flattens a short position.
    ShortClose,
}

impl OrderType {
    /// Returns `true` for the two closing transitions.
    pub fn is_close(&self) -> bool {
        matches!(self, Self::LongClose | Self::ShortClose)
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LongOpen => write!(f, "long_open"),
            Self::LongClose => write!(f, "long_close"),
            Self::ShortOpen => write!(f, "short_open"),
            Self::ShortClose => write!(f, "short_close"),
        }
    }
}

/// An executed order. Immutable once created.
///
/// Serializes as the order log row `(type, datetime, price, volume)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(skip)]
    id: usize,
    #[serde(rename = "type")]
    order_type: OrderType,
    datetime: String,
    price: f64,
    volume: f64,
}

type O1 = (usize, OrderType, String, f64, f64);
impl From<O1> for Order {
    fn from((id, order_type, datetime, price, volume): O1) -> Self {
        Self {
            id,
            order_type,
            datetime,
            price,
            volume,
        }
    }
}

impl Order {
    /// Returns the sequence id, strictly increasing within a run.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the transition type.
    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Returns the timestamp of the bar the order filled on.
    pub fn datetime(&self) -> &str {
        &self.datetime
    }

    /// Returns the fill price.
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Returns the signed volume (> 0 buys, < 0 sells).
    pub fn volume(&self) -> f64 {
        self.volume
    }
}

#[cfg(test)]
#[test]
fn order_row() {
    let order = Order::from((4, OrderType::ShortClose, "2023-01-01 10:00:00".to_string(), 99.5, 2.0));
    assert_eq!(order.id(), 4);
    assert!(order.order_type().is_close());

    let row = serde_json::to_value(&order).unwrap();
    assert_eq!(
        row,
        serde_json::json!({
            "type": "short_close",
            "datetime": "2023-01-01 10:00:00",
            "price": 99.5,
            "volume": 2.0,
        })
    );
}

#[cfg(test)]
#[test]
fn order_type_display() {
    assert_eq!(OrderType::LongOpen.to_string(), "long_open");
    assert_eq!(OrderType::ShortOpen.to_string(), "short_open");
    assert!(!OrderType::ShortOpen.is_close());
}
