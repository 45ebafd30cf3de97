use crate::engine::OrderType;

/// Result type of the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Phase of the per-bar protocol, used to report out-of-order calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `reset` of the broker.
    Reset,
    /// `pre_trade` marking.
    PreTrade,
    /// `insert_order` matching.
    InsertOrder,
    /// `post_trade` settlement.
    PostTrade,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reset => write!(f, "reset"),
            Self::PreTrade => write!(f, "pre_trade"),
            Self::InsertOrder => write!(f, "insert_order"),
            Self::PostTrade => write!(f, "post_trade"),
        }
    }
}

/// Errors raised by the broker, its collaborators and the sweep.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The bar data provided is empty. A run requires at least one bar.
    #[error("Bar data is empty: a run requires at least one bar")]
    BarDataEmpty,

    /// A strategy parameter cannot build a strategy.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No bar at this index.
    #[error("Bar not found at index {0}")]
    BarNotFound(usize),

    /// The bar could not be built.
    #[error("Invalid bar: {0}")]
    InvalidBar(String),

    /// The time window resolves to an empty or inverted index range.
    #[error("Invalid window: start {start_time}, end {end_time}")]
    InvalidWindow {
        /// Requested start time.
        start_time: String,
        /// Requested end time.
        end_time: String,
    },

    /// A protocol phase was called before `reset`.
    #[error("Broker is not reset: call `reset` before trading")]
    NotReset,

    /// Every bar of the window has already been settled.
    #[error("Window exhausted at index {0}")]
    WindowExhausted(usize),

    /// The requested volume is not a finite number.
    #[error("Invalid order volume: {0}")]
    InvalidVolume(f64),

    /// An opening transition got a volume of the wrong sign or an opposite position.
    #[error("Cannot {order_type} volume {volume} against position {position}")]
    OpenVolume {
        /// Transition that was attempted.
        order_type: OrderType,
        /// Requested signed volume.
        volume: f64,
        /// Position volume before the transition.
        position: f64,
    },

    /// A closing transition got a volume of the wrong sign, no exposure or too much volume.
    #[error("Cannot {order_type} volume {volume} against position {position}")]
    CloseVolume {
        /// Transition that was attempted.
        order_type: OrderType,
        /// Requested signed volume.
        volume: f64,
        /// Position volume before the transition.
        position: f64,
    },

    /// The per-bar protocol was driven out of order. This is a bug in the caller.
    #[error("Phase {phase} called after {previous}")]
    PhaseOrder {
        /// Phase that was called.
        phase: Phase,
        /// Last phase that completed.
        previous: Phase,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` when the run must not start (bad data or window).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::BarDataEmpty
                | Self::InvalidParameter(_)
                | Self::BarNotFound(_)
                | Self::InvalidBar(_)
                | Self::InvalidWindow { .. }
                | Self::NotReset
                | Self::WindowExhausted(_)
        )
    }

    /// Returns `true` when only the offending order is rejected and the run can go on.
    pub fn is_execution(&self) -> bool {
        matches!(
            self,
            Self::InvalidVolume(_) | Self::OpenVolume { .. } | Self::CloseVolume { .. }
        )
    }
}

#[cfg(test)]
#[test]
fn classify_errors() {
    assert!(Error::BarDataEmpty.is_configuration());
    assert!(
        Error::InvalidWindow {
            start_time: "b".into(),
            end_time: "a".into()
        }
        .is_configuration()
    );
    assert!(Error::InvalidVolume(f64::NAN).is_execution());
    assert!(
        Error::CloseVolume {
            order_type: OrderType::LongClose,
            volume: -1.0,
            position: 0.0
        }
        .is_execution()
    );

    let err = Error::PhaseOrder {
        phase: Phase::PostTrade,
        previous: Phase::PostTrade,
    };
    assert!(!err.is_execution());
    assert!(!err.is_configuration());
    assert_eq!(err.to_string(), "Phase post_trade called after post_trade");
}
