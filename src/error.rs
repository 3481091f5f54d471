//! Error types.

use thiserror::Error;

/// Problems with a [`crate::TageConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one tagged component is required")]
    NoComponents,

    #[error("component {comp}: history length must be non-zero")]
    ZeroHistory { comp: usize },

    #[error("component {comp}: history length {len} is not longer than \
             the previous component ({prev})")]
    HistoryOrder { comp: usize, len: usize, prev: usize },

    #[error("{what}: {bits} index bits is outside 1..=24")]
    IndexBits { what: String, bits: usize },

    #[error("component {comp}: {bits} tag bits is outside 1..=16")]
    TagBits { comp: usize, bits: usize },

    #[error("component {comp}: {bits} useful bits is outside 1..=8")]
    UsefulBits { comp: usize, bits: usize },

    #[error("history register length {0} is not a power of two")]
    HistoryCapacity(usize),

    #[error("component {comp}: folds {len} history bits, but the history \
             register only holds {cap}")]
    HistoryTooShort { comp: usize, len: usize, cap: usize },

    #[error("{what}: invalid counter {min}..={max} (threshold {threshold}, \
             init {init})")]
    Counter { what: String, min: i8, max: i8, threshold: i8, init: i8 },

    #[error("aging period 2^{0} is outside 2^1..=2^31")]
    AgingPeriod(u32),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Misuse of the predict/update protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("prediction #{outstanding} is still awaiting an update")]
    Outstanding { outstanding: u64 },

    #[error("update for prediction #{got}, but no prediction is in flight")]
    NotInFlight { got: u64 },

    #[error("update for prediction #{got}, which was made by another predictor")]
    Foreign { got: u64 },
}

/// An update that was refused. The prediction is handed back so that it
/// can still be given to the predictor that made it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct UpdateRejected {
    #[source]
    pub error: ProtocolError,
    pub prediction: crate::TagePrediction,
}

/// Problems reading a branch trace.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("trace length {len} is not a multiple of the record size ({size})")]
    Truncated { len: usize, size: usize },

    #[error("invalid branch flags {0:#07b}")]
    InvalidFlags(u32),

    #[error("invalid branch pattern: {0}")]
    InvalidPattern(&'static str),
}
