use thiserror::Error;

/// Type alias for versaflake results.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by configuration, generator construction and ID allocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error(
        "invalid bit configuration: timestamp {timestamp_bits} + node id {node_id_bits} + sequence {sequence_bits} bits; each width must be positive and the total cannot exceed 63"
    )]
    InvalidBitConfiguration {
        timestamp_bits: u32,
        node_id_bits: u32,
        sequence_bits: u32,
    },
    #[error("invalid node id {node_id}; expected 0..={max_node_id}")]
    InvalidNodeId { node_id: i64, max_node_id: u64 },
    #[error("clock moved backward: last timestamp {last}, current timestamp {now}")]
    ClockMovedBackward { last: i64, now: i64 },
}
