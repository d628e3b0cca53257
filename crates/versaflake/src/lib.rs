//! Time-ordered 64-bit id generation for independent nodes.
//!
//! A [`Versaflake`] packs the milliseconds elapsed since a configurable epoch,
//! a node id and a per-millisecond sequence into one `u64`. Field widths and
//! the clock-regression policy come from a validated [`Configuration`].

mod clock;
mod config;
pub mod error;
mod layout;
mod versaflake;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    Configuration, ConfigurationSettings, DEFAULT_EPOCH_MILLIS, DEFAULT_NODE_ID_BITS,
    DEFAULT_SEQUENCE_BITS, DEFAULT_TIMESTAMP_BITS, MAX_TOTAL_BITS,
};
pub use error::{Error, Result};
pub use layout::{IdParts, Layout};
pub use versaflake::Versaflake;
