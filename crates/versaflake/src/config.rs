use crate::{error::Error, layout::Layout, Result};
use jiff::Timestamp;
use typed_builder::TypedBuilder;

/// 2025-01-01T00:00:00Z in milliseconds since the Unix epoch.
pub const DEFAULT_EPOCH_MILLIS: i64 = 1_735_689_600_000;
/// 41 timestamp bits last roughly 69 years past the epoch.
pub const DEFAULT_TIMESTAMP_BITS: u32 = 41;
pub const DEFAULT_NODE_ID_BITS: u32 = 10;
pub const DEFAULT_SEQUENCE_BITS: u32 = 12;
/// Bit 63 stays clear so ids remain non-negative as `i64`.
pub const MAX_TOTAL_BITS: u32 = 63;

/// Unvalidated configuration input. Turn it into a [`Configuration`] with
/// `Configuration::try_from`.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct ConfigurationSettings {
    /// Milliseconds since the Unix epoch that id timestamps count from.
    #[builder(default = DEFAULT_EPOCH_MILLIS)]
    pub epoch_millis: i64,
    #[builder(default = DEFAULT_TIMESTAMP_BITS)]
    pub timestamp_bits: u32,
    #[builder(default = DEFAULT_NODE_ID_BITS)]
    pub node_id_bits: u32,
    #[builder(default = DEFAULT_SEQUENCE_BITS)]
    pub sequence_bits: u32,
    /// Fail allocation on clock regression instead of waiting for the clock
    /// to catch up.
    #[builder(default = false)]
    pub strict_mode: bool,
}

impl Default for ConfigurationSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Validated, immutable id layout and clock policy.
///
/// The timestamp field holds `now - epoch` masked to `timestamp_bits`. Once
/// more than `2^timestamp_bits - 1` milliseconds have passed since the epoch
/// the field wraps to zero and new ids may collide with old ones. Nothing
/// checks for this at runtime, so pick the epoch and width accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    epoch_millis: i64,
    timestamp_bits: u32,
    node_id_bits: u32,
    sequence_bits: u32,
    strict_mode: bool,
}

impl Configuration {
    pub fn new(
        epoch_millis: i64,
        timestamp_bits: u32,
        node_id_bits: u32,
        sequence_bits: u32,
        strict_mode: bool,
    ) -> Result<Self> {
        let invalid = Error::InvalidBitConfiguration {
            timestamp_bits,
            node_id_bits,
            sequence_bits,
        };

        let total = u64::from(timestamp_bits) + u64::from(node_id_bits) + u64::from(sequence_bits);
        if total > u64::from(MAX_TOTAL_BITS) {
            return Err(invalid);
        }
        if timestamp_bits == 0 || node_id_bits == 0 || sequence_bits == 0 {
            return Err(invalid);
        }

        Ok(Self {
            epoch_millis,
            timestamp_bits,
            node_id_bits,
            sequence_bits,
            strict_mode,
        })
    }

    pub fn epoch_millis(&self) -> i64 {
        self.epoch_millis
    }

    /// The epoch as an instant. `None` if the millisecond value lies outside
    /// the range `jiff` supports.
    pub fn epoch(&self) -> Option<Timestamp> {
        Timestamp::from_millisecond(self.epoch_millis).ok()
    }

    pub fn timestamp_bits(&self) -> u32 {
        self.timestamp_bits
    }

    pub fn node_id_bits(&self) -> u32 {
        self.node_id_bits
    }

    pub fn sequence_bits(&self) -> u32 {
        self.sequence_bits
    }

    pub fn is_strict(&self) -> bool {
        self.strict_mode
    }

    pub fn max_node_id(&self) -> u64 {
        self.layout().max_node_id()
    }

    pub fn layout(&self) -> Layout {
        Layout::new(self.timestamp_bits, self.node_id_bits, self.sequence_bits)
    }
}

impl TryFrom<ConfigurationSettings> for Configuration {
    type Error = Error;

    fn try_from(settings: ConfigurationSettings) -> Result<Self> {
        Self::new(
            settings.epoch_millis,
            settings.timestamp_bits,
            settings.node_id_bits,
            settings.sequence_bits,
            settings.strict_mode,
        )
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            epoch_millis: DEFAULT_EPOCH_MILLIS,
            timestamp_bits: DEFAULT_TIMESTAMP_BITS,
            node_id_bits: DEFAULT_NODE_ID_BITS,
            sequence_bits: DEFAULT_SEQUENCE_BITS,
            strict_mode: false,
        }
    }
}
