use std::fmt;

/// Bit positions and masks derived from a [`Configuration`](crate::Configuration).
///
/// From the most significant end an id is laid out as
/// `[unused sign bit][timestamp][node id][sequence]`, with any width the
/// configuration leaves over sitting as zeros above the timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    node_id_shift: u32,
    timestamp_shift: u32,
    sequence_mask: u64,
    node_id_mask: u64,
    timestamp_mask: u64,
}

impl Layout {
    /// Widths must already be validated; every width is below 64 here.
    pub(crate) fn new(timestamp_bits: u32, node_id_bits: u32, sequence_bits: u32) -> Self {
        Self {
            node_id_shift: sequence_bits,
            timestamp_shift: node_id_bits + sequence_bits,
            sequence_mask: low_bits(sequence_bits),
            node_id_mask: low_bits(node_id_bits),
            timestamp_mask: low_bits(timestamp_bits),
        }
    }

    pub fn node_id_shift(&self) -> u32 {
        self.node_id_shift
    }

    pub fn timestamp_shift(&self) -> u32 {
        self.timestamp_shift
    }

    pub fn sequence_mask(&self) -> u64 {
        self.sequence_mask
    }

    pub fn timestamp_mask(&self) -> u64 {
        self.timestamp_mask
    }

    /// Largest node id representable in the node id field.
    pub fn max_node_id(&self) -> u64 {
        self.node_id_mask
    }

    /// Truncates milliseconds elapsed since the epoch to the timestamp field.
    ///
    /// Elapsed time past the field's capacity wraps around silently.
    pub fn time_field(&self, elapsed_millis: i64) -> u64 {
        (elapsed_millis as u64) & self.timestamp_mask
    }

    /// Packs the three fields into an id. Each field is masked to its width.
    pub fn compose(&self, time_field: u64, node_id: u64, sequence: u64) -> u64 {
        ((time_field & self.timestamp_mask) << self.timestamp_shift)
            | ((node_id & self.node_id_mask) << self.node_id_shift)
            | (sequence & self.sequence_mask)
    }

    pub fn decompose(&self, id: u64) -> IdParts {
        IdParts {
            time_field: (id >> self.timestamp_shift) & self.timestamp_mask,
            node_id: (id >> self.node_id_shift) & self.node_id_mask,
            sequence: id & self.sequence_mask,
        }
    }
}

fn low_bits(bits: u32) -> u64 {
    (1_u64 << bits) - 1
}

/// The fields of a decoded id.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdParts {
    /// Milliseconds since the epoch, truncated to the timestamp width.
    pub time_field: u64,
    pub node_id: u64,
    pub sequence: u64,
}

impl IdParts {
    /// Wall-clock milliseconds the id was allocated at, assuming the timestamp
    /// field never wrapped.
    pub fn timestamp_millis(&self, epoch_millis: i64) -> i64 {
        epoch_millis.wrapping_add(self.time_field as i64)
    }
}

impl fmt::Debug for IdParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdParts")
            .field("time_field", &self.time_field)
            .field("node_id", &self.node_id)
            .field("sequence", &self.sequence)
            .finish()
    }
}
