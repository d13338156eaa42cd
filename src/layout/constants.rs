//! Wire constants for the two segment layouts

/// Signature of the adjacency layout
pub const ADJACENCY_SIGNATURE: u32 = 0xDEAD_BEEF;

/// Signature of the offset-table layout ("HWiS" little-endian)
pub const OFFSET_TABLE_SIGNATURE: u32 = 0x5369_5748;

/// Adjacency header: five u32 fields
pub const ADJACENCY_HEADER_SIZE: usize = 20;

/// Adjacency group record: id, instance, reading count, reserved
pub const ADJACENCY_GROUP_SIZE: usize = 16;

/// Adjacency reading record with natural C alignment
/// (three u32, 4 bytes padding, three f64, eight reserved u32)
pub const ADJACENCY_READING_SIZE: usize = 72;

/// Offset-table header (packed)
pub const OFFSET_TABLE_HEADER_SIZE: usize = 44;

/// Length of a label field
pub const LABEL_LEN: usize = 128;

/// Length of a unit field
pub const UNIT_LEN: usize = 16;

/// Offset-table sensor record (packed): id, instance, two labels
pub const OFFSET_TABLE_GROUP_SIZE: usize = 8 + 2 * LABEL_LEN;

/// Offset-table reading record (packed)
pub const OFFSET_TABLE_READING_SIZE: usize = 12 + 2 * LABEL_LEN + UNIT_LEN + 4 * 8;
