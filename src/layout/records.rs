//! Sensor group and reading records for both layouts
//!
//! Records are copied out of the segment when parsed, so they stay valid
//! after the mapping is released. The two layouts keep separate record types;
//! their fields are not unified.

use std::fmt;

use super::constants::*;
use super::cursor::ByteCursor;
use crate::error::Result;

/// A record with a fixed wire size
pub trait WireRecord: Sized {
    /// Bytes consumed by [`WireRecord::parse`]
    const WIRE_SIZE: usize;

    /// Parse one record at the cursor, advancing exactly `WIRE_SIZE` bytes
    fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self>;
}

/// Fixed-width, NUL-padded text field
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FixedText<const N: usize>([u8; N]);

impl<const N: usize> FixedText<N> {
    pub fn from_bytes(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Build a field from a string, truncating to `N` bytes
    pub fn from_str_lossy(text: &str) -> Self {
        let mut bytes = [0u8; N];
        let len = text.len().min(N);
        bytes[..len].copy_from_slice(&text.as_bytes()[..len]);
        Self(bytes)
    }

    /// Bytes up to the first NUL, or the whole field if there is none
    pub fn content(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(N);
        &self.0[..end]
    }

    /// Decoded text; invalid sequences become U+FFFD
    pub fn decode(&self) -> String {
        String::from_utf8_lossy(self.content()).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.content().is_empty()
    }

    pub fn raw(&self) -> &[u8; N] {
        &self.0
    }

    fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        cursor.read_array().map(Self)
    }
}

impl<const N: usize> fmt::Debug for FixedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.decode())
    }
}

/// Group record of the adjacency layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacencyGroup {
    pub id: u32,
    pub instance: u32,
    /// Readings stored immediately after this record
    pub reading_count: u32,
}

impl WireRecord for AdjacencyGroup {
    const WIRE_SIZE: usize = ADJACENCY_GROUP_SIZE;

    fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        cursor.ensure(Self::WIRE_SIZE)?;
        let record = Self {
            id: cursor.read_u32()?,
            instance: cursor.read_u32()?,
            reading_count: cursor.read_u32()?,
        };
        cursor.skip(4)?;
        Ok(record)
    }
}

/// Reading record of the adjacency layout (no labels, no running average)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjacencyReading {
    pub group_id: u32,
    pub group_instance: u32,
    pub reading_id: u32,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl WireRecord for AdjacencyReading {
    const WIRE_SIZE: usize = ADJACENCY_READING_SIZE;

    fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        cursor.ensure(Self::WIRE_SIZE)?;
        let group_id = cursor.read_u32()?;
        let group_instance = cursor.read_u32()?;
        let reading_id = cursor.read_u32()?;
        cursor.skip(4)?;
        let record = Self {
            group_id,
            group_instance,
            reading_id,
            value: cursor.read_f64()?,
            min: cursor.read_f64()?,
            max: cursor.read_f64()?,
        };
        cursor.skip(32)?;
        Ok(record)
    }
}

/// Sensor record of the offset-table layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetTableGroup {
    pub id: u32,
    pub instance: u32,
    pub label_orig: FixedText<LABEL_LEN>,
    pub label_user: FixedText<LABEL_LEN>,
}

impl WireRecord for OffsetTableGroup {
    const WIRE_SIZE: usize = OFFSET_TABLE_GROUP_SIZE;

    fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        cursor.ensure(Self::WIRE_SIZE)?;
        Ok(Self {
            id: cursor.read_u32()?,
            instance: cursor.read_u32()?,
            label_orig: FixedText::read(cursor)?,
            label_user: FixedText::read(cursor)?,
        })
    }
}

/// Reading record of the offset-table layout
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetTableReading {
    /// Producer's reading type tag, passed through undecoded
    pub reading_type: u32,
    /// Index into the sensor section
    pub group_index: u32,
    pub reading_id: u32,
    pub label_orig: FixedText<LABEL_LEN>,
    pub label_user: FixedText<LABEL_LEN>,
    pub unit: FixedText<UNIT_LEN>,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl WireRecord for OffsetTableReading {
    const WIRE_SIZE: usize = OFFSET_TABLE_READING_SIZE;

    fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        cursor.ensure(Self::WIRE_SIZE)?;
        Ok(Self {
            reading_type: cursor.read_u32()?,
            group_index: cursor.read_u32()?,
            reading_id: cursor.read_u32()?,
            label_orig: FixedText::read(cursor)?,
            label_user: FixedText::read(cursor)?,
            unit: FixedText::read(cursor)?,
            value: cursor.read_f64()?,
            min: cursor.read_f64()?,
            max: cursor.read_f64()?,
            avg: cursor.read_f64()?,
        })
    }
}

/// Sensor group record of either layout
#[derive(Debug, Clone, PartialEq)]
pub enum SensorGroupRecord {
    Adjacency(AdjacencyGroup),
    OffsetTable(OffsetTableGroup),
}

impl SensorGroupRecord {
    pub fn id(&self) -> u32 {
        match self {
            SensorGroupRecord::Adjacency(g) => g.id,
            SensorGroupRecord::OffsetTable(g) => g.id,
        }
    }

    pub fn instance(&self) -> u32 {
        match self {
            SensorGroupRecord::Adjacency(g) => g.instance,
            SensorGroupRecord::OffsetTable(g) => g.instance,
        }
    }

    /// Reading count stored in the record (adjacency layout only)
    pub fn reading_count(&self) -> Option<u32> {
        match self {
            SensorGroupRecord::Adjacency(g) => Some(g.reading_count),
            SensorGroupRecord::OffsetTable(_) => None,
        }
    }

    /// Producer's original label and the user's override, if the layout has them
    pub fn labels(&self) -> Option<(String, String)> {
        match self {
            SensorGroupRecord::Adjacency(_) => None,
            SensorGroupRecord::OffsetTable(g) => Some((g.label_orig.decode(), g.label_user.decode())),
        }
    }
}

/// Reading record of either layout
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingRecord {
    Adjacency(AdjacencyReading),
    OffsetTable(OffsetTableReading),
}

impl ReadingRecord {
    pub fn reading_id(&self) -> u32 {
        match self {
            ReadingRecord::Adjacency(r) => r.reading_id,
            ReadingRecord::OffsetTable(r) => r.reading_id,
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            ReadingRecord::Adjacency(r) => r.value,
            ReadingRecord::OffsetTable(r) => r.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_text_terminates_at_nul() {
        let mut bytes = [0u8; 16];
        bytes[..3].copy_from_slice(b"MHz");
        bytes[4..8].copy_from_slice(b"junk");
        let text = FixedText::from_bytes(bytes);
        assert_eq!(text.decode(), "MHz");
        assert_eq!(text.content(), b"MHz");
    }

    #[test]
    fn test_fixed_text_without_terminator() {
        let text = FixedText::<LABEL_LEN>::from_bytes([b'x'; LABEL_LEN]);
        let decoded = text.decode();
        assert_eq!(decoded.len(), LABEL_LEN);
        assert!(decoded.chars().all(|c| c == 'x'));
    }

    #[test]
    fn test_fixed_text_invalid_utf8() {
        let mut bytes = [0u8; 16];
        bytes[..4].copy_from_slice(&[b'A', 0xFF, 0xFE, b'B']);
        let decoded = FixedText::from_bytes(bytes).decode();
        assert!(decoded.starts_with('A'));
        assert!(decoded.ends_with('B'));
        assert!(decoded.contains('\u{FFFD}'));
    }

    #[test]
    fn test_adjacency_reading_layout() {
        let mut bytes = Vec::new();
        for field in [7u32, 1, 0x5000_000] {
            bytes.extend_from_slice(&field.to_le_bytes());
        }
        bytes.extend_from_slice(&[0xEE; 4]);
        for value in [55.0f64, 30.0, 90.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(&[0xEE; 32]);
        assert_eq!(bytes.len(), ADJACENCY_READING_SIZE);

        let mut cursor = ByteCursor::new(&bytes);
        let reading = AdjacencyReading::parse(&mut cursor).unwrap();
        assert_eq!(reading.group_id, 7);
        assert_eq!(reading.reading_id, 0x5000_000);
        assert_eq!(reading.value, 55.0);
        assert_eq!(reading.max, 90.0);
        assert_eq!(cursor.offset(), ADJACENCY_READING_SIZE);
    }

    #[test]
    fn test_partial_record_is_truncated() {
        let bytes = [0u8; OFFSET_TABLE_READING_SIZE - 1];
        let mut cursor = ByteCursor::new(&bytes);
        assert!(OffsetTableReading::parse(&mut cursor).is_err());
        assert_eq!(cursor.offset(), 0);
    }
}
