//! Segment headers for the adjacency and offset-table layouts

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::constants::*;
use super::cursor::ByteCursor;
use super::limits::DecodeLimits;
use crate::error::{Result, ShmError, INACTIVE_SIGNATURE};

/// Which binary arrangement the caller expects in the segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutVariant {
    /// Groups followed immediately by their readings
    Adjacency,
    /// Header carries absolute offsets and element sizes for both sections
    OffsetTable,
}

impl LayoutVariant {
    /// Magic value expected at offset 0
    pub fn signature(&self) -> u32 {
        match self {
            LayoutVariant::Adjacency => ADJACENCY_SIGNATURE,
            LayoutVariant::OffsetTable => OFFSET_TABLE_SIGNATURE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LayoutVariant::Adjacency => "adjacency",
            LayoutVariant::OffsetTable => "offset-table",
        }
    }
}

impl fmt::Display for LayoutVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutVariant {
    type Err = ShmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "adjacency" | "a" | "legacy" => Ok(LayoutVariant::Adjacency),
            "offset-table" | "offset_table" | "b" | "sm2" => Ok(LayoutVariant::OffsetTable),
            other => Err(ShmError::invalid_parameter(
                "layout",
                format!("Unknown layout '{}', expected adjacency or offset-table", other),
            )),
        }
    }
}

/// Header of the adjacency layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdjacencyHeader {
    pub signature: u32,
    pub version: u32,
    pub revision: u32,
    /// Producer polling period in milliseconds
    pub polling_period: u32,
    pub group_count: u32,
}

impl AdjacencyHeader {
    fn parse(signature: u32, cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            signature,
            version: cursor.read_u32()?,
            revision: cursor.read_u32()?,
            polling_period: cursor.read_u32()?,
            group_count: cursor.read_u32()?,
        })
    }

    /// Reject counts that cannot fit even with zero readings per group
    fn validate(&self, limits: &DecodeLimits, extent: usize) -> Result<()> {
        limits.check_groups("group_count", self.group_count as u64)?;

        let minimum = self.group_count as usize * ADJACENCY_GROUP_SIZE;
        if ADJACENCY_HEADER_SIZE + minimum > extent {
            return Err(ShmError::truncated(ADJACENCY_HEADER_SIZE, minimum, extent));
        }
        Ok(())
    }
}

/// Location of one array inside the offset-table layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionDescriptor {
    /// Absolute offset of the first element
    pub offset: u32,
    /// Stride between elements
    pub element_size: u32,
    /// Number of elements
    pub count: u32,
}

impl SectionDescriptor {
    fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            offset: cursor.read_u32()?,
            element_size: cursor.read_u32()?,
            count: cursor.read_u32()?,
        })
    }

    /// Offset of element `index`
    pub fn element_offset(&self, index: u32) -> usize {
        self.offset as usize + index as usize * self.element_size as usize
    }

    /// One past the last byte of the section
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.element_size as u64 * self.count as u64
    }

    fn validate(&self, record_size: usize, extent: usize) -> Result<()> {
        // Producers may leave offset and stride unset on an empty section.
        if self.count == 0 {
            return Ok(());
        }
        if (self.element_size as usize) < record_size {
            return Err(ShmError::stride_too_small(
                self.offset as usize,
                self.element_size as usize,
                record_size,
            ));
        }
        if self.end() > extent as u64 {
            let needed = self.end() - self.offset as u64;
            return Err(ShmError::truncated(
                self.offset as usize,
                usize::try_from(needed).unwrap_or(usize::MAX),
                extent,
            ));
        }
        Ok(())
    }
}

/// Header of the offset-table layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OffsetTableHeader {
    pub signature: u32,
    pub version: u32,
    pub revision: u32,
    /// Time of the producer's last poll
    pub poll_time: i64,
    pub sensors: SectionDescriptor,
    pub readings: SectionDescriptor,
}

impl OffsetTableHeader {
    fn parse(signature: u32, cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            signature,
            version: cursor.read_u32()?,
            revision: cursor.read_u32()?,
            poll_time: cursor.read_i64()?,
            sensors: SectionDescriptor::parse(cursor)?,
            readings: SectionDescriptor::parse(cursor)?,
        })
    }

    fn validate(&self, limits: &DecodeLimits, extent: usize) -> Result<()> {
        limits.check_groups("sensor_count", self.sensors.count as u64)?;
        limits.check_readings("reading_count", self.readings.count as u64)?;
        self.sensors.validate(OFFSET_TABLE_GROUP_SIZE, extent)?;
        self.readings.validate(OFFSET_TABLE_READING_SIZE, extent)?;
        Ok(())
    }
}

/// Validated header, tagged with the layout it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SegmentHeader {
    Adjacency(AdjacencyHeader),
    OffsetTable(OffsetTableHeader),
}

impl SegmentHeader {
    /// Read and validate the header at the start of `bytes`.
    ///
    /// The signature is checked before any other field is interpreted.
    pub fn read(bytes: &[u8], variant: LayoutVariant, limits: &DecodeLimits) -> Result<Self> {
        limits.validate()?;
        let mut cursor = ByteCursor::with_ceiling(bytes, limits.max_segment_bytes);

        let signature = cursor.read_u32()?;
        if signature != variant.signature() {
            if signature == INACTIVE_SIGNATURE {
                warn!("Producer marked the segment inactive (shared memory support disabled?)");
            } else {
                debug!(
                    "Signature {:#010x} does not match {} layout ({:#010x})",
                    signature,
                    variant,
                    variant.signature()
                );
            }
            return Err(ShmError::signature_mismatch(variant.signature(), signature));
        }

        let extent = cursor.extent();
        let header = match variant {
            LayoutVariant::Adjacency => {
                let header = AdjacencyHeader::parse(signature, &mut cursor)?;
                header.validate(limits, extent)?;
                SegmentHeader::Adjacency(header)
            }
            LayoutVariant::OffsetTable => {
                let header = OffsetTableHeader::parse(signature, &mut cursor)?;
                header.validate(limits, extent)?;
                SegmentHeader::OffsetTable(header)
            }
        };

        debug!(
            "{} header: version {}, revision {}, {} groups",
            variant,
            header.version(),
            header.revision(),
            header.group_count()
        );
        Ok(header)
    }

    pub fn variant(&self) -> LayoutVariant {
        match self {
            SegmentHeader::Adjacency(_) => LayoutVariant::Adjacency,
            SegmentHeader::OffsetTable(_) => LayoutVariant::OffsetTable,
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            SegmentHeader::Adjacency(h) => h.version,
            SegmentHeader::OffsetTable(h) => h.version,
        }
    }

    pub fn revision(&self) -> u32 {
        match self {
            SegmentHeader::Adjacency(h) => h.revision,
            SegmentHeader::OffsetTable(h) => h.revision,
        }
    }

    /// Number of sensor groups announced by the header
    pub fn group_count(&self) -> u32 {
        match self {
            SegmentHeader::Adjacency(h) => h.group_count,
            SegmentHeader::OffsetTable(h) => h.sensors.count,
        }
    }

    /// Number of readings announced by the header, when the layout states it
    pub fn reading_count(&self) -> Option<u32> {
        match self {
            SegmentHeader::Adjacency(_) => None,
            SegmentHeader::OffsetTable(h) => Some(h.readings.count),
        }
    }

    /// Size of the fixed header in bytes
    pub fn size(&self) -> usize {
        match self {
            SegmentHeader::Adjacency(_) => ADJACENCY_HEADER_SIZE,
            SegmentHeader::OffsetTable(_) => OFFSET_TABLE_HEADER_SIZE,
        }
    }
}
