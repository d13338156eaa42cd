//! Binary layout of the telemetry segment
//!
//! Two incompatible arrangements share the same segment name:
//! 1. Adjacency layout: header, then each group record followed directly by
//!    its readings. Locating group *n* requires walking groups *0..n*.
//! 2. Offset-table layout: header with absolute offset, element size and
//!    count for a sensor section and a reading section; readings point at
//!    their sensor by index.
//!
//! The caller names the variant; the header signature confirms it. All reads
//! go through [`ByteCursor`].

pub mod constants;
pub mod cursor;
pub mod decoder;
pub mod headers;
pub mod limits;
pub mod records;

pub use constants::*;
pub use cursor::ByteCursor;
pub use decoder::{
    decode, DecodedGroup, DecodedSegment, GroupWalk, SectionIter, SegmentDecoder, WalkState,
};
pub use headers::{
    AdjacencyHeader, LayoutVariant, OffsetTableHeader, SectionDescriptor, SegmentHeader,
};
pub use limits::DecodeLimits;
pub use records::{
    AdjacencyGroup, AdjacencyReading, FixedText, OffsetTableGroup, OffsetTableReading,
    ReadingRecord, SensorGroupRecord, WireRecord,
};
