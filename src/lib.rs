//! # hwshm - Hardware telemetry from a shared memory segment
//!
//! A hardware monitoring application publishes sensor readings into a named,
//! continuously updated shared memory segment. hwshm maps that segment
//! read-only, validates it and walks its self-describing binary layout into
//! plain [`SensorReading`] values.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │  MappingHandle   │──▶│  SegmentDecoder  │──▶│    projection    │──▶ Vec<SensorReading>
//! │ (read-only view) │   │ (header + walk)  │   │ (group ⨝ reading)│
//! └──────────────────┘   └──────────────────┘   └──────────────────┘
//!           │                     ▲
//!           └──▶ TargetedLookup ──┘  (stops at the first matching reading)
//! ```
//!
//! Two wire layouts share the segment name: the adjacency layout, where each
//! group record is followed by its readings, and the offset-table layout,
//! where the header gives absolute offsets and strides for a sensor section
//! and a reading section. The caller picks one; the header signature must
//! agree or the pass fails with [`ShmError::SignatureMismatch`].
//!
//! ```rust,no_run
//! use hwshm::{decode, project_segment, DecodeLimits, LayoutVariant, MappingHandle, SegmentConfig};
//!
//! let mut handle = MappingHandle::open(&SegmentConfig::default())?;
//! let segment = decode(&handle, LayoutVariant::OffsetTable, &DecodeLimits::default())?;
//! for reading in project_segment(&segment) {
//!     println!("{}: {} {}", reading.display_label(), reading.value, reading.unit);
//! }
//! handle.close();
//! # Ok::<(), hwshm::ShmError>(())
//! ```

pub mod error;
pub mod layout;
pub mod lookup;
pub mod memory;
pub mod monitor;
pub mod projection;
pub mod query;

pub use error::{Result, ShmError};
pub use layout::{
    decode, DecodeLimits, DecodedGroup, DecodedSegment, LayoutVariant, ReadingRecord,
    SegmentDecoder, SegmentHeader, SensorGroupRecord,
};
pub use lookup::{find, LookupKey, LookupStats, TargetedLookup};
pub use memory::{segment_exists, BackingType, MappingHandle, SegmentConfig};
pub use monitor::{poll_once, PollConfig, PollOutcome, PollState, SampleStatus, Selector};
pub use projection::{project, project_orphan, project_segment, SensorReading, TelemetrySnapshot};
pub use query::LabelIndex;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration constants
pub mod config {
    /// Segment name published by the producer
    pub const DEFAULT_SEGMENT_NAME: &str = "Global\\HWiNFO_SENS_SM2";

    /// Ceiling on the bytes any decode may address (16MB)
    pub const MAX_SEGMENT_BYTES: usize = 16 * 1024 * 1024;

    /// Default maximum number of sensor groups
    pub const DEFAULT_MAX_GROUPS: usize = 4096;

    /// Default maximum number of readings across all groups
    pub const DEFAULT_MAX_READINGS: usize = 65536;

    /// Readings shown per group when listing
    pub const DEFAULT_LIST_READINGS: usize = 5;

    /// Default delay between polls
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

    /// Default rolling history length
    pub const DEFAULT_HISTORY_CAPACITY: usize = 500;

    /// Samples ignored after a context change
    pub const DEFAULT_SETTLING_READINGS: usize = 3;
}
