//! Flattening decoded records into caller-facing sensor readings

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShmError};
use crate::layout::{
    DecodeLimits, DecodedSegment, LayoutVariant, ReadingRecord, SegmentDecoder, SegmentHeader,
    SensorGroupRecord,
};
use crate::memory::MappingHandle;

/// Group id given to readings whose group index could not be resolved
pub const UNKNOWN_GROUP_ID: u32 = u32::MAX;

/// Group label given to readings whose group index could not be resolved
pub const UNKNOWN_GROUP_LABEL: &str = "<unknown group>";

/// One reading joined with its owning group. Holds no reference into the mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub group_id: u32,
    pub group_instance: u32,
    pub group_label: String,
    pub group_label_user: String,
    pub reading_id: u32,
    /// Producer's type tag (offset-table layout only)
    pub reading_type: Option<u32>,
    pub label: String,
    pub label_user: String,
    pub unit: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    /// Running average (offset-table layout only)
    pub avg: Option<f64>,
}

impl SensorReading {
    /// User label if set, else the original label, else the hex reading id
    pub fn display_label(&self) -> String {
        pick_label(&self.label_user, &self.label)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:#x}", self.reading_id))
    }

    /// Same preference order for the owning group
    pub fn display_group_label(&self) -> String {
        pick_label(&self.group_label_user, &self.group_label)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:#x}/{}", self.group_id, self.group_instance))
    }

    /// Whether the owning group could not be resolved
    pub fn is_orphan(&self) -> bool {
        self.group_id == UNKNOWN_GROUP_ID && self.group_label == UNKNOWN_GROUP_LABEL
    }
}

fn pick_label<'a>(user: &'a str, orig: &'a str) -> Option<&'a str> {
    [user, orig].into_iter().find(|label| !label.trim().is_empty())
}

/// Join a reading with its group
pub fn project(group: &SensorGroupRecord, reading: &ReadingRecord) -> SensorReading {
    let (group_label, group_label_user) = group.labels().unwrap_or_default();
    let mut projected = project_reading(reading);
    projected.group_id = group.id();
    projected.group_instance = group.instance();
    projected.group_label = group_label;
    projected.group_label_user = group_label_user;
    projected
}

/// Project a reading whose group index was out of range
pub fn project_orphan(reading: &ReadingRecord) -> SensorReading {
    let mut projected = project_reading(reading);
    projected.group_id = UNKNOWN_GROUP_ID;
    projected.group_label = UNKNOWN_GROUP_LABEL.to_string();
    projected
}

fn project_reading(reading: &ReadingRecord) -> SensorReading {
    match reading {
        ReadingRecord::Adjacency(r) => SensorReading {
            group_id: r.group_id,
            group_instance: r.group_instance,
            group_label: String::new(),
            group_label_user: String::new(),
            reading_id: r.reading_id,
            reading_type: None,
            label: String::new(),
            label_user: String::new(),
            unit: String::new(),
            value: r.value,
            min: r.min,
            max: r.max,
            avg: None,
        },
        ReadingRecord::OffsetTable(r) => SensorReading {
            group_id: 0,
            group_instance: 0,
            group_label: String::new(),
            group_label_user: String::new(),
            reading_id: r.reading_id,
            reading_type: Some(r.reading_type),
            label: r.label_orig.decode(),
            label_user: r.label_user.decode(),
            unit: r.unit.decode(),
            value: r.value,
            min: r.min,
            max: r.max,
            avg: Some(r.avg),
        },
    }
}

/// Flatten a decoded segment: groups in segment order, readings in their
/// stored order within each group, orphans last
pub fn project_segment(segment: &DecodedSegment) -> Vec<SensorReading> {
    let mut readings = Vec::with_capacity(segment.reading_count());
    for group in &segment.groups {
        readings.extend(group.readings.iter().map(|r| project(&group.group, r)));
    }
    readings.extend(segment.orphans.iter().map(project_orphan));
    readings
}

/// Projected readings of one decode pass
#[derive(Debug)]
pub struct TelemetrySnapshot {
    pub header: SegmentHeader,
    pub readings: Vec<SensorReading>,
    /// Per-record problems absorbed during the pass
    pub issues: Vec<ShmError>,
}

impl TelemetrySnapshot {
    /// Decode and project everything in the segment behind `handle`
    pub fn capture(
        handle: &MappingHandle,
        variant: LayoutVariant,
        limits: &DecodeLimits,
    ) -> Result<Self> {
        Self::from_bytes(handle.bytes()?, variant, limits)
    }

    /// Decode and project a segment image held in memory
    pub fn from_bytes(bytes: &[u8], variant: LayoutVariant, limits: &DecodeLimits) -> Result<Self> {
        let segment = SegmentDecoder::new(bytes, variant, limits)?.decode()?;
        let readings = project_segment(&segment);
        Ok(Self {
            header: segment.header,
            readings,
            issues: segment.issues,
        })
    }

    /// First reading matching the (group id, instance, reading id) key
    pub fn find(&self, group_id: u32, instance: u32, reading_id: u32) -> Option<&SensorReading> {
        self.readings.iter().find(|r| {
            r.group_id == group_id && r.group_instance == instance && r.reading_id == reading_id
        })
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
