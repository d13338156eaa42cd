//! Single-value polling over the adjacency layout
//!
//! The walk is the same sequential walk the decoder performs, but readings
//! of groups that do not match are skipped by stride instead of parsed, and
//! the walk stops at the first match.

use log::{debug, trace};

use crate::error::Result;
use crate::layout::{
    AdjacencyGroup, AdjacencyReading, DecodeLimits, LayoutVariant, ReadingRecord, SegmentDecoder,
    SensorGroupRecord, WireRecord, ADJACENCY_READING_SIZE,
};
use crate::memory::MappingHandle;
use crate::projection::{project, SensorReading};

/// Identity of one reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LookupKey {
    pub group_id: u32,
    pub instance: u32,
    pub reading_id: u32,
}

impl LookupKey {
    pub fn new(group_id: u32, instance: u32, reading_id: u32) -> Self {
        Self {
            group_id,
            instance,
            reading_id,
        }
    }
}

/// Traversal counters of the last lookup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    /// Groups whose record was read
    pub groups_visited: usize,
    /// Reading records parsed (only within matching groups)
    pub readings_inspected: usize,
}

/// Reusable lookup with its own limits and statistics
#[derive(Debug, Clone, Default)]
pub struct TargetedLookup {
    limits: DecodeLimits,
    stats: LookupStats,
}

impl TargetedLookup {
    pub fn new(limits: DecodeLimits) -> Self {
        Self {
            limits,
            stats: LookupStats::default(),
        }
    }

    /// Counters from the most recent call
    pub fn stats(&self) -> LookupStats {
        self.stats
    }

    /// Search the segment behind `handle`
    pub fn find(&mut self, handle: &MappingHandle, key: LookupKey) -> Result<Option<SensorReading>> {
        self.find_in(handle.bytes()?, key)
    }

    /// Search a segment image. `Ok(None)` means every group was walked
    /// without a match.
    pub fn find_in(&mut self, bytes: &[u8], key: LookupKey) -> Result<Option<SensorReading>> {
        self.stats = LookupStats::default();

        let decoder = SegmentDecoder::new(bytes, LayoutVariant::Adjacency, &self.limits)?;
        let group_count = decoder.header().group_count();
        let mut cursor = decoder.body_cursor()?;
        let mut readings_seen: u64 = 0;

        for _ in 0..group_count {
            let group = AdjacencyGroup::parse(&mut cursor)?;
            self.stats.groups_visited += 1;

            let count = group.reading_count as usize;
            cursor.ensure_elements(count, ADJACENCY_READING_SIZE)?;
            readings_seen += count as u64;
            self.limits.check_readings("reading_count", readings_seen)?;

            if group.id != key.group_id || group.instance != key.instance {
                cursor.skip_elements(count, ADJACENCY_READING_SIZE)?;
                continue;
            }

            trace!(
                "group {:#x}/{} matched, scanning {} readings",
                group.id,
                group.instance,
                count
            );
            for position in 0..count {
                let reading = AdjacencyReading::parse(&mut cursor)?;
                self.stats.readings_inspected += 1;
                if reading.reading_id == key.reading_id {
                    debug!(
                        "Found reading {:#x} in group {:#x}/{} at position {}",
                        key.reading_id, key.group_id, key.instance, position
                    );
                    let group = SensorGroupRecord::Adjacency(group);
                    return Ok(Some(project(&group, &ReadingRecord::Adjacency(reading))));
                }
            }
        }

        debug!(
            "Reading {:#x} of group {:#x}/{} not present ({} groups walked)",
            key.reading_id, key.group_id, key.instance, self.stats.groups_visited
        );
        Ok(None)
    }
}

/// Find one reading in the segment behind `handle` with default limits
pub fn find(
    handle: &MappingHandle,
    group_id: u32,
    instance: u32,
    reading_id: u32,
) -> Result<Option<SensorReading>> {
    TargetedLookup::default().find(handle, LookupKey::new(group_id, instance, reading_id))
}
