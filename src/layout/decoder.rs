//! Walks a validated segment and yields sensor groups with their readings

use std::marker::PhantomData;

use log::{trace, warn};

use super::constants::ADJACENCY_READING_SIZE;
use super::cursor::ByteCursor;
use super::headers::{LayoutVariant, SectionDescriptor, SegmentHeader};
use super::limits::DecodeLimits;
use super::records::{
    AdjacencyGroup, AdjacencyReading, OffsetTableGroup, OffsetTableReading, ReadingRecord,
    SensorGroupRecord, WireRecord,
};
use crate::error::{Result, ShmError};
use crate::memory::MappingHandle;

/// One sensor group and the readings that belong to it
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGroup {
    /// Position of the group in the segment
    pub index: usize,
    pub group: SensorGroupRecord,
    pub readings: Vec<ReadingRecord>,
}

/// Result of a complete decode pass
#[derive(Debug)]
pub struct DecodedSegment {
    pub header: SegmentHeader,
    pub groups: Vec<DecodedGroup>,
    /// Readings whose group index was out of range (offset-table layout only)
    pub orphans: Vec<ReadingRecord>,
    /// Per-record problems that did not abort the pass
    pub issues: Vec<ShmError>,
}

impl DecodedSegment {
    /// Total readings yielded, including orphans
    pub fn reading_count(&self) -> usize {
        self.groups.iter().map(|g| g.readings.len()).sum::<usize>() + self.orphans.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

/// Progress of a walk over the segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    Walking,
    Exhausted,
    Failed,
}

/// Decoder bound to the bytes of one segment with a validated header
#[derive(Debug, Clone)]
pub struct SegmentDecoder<'a> {
    bytes: &'a [u8],
    header: SegmentHeader,
    limits: DecodeLimits,
}

impl<'a> SegmentDecoder<'a> {
    /// Validate the header for `variant`; no records are read yet
    pub fn new(bytes: &'a [u8], variant: LayoutVariant, limits: &DecodeLimits) -> Result<Self> {
        let header = SegmentHeader::read(bytes, variant, limits)?;
        Ok(Self {
            bytes,
            header,
            limits: *limits,
        })
    }

    pub fn header(&self) -> &SegmentHeader {
        &self.header
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Cursor positioned just after the header
    pub(crate) fn body_cursor(&self) -> Result<ByteCursor<'a>> {
        let mut cursor = ByteCursor::with_ceiling(self.bytes, self.limits.max_segment_bytes);
        cursor.seek(self.header.size())?;
        Ok(cursor)
    }

    /// Lazy walk over the groups. The first error ends the walk.
    pub fn groups(&self) -> GroupWalk<'a> {
        let inner = match self.header {
            SegmentHeader::Adjacency(header) => match self.body_cursor() {
                Ok(cursor) => WalkInner::Adjacency {
                    cursor,
                    remaining: header.group_count,
                    readings_seen: 0,
                },
                Err(e) => WalkInner::Broken(Some(e)),
            },
            SegmentHeader::OffsetTable(header) => WalkInner::OffsetTable {
                sensors: self.section(header.sensors),
                readings: Some(self.section(header.readings)),
                sensor_count: header.sensors.count as usize,
                buckets: Vec::new(),
            },
        };

        GroupWalk {
            inner,
            state: WalkState::Walking,
            index: 0,
            limits: self.limits,
            orphans: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Independent iterators over the sensor and reading sections
    /// (offset-table layout only)
    pub fn sections(
        &self,
    ) -> Option<(
        SectionIter<'a, OffsetTableGroup>,
        SectionIter<'a, OffsetTableReading>,
    )> {
        match self.header {
            SegmentHeader::OffsetTable(header) => {
                Some((self.section(header.sensors), self.section(header.readings)))
            }
            SegmentHeader::Adjacency(_) => None,
        }
    }

    fn section<T: WireRecord>(&self, section: SectionDescriptor) -> SectionIter<'a, T> {
        SectionIter {
            cursor: ByteCursor::with_ceiling(self.bytes, self.limits.max_segment_bytes),
            section,
            next: 0,
            _record: PhantomData,
        }
    }

    /// Decode every group. Structural errors fail the whole pass.
    pub fn decode(&self) -> Result<DecodedSegment> {
        let mut walk = self.groups();
        let mut groups = Vec::with_capacity(self.header.group_count() as usize);
        for group in walk.by_ref() {
            groups.push(group?);
        }
        let (orphans, issues) = walk.into_parts();

        Ok(DecodedSegment {
            header: self.header,
            groups,
            orphans,
            issues,
        })
    }
}

/// Decode the segment behind `handle`
pub fn decode(
    handle: &MappingHandle,
    variant: LayoutVariant,
    limits: &DecodeLimits,
) -> Result<DecodedSegment> {
    SegmentDecoder::new(handle.bytes()?, variant, limits)?.decode()
}

/// Iterator over one offset-table section
#[derive(Debug, Clone)]
pub struct SectionIter<'a, T> {
    cursor: ByteCursor<'a>,
    section: SectionDescriptor,
    next: u32,
    _record: PhantomData<T>,
}

impl<'a, T: WireRecord> Iterator for SectionIter<'a, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.section.count {
            return None;
        }
        let offset = self.section.element_offset(self.next);
        self.next += 1;

        let record = self.cursor.seek(offset).and_then(|_| T::parse(&mut self.cursor));
        if record.is_err() {
            self.next = self.section.count;
        }
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.section.count - self.next) as usize;
        (0, Some(left))
    }
}

enum WalkInner<'a> {
    Adjacency {
        cursor: ByteCursor<'a>,
        remaining: u32,
        readings_seen: u64,
    },
    OffsetTable {
        sensors: SectionIter<'a, OffsetTableGroup>,
        /// Consumed on the first step to fill `buckets`
        readings: Option<SectionIter<'a, OffsetTableReading>>,
        sensor_count: usize,
        buckets: Vec<Vec<ReadingRecord>>,
    },
    Broken(Option<ShmError>),
}

/// Lazy walk over the groups of a segment
pub struct GroupWalk<'a> {
    inner: WalkInner<'a>,
    state: WalkState,
    index: usize,
    limits: DecodeLimits,
    orphans: Vec<ReadingRecord>,
    issues: Vec<ShmError>,
}

impl<'a> GroupWalk<'a> {
    pub fn state(&self) -> WalkState {
        self.state
    }

    /// Groups yielded so far
    pub fn groups_visited(&self) -> usize {
        self.index
    }

    /// Per-record problems seen so far
    pub fn issues(&self) -> &[ShmError] {
        &self.issues
    }

    /// Readings without a valid group, and the issues they raised
    pub fn into_parts(self) -> (Vec<ReadingRecord>, Vec<ShmError>) {
        (self.orphans, self.issues)
    }

    fn step(&mut self) -> Result<Option<DecodedGroup>> {
        let index = self.index;
        match &mut self.inner {
            WalkInner::Broken(err) => match err.take() {
                Some(e) => Err(e),
                None => Ok(None),
            },
            WalkInner::Adjacency {
                cursor,
                remaining,
                readings_seen,
            } => {
                if *remaining == 0 {
                    return Ok(None);
                }

                let offset = cursor.offset();
                let group = AdjacencyGroup::parse(cursor)?;
                trace!(
                    "group {} id={:#x} inst={} readings={} at offset {}",
                    index,
                    group.id,
                    group.instance,
                    group.reading_count,
                    offset
                );

                let count = group.reading_count as usize;
                cursor.ensure_elements(count, ADJACENCY_READING_SIZE)?;
                *readings_seen += count as u64;
                self.limits.check_readings("reading_count", *readings_seen)?;

                let mut readings = Vec::with_capacity(count);
                for _ in 0..count {
                    readings.push(ReadingRecord::Adjacency(AdjacencyReading::parse(cursor)?));
                }
                *remaining -= 1;

                Ok(Some(DecodedGroup {
                    index,
                    group: SensorGroupRecord::Adjacency(group),
                    readings,
                }))
            }
            WalkInner::OffsetTable {
                sensors,
                readings,
                sensor_count,
                buckets,
            } => {
                if let Some(section) = readings.take() {
                    *buckets = vec![Vec::new(); *sensor_count];
                    for (position, reading) in section.enumerate() {
                        let reading = reading?;
                        match buckets.get_mut(reading.group_index as usize) {
                            Some(bucket) => bucket.push(ReadingRecord::OffsetTable(reading)),
                            None => {
                                let issue = ShmError::malformed_record(
                                    position,
                                    reading.group_index,
                                    *sensor_count,
                                );
                                warn!("Skipping group resolution: {}", issue);
                                self.issues.push(issue);
                                self.orphans.push(ReadingRecord::OffsetTable(reading));
                            }
                        }
                    }
                }

                match sensors.next() {
                    None => Ok(None),
                    Some(group) => {
                        let group = group?;
                        trace!(
                            "sensor {} id={:#x} inst={} '{}'",
                            index,
                            group.id,
                            group.instance,
                            group.label_orig.decode()
                        );
                        let readings = buckets.get_mut(index).map(std::mem::take).unwrap_or_default();
                        Ok(Some(DecodedGroup {
                            index,
                            group: SensorGroupRecord::OffsetTable(group),
                            readings,
                        }))
                    }
                }
            }
        }
    }
}

impl<'a> Iterator for GroupWalk<'a> {
    type Item = Result<DecodedGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != WalkState::Walking {
            return None;
        }
        match self.step() {
            Ok(Some(group)) => {
                self.index += 1;
                Some(Ok(group))
            }
            Ok(None) => {
                self.state = WalkState::Exhausted;
                None
            }
            Err(e) => {
                self.state = WalkState::Failed;
                Some(Err(e))
            }
        }
    }
}
