//! Plausibility limits applied while decoding

use crate::config::{DEFAULT_MAX_GROUPS, DEFAULT_MAX_READINGS, MAX_SEGMENT_BYTES};
use crate::error::{Result, ShmError};

/// Upper bounds that reject garbage counts before they drive offset arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// No read may end beyond this offset, whatever the mapping size
    pub max_segment_bytes: usize,
    /// Maximum number of sensor groups in one segment
    pub max_groups: usize,
    /// Maximum number of readings in one segment
    pub max_readings: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_segment_bytes: MAX_SEGMENT_BYTES,
            max_groups: DEFAULT_MAX_GROUPS,
            max_readings: DEFAULT_MAX_READINGS,
        }
    }
}

impl DecodeLimits {
    /// Set the byte ceiling
    pub fn with_max_segment_bytes(mut self, bytes: usize) -> Self {
        self.max_segment_bytes = bytes;
        self
    }

    /// Set the group limit
    pub fn with_max_groups(mut self, groups: usize) -> Self {
        self.max_groups = groups;
        self
    }

    /// Set the reading limit
    pub fn with_max_readings(mut self, readings: usize) -> Self {
        self.max_readings = readings;
        self
    }

    /// Validate the limits
    pub fn validate(&self) -> Result<()> {
        if self.max_segment_bytes == 0 {
            return Err(ShmError::invalid_parameter(
                "max_segment_bytes",
                "Segment ceiling must be greater than 0",
            ));
        }
        if self.max_groups == 0 || self.max_readings == 0 {
            return Err(ShmError::invalid_parameter(
                "max_groups/max_readings",
                "Count limits must be greater than 0",
            ));
        }
        Ok(())
    }

    pub(crate) fn check_groups(&self, field: &'static str, count: u64) -> Result<()> {
        check(field, count, self.max_groups)
    }

    pub(crate) fn check_readings(&self, field: &'static str, count: u64) -> Result<()> {
        check(field, count, self.max_readings)
    }
}

fn check(field: &'static str, count: u64, limit: usize) -> Result<()> {
    if count > limit as u64 {
        return Err(ShmError::count_too_large(field, count, limit as u64));
    }
    Ok(())
}
