//! Polling state for consumers that sample one reading repeatedly
//!
//! The segment is re-opened and re-decoded on every cycle; nothing from the
//! mapping survives between polls. Everything that does survive (rolling
//! history, settling counter, per-context averages) lives in [`PollState`],
//! which the caller owns and passes to [`poll_once`].

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, SystemTime};

use log::{debug, info};
use serde::Serialize;

use crate::config::{DEFAULT_HISTORY_CAPACITY, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SETTLING_READINGS};
use crate::error::{Result, ShmError};
use crate::layout::{DecodeLimits, LayoutVariant};
use crate::lookup::{LookupKey, TargetedLookup};
use crate::memory::{MappingHandle, SegmentConfig};
use crate::projection::{SensorReading, TelemetrySnapshot};
use crate::query::LabelIndex;

/// Polling cadence and history sizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between polls
    pub interval: Duration,
    /// Samples kept in the rolling history
    pub history_capacity: usize,
    /// Samples ignored after a context change before averaging starts
    pub settling_readings: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            settling_readings: DEFAULT_SETTLING_READINGS,
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_settling_readings(mut self, readings: usize) -> Self {
        self.settling_readings = readings;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(ShmError::invalid_parameter(
                "history_capacity",
                "History capacity must be greater than 0",
            ));
        }
        if self.interval.is_zero() {
            return Err(ShmError::invalid_parameter(
                "interval",
                "Poll interval must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// How the polled reading is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Exact (group id, instance, reading id)
    Key(LookupKey),
    /// First label matching the keywords, in priority order
    Keywords(Vec<String>),
}

/// One polled value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: SystemTime,
    /// Caller-defined context the sample was taken under
    pub context: String,
    pub label: String,
    pub unit: String,
    pub value: f64,
}

impl Sample {
    pub fn from_reading(reading: &SensorReading, context: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            context: context.to_string(),
            label: reading.display_label(),
            unit: reading.unit.clone(),
            value: reading.value,
        }
    }
}

/// What happened to a recorded sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleStatus {
    /// Still inside the settling window; excluded from averages
    Settling { seen: usize, of: usize },
    /// Counted towards the context average
    Averaged { average: f64, samples: usize },
}

/// Arithmetic mean accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningAverage {
    sum: f64,
    count: usize,
}

impl RunningAverage {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum / self.count as f64)
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Poll cycle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub cycles: u64,
    pub hits: u64,
    /// Cycles where the reading was not present
    pub misses: u64,
    /// Cycles where the segment could not be opened or decoded
    pub failures: u64,
}

/// State carried from one poll to the next
#[derive(Debug, Clone)]
pub struct PollState {
    config: PollConfig,
    context: String,
    history: VecDeque<Sample>,
    readings_since_change: usize,
    averages: BTreeMap<String, RunningAverage>,
    stats: PollStats,
}

impl PollState {
    pub fn new(config: PollConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_capacity),
            config,
            context: String::new(),
            readings_since_change: 0,
            averages: BTreeMap::new(),
            stats: PollStats::default(),
        }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Switch to a new context and restart the settling window
    pub fn begin_context(&mut self, context: impl Into<String>) {
        self.context = context.into();
        self.readings_since_change = 0;
        info!("Polling context changed to '{}'", self.context);
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Add a sample to the history and, once settled, to the context average.
    /// A history capacity of 0 keeps no samples.
    pub fn record(&mut self, sample: Sample) -> SampleStatus {
        while !self.history.is_empty() && self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }

        let settling = self.readings_since_change < self.config.settling_readings;
        self.readings_since_change += 1;

        let status = if settling {
            SampleStatus::Settling {
                seen: self.readings_since_change,
                of: self.config.settling_readings,
            }
        } else {
            let average = self.averages.entry(sample.context.clone()).or_default();
            average.add(sample.value);
            SampleStatus::Averaged {
                average: average.mean().unwrap_or(sample.value),
                samples: average.count(),
            }
        };

        if self.config.history_capacity > 0 {
            self.history.push_back(sample);
        }
        status
    }

    /// Mean of the settled samples taken under `context`
    pub fn average(&self, context: &str) -> Option<f64> {
        self.averages.get(context).and_then(RunningAverage::mean)
    }

    /// All context averages, ordered by context name
    pub fn averages(&self) -> impl Iterator<Item = (&str, f64)> {
        self.averages
            .iter()
            .filter_map(|(context, avg)| avg.mean().map(|mean| (context.as_str(), mean)))
    }

    pub fn history(&self) -> &VecDeque<Sample> {
        &self.history
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.history.back()
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }
}

/// Outcome of a successful poll
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub reading: SensorReading,
    pub sample: Sample,
    pub status: SampleStatus,
}

/// Open the segment, pick one reading, record it and release the mapping.
///
/// `Ok(None)` means the segment decoded but the selector matched nothing.
pub fn poll_once(
    segment: &SegmentConfig,
    variant: LayoutVariant,
    limits: &DecodeLimits,
    selector: &Selector,
    state: &mut PollState,
) -> Result<Option<PollOutcome>> {
    state.stats.cycles += 1;

    let selected = MappingHandle::open(segment).and_then(|mut handle| {
        let selected = select(&handle, variant, limits, selector);
        handle.close();
        selected
    });

    match selected {
        Err(e) => {
            state.stats.failures += 1;
            debug!("Poll {} failed: {}", state.stats.cycles, e);
            Err(e)
        }
        Ok(None) => {
            state.stats.misses += 1;
            Ok(None)
        }
        Ok(Some(reading)) => {
            state.stats.hits += 1;
            let sample = Sample::from_reading(&reading, &state.context);
            let status = state.record(sample.clone());
            Ok(Some(PollOutcome {
                reading,
                sample,
                status,
            }))
        }
    }
}

/// Pick the reading named by `selector` from an open segment
pub fn select(
    handle: &MappingHandle,
    variant: LayoutVariant,
    limits: &DecodeLimits,
    selector: &Selector,
) -> Result<Option<SensorReading>> {
    match (selector, variant) {
        (Selector::Key(key), LayoutVariant::Adjacency) => {
            TargetedLookup::new(*limits).find(handle, *key)
        }
        (Selector::Key(key), LayoutVariant::OffsetTable) => {
            let snapshot = TelemetrySnapshot::capture(handle, variant, limits)?;
            Ok(snapshot
                .find(key.group_id, key.instance, key.reading_id)
                .cloned())
        }
        (Selector::Keywords(words), _) => {
            let snapshot = TelemetrySnapshot::capture(handle, variant, limits)?;
            let keywords: Vec<&str> = words.iter().map(String::as_str).collect();
            Ok(LabelIndex::new(&snapshot.readings).find(&keywords).cloned())
        }
    }
}
