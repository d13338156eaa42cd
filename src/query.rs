//! Keyword search over projected reading labels
//!
//! Labels differ between producer versions and user overrides, so metrics
//! are located by a priority list of keywords: exact label match first,
//! then substring match, then a loose match on keyword tokens.

use std::collections::HashSet;

use crate::projection::SensorReading;

/// Keywords for the CPU package power reading
pub const PACKAGE_POWER_KEYWORDS: &[&str] = &[
    "package power",
    "cpu package power",
    "cpu package",
    "cpu package watt",
    "power [w]",
    "power",
];

/// Keywords for the CPU package temperature reading
pub const PACKAGE_TEMPERATURE_KEYWORDS: &[&str] = &[
    "package temp",
    "cpu package temp",
    "cpu package temperature",
    "package temperature",
    "temp",
    "temperature",
];

/// Keywords for the CPU clock reading
pub const PACKAGE_CLOCK_KEYWORDS: &[&str] = &[
    "package clock",
    "cpu package clock",
    "cpu frequency",
    "cpu clock",
    "clock",
    "freq",
    "mhz",
];

const TOKEN_SEPARATORS: &[char] = &[' ', '[', ']', '_', '-'];

/// Case-insensitive label index; the first reading carrying a label wins
#[derive(Debug)]
pub struct LabelIndex<'a> {
    entries: Vec<(String, &'a SensorReading)>,
}

impl<'a> LabelIndex<'a> {
    pub fn new(readings: &'a [SensorReading]) -> Self {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(readings.len());
        for reading in readings {
            let label = reading.display_label().to_lowercase();
            if seen.insert(label.clone()) {
                entries.push((label, reading));
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reading whose label best matches the keywords, in priority order
    pub fn find(&self, keywords: &[&str]) -> Option<&'a SensorReading> {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

        for keyword in &keywords {
            if let Some((_, reading)) = self.entries.iter().find(|(label, _)| label == keyword) {
                return Some(*reading);
            }
        }

        for keyword in &keywords {
            if let Some((_, reading)) = self
                .entries
                .iter()
                .find(|(label, _)| label.contains(keyword.as_str()))
            {
                return Some(*reading);
            }
        }

        let tokens: Vec<&str> = keywords
            .iter()
            .flat_map(|k| k.split(TOKEN_SEPARATORS))
            .filter(|t| t.len() >= 2)
            .collect();
        self.entries
            .iter()
            .find(|(label, _)| tokens.iter().any(|t| label.contains(t)))
            .map(|(_, reading)| *reading)
    }
}

/// Keyword list for a named metric ("power", "temperature" or "clock")
pub fn metric_keywords(metric: &str) -> Option<&'static [&'static str]> {
    match metric.to_ascii_lowercase().as_str() {
        "power" => Some(PACKAGE_POWER_KEYWORDS),
        "temperature" | "temp" => Some(PACKAGE_TEMPERATURE_KEYWORDS),
        "clock" | "frequency" => Some(PACKAGE_CLOCK_KEYWORDS),
        _ => None,
    }
}
