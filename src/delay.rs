//! Delay-time arithmetic: `delay = quarter-note duration × subdivision factor`

use crate::config::{MAX_BPM, MIN_BPM};
use crate::error::{Error, Result};
use log::debug;

pub const MIN_FACTOR: f64 = 0.0001;
pub const MAX_FACTOR: f64 = 10.0;
pub const MAX_NAME_LENGTH: usize = 50;

/// Factors relative to a quarter note
pub const STANDARD_SUBDIVISIONS: [(&str, f64); 14] = [
    ("Whole Note (1/1)", 4.0),
    ("Half Note (1/2)", 2.0),
    ("Quarter Note (1/4)", 1.0),
    ("Eighth Note (1/8)", 0.5),
    ("Sixteenth Note (1/16)", 0.25),
    ("Thirty-Second Note (1/32)", 0.125),
    ("Dotted Half Note (3/4)", 3.0),
    ("Dotted Quarter Note (3/8)", 1.5),
    ("Dotted Eighth Note (3/16)", 0.75),
    ("Triplet Whole Note (2/3)", 2.6667),
    ("Triplet Half Note (2/3)", 1.3333),
    ("Triplet Quarter Note (2/3)", 0.6667),
    ("Triplet Eighth Note (2/3)", 0.3333),
    ("Triplet Sixteenth Note (2/3)", 0.1667),
];

#[derive(Debug, Clone, PartialEq)]
pub struct DelayTime {
    pub name: String,
    pub factor: f64,
    pub delay_ms: f64,
    pub custom: bool,
}

pub fn validate_bpm(bpm: f64) -> Result<()> {
    if !bpm.is_finite() || bpm < MIN_BPM as f64 || bpm > MAX_BPM as f64 {
        return Err(Error::InvalidBpm(bpm));
    }
    Ok(())
}

/// Quarter-note duration in ms scaled by `factor`, rounded to 2 decimals
pub fn delay_time(bpm: f64, factor: f64) -> Result<f64> {
    validate_bpm(bpm)?;
    if !factor.is_finite() {
        return Err(Error::InvalidSubdivision(format!("factor {} is not a number", factor)));
    }
    let beat_duration = 60_000.0 / bpm;
    Ok((beat_duration * factor * 100.0).round() / 100.0)
}

/// Integer milliseconds as sent to the device's delay parameters
pub fn device_delay_value(delay_ms: f64) -> i32 {
    delay_ms.round() as i32
}

/// Standard subdivisions plus user-defined ones
#[derive(Debug, Default, Clone)]
pub struct DelayCalculator {
    custom: Vec<(String, f64)>,
}

impl DelayCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_custom(&mut self, name: &str, factor: f64) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidSubdivision("name must not be empty".to_string()));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(Error::InvalidSubdivision(format!(
                "name must be at most {} characters",
                MAX_NAME_LENGTH
            )));
        }
        if STANDARD_SUBDIVISIONS.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)) {
            return Err(Error::InvalidSubdivision(format!(
                "'{}' is a standard subdivision",
                name
            )));
        }
        if self.custom.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)) {
            return Err(Error::InvalidSubdivision(format!("'{}' already exists", name)));
        }
        if !(MIN_FACTOR..=MAX_FACTOR).contains(&factor) {
            return Err(Error::InvalidSubdivision(format!(
                "factor must be between {} and {}",
                MIN_FACTOR, MAX_FACTOR
            )));
        }

        debug!("Added custom subdivision {} = {}", name, factor);
        self.custom.push((name.to_string(), factor));
        Ok(())
    }

    pub fn remove_custom(&mut self, name: &str) -> Result<f64> {
        let index = self
            .custom
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| Error::InvalidSubdivision(format!("'{}' not found", name)))?;
        Ok(self.custom.remove(index).1)
    }

    pub fn custom_subdivisions(&self) -> &[(String, f64)] {
        &self.custom
    }

    /// Resolves a subdivision by exact name or case-insensitive prefix,
    /// standard entries first
    pub fn find(&self, query: &str) -> Option<(&str, f64)> {
        let query = query.trim().to_lowercase();
        let all = STANDARD_SUBDIVISIONS
            .iter()
            .map(|(n, f)| (*n, *f))
            .chain(self.custom.iter().map(|(n, f)| (n.as_str(), *f)));

        let mut prefix_match = None;
        for (name, factor) in all {
            let lower = name.to_lowercase();
            if lower == query {
                return Some((name, factor));
            }
            if prefix_match.is_none() && lower.starts_with(&query) {
                prefix_match = Some((name, factor));
            }
        }
        prefix_match
    }

    /// Delay for every standard subdivision, then every custom one
    pub fn all_delay_times(&self, bpm: f64) -> Result<Vec<DelayTime>> {
        validate_bpm(bpm)?;
        let standard = STANDARD_SUBDIVISIONS
            .iter()
            .map(|(name, factor)| (name.to_string(), *factor, false));
        let custom = self
            .custom
            .iter()
            .map(|(name, factor)| (name.clone(), *factor, true));

        standard
            .chain(custom)
            .map(|(name, factor, custom)| {
                Ok(DelayTime {
                    delay_ms: delay_time(bpm, factor)?,
                    name,
                    factor,
                    custom,
                })
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.custom.clear();
    }
}
