//! Storage size parsing and display-unit conversions.
//!
//! All units are decimal: 1 GB = 10^9 bytes, matching how capacity is quoted
//! by infrastructure providers.

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

const SUFFIXES: &[(&str, f64)] = &[
    ("PB", 1e15),
    ("TB", 1e12),
    ("GB", 1e9),
    ("MB", 1e6),
    ("KB", 1e3),
    ("B", 1.0),
];

/// Parses a storage size such as "500 GB", "2.5TB" or "1024" (plain bytes)
/// into a byte count.
pub fn parse_bytes(input: &str) -> Result<f64> {
    let normalized = input.trim().to_uppercase();
    for (suffix, scale) in SUFFIXES {
        if let Some(number) = normalized.strip_suffix(suffix) {
            return parse_non_negative(number.trim(), input).map(|value| value * scale);
        }
    }
    parse_non_negative(&normalized, input)
}

fn parse_non_negative(number: &str, display: &str) -> Result<f64> {
    let value: f64 = number
        .parse()
        .map_err(|_| Error::MalformedSize(display.to_string()))?;
    if value < 0.0 || !value.is_finite() {
        return Err(Error::MalformedSize(display.to_string()));
    }
    Ok(value)
}

/// Unit used for storage figures in summary output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayUnit {
    GB,
    TB,
}

impl DisplayUnit {
    /// Bytes per one display unit.
    pub fn bytes(&self) -> f64 {
        match self {
            DisplayUnit::GB => 1e9,
            DisplayUnit::TB => 1e12,
        }
    }

    /// Converts a byte count into this unit.
    pub fn convert(&self, bytes: f64) -> f64 {
        bytes / self.bytes()
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisplayUnit::GB => "GB",
            DisplayUnit::TB => "TB",
        }
    }
}

impl Default for DisplayUnit {
    fn default() -> Self {
        DisplayUnit::GB
    }
}
