//! Conversion between the runtime's size strings and byte counts.
//!
//! Sizes use decimal multipliers (1 kB = 1000 B), matching what the runtime prints.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

fn size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?|\.\d+)\s*([kmgt]?b)\b").expect("valid size regex")
    })
}

fn multiplier(unit: &str) -> f64 {
    match unit.to_ascii_uppercase().as_str() {
        "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        _ => 1.0,
    }
}

/// Parse a runtime size string such as `"1.5 GB"` or `"12kB (virtual 500MB)"`.
///
/// Best-effort: anything that does not start with a magnitude and a unit
/// yields `0`.
pub fn parse_size(text: &str) -> u64 {
    let Some(caps) = size_pattern().captures(text) else {
        return 0;
    };
    let magnitude: f64 = match caps[1].parse() {
        Ok(value) => value,
        Err(_) => return 0,
    };
    (magnitude * multiplier(&caps[2])).round() as u64
}

/// Same as [`parse_size`] for an optional field.
pub fn parse_opt_size(text: Option<&str>) -> u64 {
    text.map(parse_size).unwrap_or(0)
}

/// Render a byte count, e.g. `1500000000` as `"1.5 GB"`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    if unit > 0 && value < 10.0 {
        format!("{:.1} {}", value, UNITS[unit])
    } else {
        format!("{:.0} {}", value, UNITS[unit])
    }
}

/// Parse a user-supplied size threshold such as `--limit 10GB`.
///
/// A bare number is taken as bytes. Unlike [`parse_size`], malformed,
/// negative and zero values are rejected.
pub fn parse_size_limit(text: &str) -> Result<u64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid("size limit must not be empty"));
    }
    if trimmed.starts_with('-') {
        return Err(Error::invalid(format!(
            "size limit must be positive, got: {}",
            trimmed
        )));
    }

    let bytes = if let Ok(plain) = trimmed.parse::<f64>() {
        if !plain.is_finite() {
            return Err(Error::invalid(format!("invalid size limit: {}", trimmed)));
        }
        plain.round() as u64
    } else {
        let caps = size_pattern()
            .captures(trimmed)
            .filter(|caps| caps[0].trim_start().len() == trimmed.len())
            .ok_or_else(|| {
                Error::invalid(format!(
                    "invalid size limit '{}'. Expected a number with an optional unit (B, KB, MB, GB, TB)",
                    trimmed
                ))
            })?;
        let magnitude: f64 = caps[1]
            .parse()
            .map_err(|_| Error::invalid(format!("invalid size limit: {}", trimmed)))?;
        (magnitude * multiplier(&caps[2])).round() as u64
    };

    if bytes == 0 {
        return Err(Error::invalid("size limit must be greater than zero"));
    }
    Ok(bytes)
}
