/// Byte-count formatting and parsing.
///
/// All sizes inside the engine are `u64` bytes. Floating point only appears
/// at the display boundary. Units are binary (1 KB = 1024 B) but use the
/// short labels users expect from a disk tool.
use crate::error::{CoreError, Result};

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// One mebibyte, the unit big-file thresholds are usually expressed in.
pub const MB: u64 = 1024 * 1024;

/// Format a byte count as e.g. `"512 B"`, `"1.5 KB"`, `"3.21 GB"`.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    // GB and above get an extra digit; a 0.1 GB step is too coarse for cleanup.
    if unit >= 3 {
        format!("{value:.2} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Format a count with thousands separators.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Parse a human size such as `"500"`, `"500 MB"`, `"1.5GB"` or `"4 kb"`.
///
/// A bare number is taken as bytes. Unit matching is case-insensitive and
/// accepts the formatted output of [`format_size`].
pub fn parse_size(text: &str) -> Result<u64> {
    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let number: f64 = number
        .parse()
        .map_err(|_| CoreError::InvalidSize(text.to_owned()))?;

    let unit = unit.trim();
    let power = if unit.is_empty() {
        0
    } else {
        UNITS
            .iter()
            .position(|u| u.eq_ignore_ascii_case(unit))
            .ok_or_else(|| CoreError::InvalidSize(text.to_owned()))?
    };

    let bytes = number * 1024f64.powi(power as i32);
    if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
        return Err(CoreError::InvalidSize(text.to_owned()));
    }
    Ok(bytes.round() as u64)
}
