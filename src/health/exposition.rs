//! Capacity figures from a Prometheus text exposition.
//!
//! Only the three FSD gauges are read. For each name the first sample
//! wins; labels are ignored.

use thiserror::Error;

pub const MAX_CLIENTS: &str = "fsd_maxclients";
pub const CURRENT_CLIENTS: &str = "interface_client_current";
pub const REMAINING_SLOTS: &str = "fsd_remainingslots";

/// A sample line that could not be read.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {reason}")]
pub struct ExpositionError {
    pub line: usize,
    pub reason: &'static str,
}

/// Gauges found in one scrape. Absent gauges stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapacityReport {
    pub max_users: Option<i64>,
    pub current_users: Option<i64>,
    pub remaining_slots: Option<i64>,
}

impl CapacityReport {
    /// Parse an exposition body. Any malformed sample line fails the whole
    /// scrape, matching how the backend's own text parser behaves.
    pub fn parse(body: &str) -> Result<Self, ExpositionError> {
        let mut report = CapacityReport::default();

        for (index, raw) in body.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, value) = parse_sample(line).map_err(|reason| ExpositionError {
                line: index + 1,
                reason,
            })?;

            let slot = match name {
                MAX_CLIENTS => &mut report.max_users,
                CURRENT_CLIENTS => &mut report.current_users,
                REMAINING_SLOTS => &mut report.remaining_slots,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value as i64);
            }
        }

        Ok(report)
    }

    pub fn is_complete(&self) -> bool {
        self.max_users.is_some() && self.current_users.is_some() && self.remaining_slots.is_some()
    }
}

/// Split `name{labels} value [timestamp]` into name and value.
fn parse_sample(line: &str) -> Result<(&str, f64), &'static str> {
    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .ok_or("missing value")?;
    let name = &line[..name_end];
    if name.is_empty() {
        return Err("missing metric name");
    }

    let mut rest = &line[name_end..];
    if rest.starts_with('{') {
        let close = label_block_end(rest).ok_or("unterminated label set")?;
        rest = &rest[close + 1..];
    }

    let value = rest.split_whitespace().next().ok_or("missing value")?;
    let value = value.parse::<f64>().map_err(|_| "value is not a number")?;
    Ok((name, value))
}

/// Index of the `}` closing a label block, skipping quoted values.
fn label_block_end(block: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in block.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '}' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}
