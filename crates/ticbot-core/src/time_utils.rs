use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    #[error("duration must not be empty")]
    Empty,
    #[error("invalid duration token '{0}'")]
    InvalidToken(String),
    #[error("unknown duration unit '{0}'")]
    UnknownUnit(String),
    #[error("duration must be greater than zero")]
    NonPositive,
    #[error("duration is too large")]
    Overflow,
}

/// Duration as written in configuration: `"1d 3h"` or `{hours: 2}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DurationSpec {
    Compact(String),
    Parts(DurationParts),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DurationParts {
    #[serde(default)]
    pub weeks: i64,
    #[serde(default)]
    pub days: i64,
    #[serde(default)]
    pub hours: i64,
    #[serde(default)]
    pub minutes: i64,
    #[serde(default)]
    pub seconds: i64,
}

impl DurationSpec {
    /// Converts to a strictly positive duration.
    pub fn to_duration(&self) -> Result<Duration, DurationParseError> {
        let duration = match self {
            Self::Compact(raw) => parse_compact_duration(raw)?,
            Self::Parts(parts) => parts.to_duration()?,
        };
        if duration <= Duration::zero() {
            return Err(DurationParseError::NonPositive);
        }
        Ok(duration)
    }
}

impl DurationParts {
    fn to_duration(&self) -> Result<Duration, DurationParseError> {
        let components = [
            (self.weeks, 7 * 24 * 3_600),
            (self.days, 24 * 3_600),
            (self.hours, 3_600),
            (self.minutes, 60),
            (self.seconds, 1),
        ];
        let mut total: i64 = 0;
        for (value, unit_seconds) in components {
            let seconds = value
                .checked_mul(unit_seconds)
                .ok_or(DurationParseError::Overflow)?;
            total = total
                .checked_add(seconds)
                .ok_or(DurationParseError::Overflow)?;
        }
        Duration::try_seconds(total).ok_or(DurationParseError::Overflow)
    }
}

fn unit_seconds(unit: &str) -> Option<i64> {
    match unit.to_ascii_lowercase().as_str() {
        "w" | "week" | "weeks" => Some(7 * 24 * 3_600),
        "d" | "day" | "days" => Some(24 * 3_600),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(3_600),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(60),
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
        _ => None,
    }
}

/// Parses compact durations such as `"2h"`, `"1d 3h"` or `"90 minutes"`.
pub fn parse_compact_duration(raw: &str) -> Result<Duration, DurationParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DurationParseError::Empty);
    }
    let mut chars = trimmed.chars().peekable();
    let mut total: i64 = 0;
    loop {
        while matches!(chars.peek(), Some(ch) if ch.is_whitespace() || *ch == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }
        let mut digits = String::new();
        while let Some(ch) = chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(ch);
            chars.next();
        }
        while matches!(chars.peek(), Some(ch) if ch.is_whitespace()) {
            chars.next();
        }
        let mut unit = String::new();
        while let Some(ch) = chars.peek().copied().filter(char::is_ascii_alphabetic) {
            unit.push(ch);
            chars.next();
        }
        if digits.is_empty() || unit.is_empty() {
            let rest: String = chars.collect();
            return Err(DurationParseError::InvalidToken(format!("{digits}{unit}{rest}")));
        }
        let amount: i64 = digits.parse().map_err(|_| DurationParseError::Overflow)?;
        let seconds_per_unit =
            unit_seconds(&unit).ok_or_else(|| DurationParseError::UnknownUnit(unit.clone()))?;
        let seconds = amount
            .checked_mul(seconds_per_unit)
            .ok_or(DurationParseError::Overflow)?;
        total = total
            .checked_add(seconds)
            .ok_or(DurationParseError::Overflow)?;
    }
    Duration::try_seconds(total).ok_or(DurationParseError::Overflow)
}

/// Renders a duration compactly, largest unit first (`"1d 3h"`).
pub fn format_duration(duration: Duration) -> String {
    let mut seconds = duration.num_seconds();
    if seconds == 0 {
        return "0s".to_string();
    }
    let sign = if seconds < 0 { "-" } else { "" };
    seconds = seconds.abs();
    let mut parts = Vec::new();
    for (unit, size) in [("d", 86_400), ("h", 3_600), ("m", 60), ("s", 1)] {
        let amount = seconds / size;
        if amount > 0 {
            parts.push(format!("{amount}{unit}"));
            seconds -= amount * size;
        }
    }
    format!("{sign}{}", parts.join(" "))
}

/// Returns true when `now` has reached `anchor`.
pub fn is_due_at(anchor: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= anchor
}
