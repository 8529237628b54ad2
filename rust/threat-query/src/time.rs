//! Time utilities for START/STOP qualifiers and default lookback windows.

use crate::{
    error::{Result, TranslateError},
    pattern::Qualifier,
};
use chrono::{DateTime, SecondsFormat, TimeDelta, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static QUOTED_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^'\d{4}(-\d{2}){2}T\d{2}(:\d{2}){2}(\.\d+)?Z'$")
        .expect("timestamp pattern compiles")
});

static EPOCH_MILLIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{13}$").expect("epoch pattern compiles"));

static FRACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.\d+Z$").expect("fraction pattern compiles"));

static QUALIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^START\s*t?('[^']*'|\d+)\s*STOP\s*t?('[^']*'|\d+)$")
        .expect("qualifier pattern compiles")
});

/// A qualifier bound, kept both as the ISO text handed to ISO-speaking
/// dialects and as a parsed instant for epoch conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    iso: String,
    at: DateTime<Utc>,
}

impl Timestamp {
    /// Accepts `'YYYY-MM-DDThh:mm:ss[.f]Z'` (quotes included) or a 13-digit millisecond epoch.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if EPOCH_MILLIS.is_match(raw) {
            let millis: i64 = raw
                .parse()
                .map_err(|_| TranslateError::InvalidTimestamp(raw.to_string()))?;
            let at = Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| TranslateError::InvalidTimestamp(raw.to_string()))?;
            return Ok(Self::from_datetime(at));
        }

        let at = DateTime::parse_from_rfc3339(&with_milliseconds(raw)?)
            .map_err(|_| TranslateError::InvalidTimestamp(raw.to_string()))?
            .with_timezone(&Utc);
        Ok(Self::from_datetime(at))
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            iso: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            at,
        }
    }

    pub fn iso(&self) -> &str {
        &self.iso
    }

    pub fn epoch_seconds(&self) -> i64 {
        self.at.timestamp()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Timestamp,
    pub stop: Timestamp,
}

impl TimeWindow {
    /// `[now - minutes, now]`, truncated to whole seconds.
    pub fn trailing(now: DateTime<Utc>, minutes: i64) -> Result<Self> {
        let stop = Utc
            .timestamp_opt(now.timestamp(), 0)
            .single()
            .unwrap_or(now);
        let start = TimeDelta::try_minutes(minutes)
            .and_then(|span| stop.checked_sub_signed(span))
            .ok_or(TranslateError::InvalidTimeRange(minutes))?;
        Ok(Self {
            start: Timestamp::from_datetime(start),
            stop: Timestamp::from_datetime(stop),
        })
    }

    /// Parses one `START <ts> STOP <ts>` qualifier; `t'...'` and 13-digit epochs are accepted.
    pub fn from_qualifier(qualifier: &Qualifier) -> Result<Self> {
        let raw = qualifier.as_str().trim();
        let caps = QUALIFIER
            .captures(raw)
            .ok_or_else(|| TranslateError::MalformedTimeRangeMarker(raw.to_string()))?;
        Ok(Self {
            start: Timestamp::parse(&caps[1])?,
            stop: Timestamp::parse(&caps[2])?,
        })
    }
}

/// Strips the quotes of a strict qualifier timestamp and pads a missing fraction to `.000`.
pub fn with_milliseconds(raw: &str) -> Result<String> {
    if !QUOTED_TIMESTAMP.is_match(raw) {
        return Err(TranslateError::InvalidTimestamp(raw.to_string()));
    }
    let unquoted = raw.trim_matches('\'');
    if FRACTION.is_match(unquoted) {
        Ok(unquoted.to_string())
    } else {
        Ok(format!("{}.000Z", unquoted.trim_end_matches('Z')))
    }
}

/// The single window shared by `qualifiers`. Equal instants written differently
/// count as one window; anything else is a malformed marker.
pub fn qualified_window(qualifiers: &[Qualifier]) -> Result<TimeWindow> {
    let mut window: Option<TimeWindow> = None;
    for qualifier in qualifiers {
        let parsed = TimeWindow::from_qualifier(qualifier)?;
        match &window {
            Some(current) if *current != parsed => {
                return Err(TranslateError::MalformedTimeRangeMarker(
                    qualifiers
                        .iter()
                        .map(Qualifier::as_str)
                        .collect::<Vec<_>>()
                        .join(" "),
                ));
            }
            Some(_) => {}
            None => window = Some(parsed),
        }
    }
    window.ok_or_else(|| TranslateError::MalformedTimeRangeMarker(String::new()))
}
