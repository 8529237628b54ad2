use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime knobs for translation and result retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    /// Trailing window applied when a pattern carries no START/STOP qualifier.
    pub time_range_minutes: i64,
    /// Upper bound on the `length` a caller may request in one results call.
    pub result_limit: usize,
    pub dns_event_page_size: usize,
    pub dns_event_max_fetch: usize,
    pub tide_max_fetch: usize,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_time_range_minutes")]
    threat_query_time_range_minutes: i64,
    #[serde(default = "default_result_limit")]
    threat_query_result_limit: usize,
    #[serde(default = "default_page_size")]
    threat_query_dns_event_page_size: usize,
    #[serde(default = "default_max_fetch")]
    threat_query_dns_event_max_fetch: usize,
    #[serde(default = "default_max_fetch")]
    threat_query_tide_max_fetch: usize,
}

/// One year; longer lookbacks are clamped.
const MAX_TIME_RANGE_MINUTES: i64 = 525_600;

const fn default_time_range_minutes() -> i64 {
    5
}

const fn default_result_limit() -> usize {
    10_000
}

const fn default_page_size() -> usize {
    1_000
}

const fn default_max_fetch() -> usize {
    10_000
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            time_range_minutes: default_time_range_minutes(),
            result_limit: default_result_limit(),
            dns_event_page_size: default_page_size(),
            dns_event_max_fetch: default_max_fetch(),
            tide_max_fetch: default_max_fetch(),
        }
    }
}

impl ConnectorConfig {
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig = envy::from_env()
            .context("failed to parse THREAT_QUERY_* environment variables")?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let page_size = raw.threat_query_dns_event_page_size.max(1);
        Self {
            time_range_minutes: raw
                .threat_query_time_range_minutes
                .clamp(1, MAX_TIME_RANGE_MINUTES),
            result_limit: raw.threat_query_result_limit.max(1),
            dns_event_page_size: page_size,
            dns_event_max_fetch: raw.threat_query_dns_event_max_fetch.max(page_size),
            tide_max_fetch: raw.threat_query_tide_max_fetch.max(1),
        }
    }
}
