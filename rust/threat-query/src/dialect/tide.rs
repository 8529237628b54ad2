use super::{wrap_records, Dialect, DialectProfile, PaginationShape, ThreatType, TimeEncoding};
use crate::{
    config::ConnectorConfig,
    error::{Result, TransmissionError},
    models::QueryPayload,
    transport::BackendRequest,
};
use serde_json::Value;

const PATH: &str = "/tide/api/data/threats/state";

/// TIDE threat intelligence: ISO millisecond window, one capped call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TideDb;

impl TideDb {
    /// Cheapest authenticated lookup, used as the connectivity probe.
    pub fn ping_request() -> BackendRequest {
        BackendRequest::new(PATH, "type=host&rlimit=1")
    }
}

impl DialectProfile for TideDb {
    fn dialect(&self) -> Dialect {
        Dialect::TideDb
    }

    fn time_encoding(&self) -> TimeEncoding {
        TimeEncoding::IsoMillis {
            start_key: "from_date",
            stop_key: "to_date",
        }
    }

    fn pagination(&self, config: &ConnectorConfig) -> PaginationShape {
        PaginationShape::SingleShot {
            max_fetch: Some(config.tide_max_fetch),
        }
    }

    fn rewrite_value(&self, native_field: &str, value: &str) -> Result<String> {
        match native_field {
            "type" => Ok(value.to_lowercase()),
            _ => Ok(value.to_string()),
        }
    }

    fn threat_type(&self, object: &str, field: &str) -> Option<ThreatType> {
        match (object, field) {
            ("x-infoblox-threat", "host_name") => Some(ThreatType::Host),
            ("x-infoblox-threat", "url") => Some(ThreatType::Url),
            ("ipv4-addr" | "ipv6-addr" | "x-infoblox-threat", "value" | "ip_ref.value") => {
                Some(ThreatType::Ip)
            }
            _ => None,
        }
    }

    fn tags_threat_type(&self) -> bool {
        true
    }

    fn build_request(
        &self,
        payload: &QueryPayload,
        _cursor: usize,
        limit: Option<usize>,
    ) -> std::result::Result<BackendRequest, TransmissionError> {
        let mut query = payload.query.clone();
        if let Some(threat_type) = &payload.threat_type {
            query.push_str(&format!("&type={threat_type}"));
        }
        if let Some(limit) = limit {
            query.push_str(&format!("&rlimit={limit}"));
        }
        Ok(BackendRequest::new(PATH, query))
    }

    fn unpack(&self, body: Value) -> std::result::Result<Vec<Value>, TransmissionError> {
        wrap_records(Dialect::TideDb, &body, "threat")
    }
}
