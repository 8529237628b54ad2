use super::{Dialect, DialectProfile, PaginationShape, ThreatType, TimeEncoding};
use crate::{
    config::ConnectorConfig, error::TransmissionError, models::QueryPayload,
    transport::BackendRequest,
};
use serde_json::{json, Value};

const PATH: &str = "/tide/api/services/intel/lookup/indicator";

/// Dossier indicator lookups: no time window, one call per lookup, typed by host/ip.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dossier;

impl DialectProfile for Dossier {
    fn dialect(&self) -> Dialect {
        Dialect::Dossier
    }

    fn time_encoding(&self) -> TimeEncoding {
        TimeEncoding::Ignored
    }

    fn pagination(&self, _config: &ConnectorConfig) -> PaginationShape {
        PaginationShape::SingleShot { max_fetch: None }
    }

    fn threat_type(&self, object: &str, field: &str) -> Option<ThreatType> {
        match (object, field) {
            ("domain-name" | "x-infoblox-dossier-event-result-pdns", "value" | "hostname_ref.value") => {
                Some(ThreatType::Host)
            }
            ("ipv4-addr" | "ipv6-addr" | "x-infoblox-dossier-event-result-pdns", "value" | "ip_ref.value") => {
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
        _limit: Option<usize>,
    ) -> Result<BackendRequest, TransmissionError> {
        let threat_type = payload
            .threat_type
            .as_deref()
            .ok_or_else(|| TransmissionError::Unknown("missing field `threatType`".into()))?;
        Ok(BackendRequest::new(
            format!("{PATH}/{threat_type}"),
            format!("{}&source=pdns&wait=true", payload.query),
        ))
    }

    /// Every lookup item becomes its own record carrying the job metadata.
    fn unpack(&self, body: Value) -> Result<Vec<Value>, TransmissionError> {
        let results = body.get("results").and_then(Value::as_array).ok_or_else(|| {
            TransmissionError::Unknown("unexpected dossierData response: missing 'results' list".into())
        })?;
        let job = body.get("job").cloned().unwrap_or(Value::Null);

        let mut records = Vec::new();
        for result in results {
            let items = result
                .pointer("/data/items")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for item in items {
                records.push(json!({
                    "dossierData": {
                        "job": job,
                        "results": [{"data": {"items": [item]}}],
                    }
                }));
            }
        }
        Ok(records)
    }

    fn rejection_message(&self, body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| body.to_string())
    }
}
