use super::{wrap_records, Dialect, DialectProfile, PaginationShape, TimeEncoding};
use crate::{
    config::ConnectorConfig,
    error::{Result, TranslateError, TransmissionError},
    models::QueryPayload,
    transport::BackendRequest,
    value::{domain_to_infoblox, severity_level},
};
use serde_json::Value;

const PATH: &str = "/api/dnsdata/v2/dns_event";

/// DNS security events: epoch-second window, offset/limit pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsEvent;

impl DialectProfile for DnsEvent {
    fn dialect(&self) -> Dialect {
        Dialect::DnsEvent
    }

    fn time_encoding(&self) -> TimeEncoding {
        TimeEncoding::EpochSeconds {
            start_key: "t0",
            stop_key: "t1",
        }
    }

    fn pagination(&self, config: &ConnectorConfig) -> PaginationShape {
        PaginationShape::PageCursor {
            page_size: config.dns_event_page_size,
            max_fetch: config.dns_event_max_fetch,
        }
    }

    fn rewrite_value(&self, native_field: &str, value: &str) -> Result<String> {
        match native_field {
            "qname" => Ok(domain_to_infoblox(value)),
            "threat_level" => severity_level(value)
                .map(|level| level.to_string())
                .ok_or_else(|| TranslateError::InvalidValue {
                    field: native_field.to_string(),
                    value: value.to_string(),
                }),
            _ => Ok(value.to_string()),
        }
    }

    fn build_request(
        &self,
        payload: &QueryPayload,
        cursor: usize,
        limit: Option<usize>,
    ) -> std::result::Result<BackendRequest, TransmissionError> {
        let mut query = format!("{}&_offset={cursor}", payload.query);
        if let Some(limit) = limit {
            query.push_str(&format!("&_limit={limit}"));
        }
        Ok(BackendRequest::new(PATH, query))
    }

    fn unpack(&self, body: Value) -> std::result::Result<Vec<Value>, TransmissionError> {
        wrap_records(Dialect::DnsEvent, &body, "result")
    }
}
