//! Per-dialect behaviour: time encoding, value rewriting, threat-type
//! inference, pagination shape and the request/response wire details.

mod dns_event;
mod dossier;
mod tide;

use crate::{
    config::ConnectorConfig,
    error::{Result, TransmissionError},
    models::QueryPayload,
    pattern::ComparisonOperator,
    transport::BackendRequest,
    value::ValueType,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};
use thiserror::Error;

pub use dns_event::DnsEvent;
pub use dossier::Dossier;
pub use tide::TideDb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    #[serde(rename = "dnsEventData")]
    DnsEvent,
    #[serde(rename = "tideDbData")]
    TideDb,
    #[serde(rename = "dossierData")]
    Dossier,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::DnsEvent, Dialect::TideDb, Dialect::Dossier];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::DnsEvent => "dnsEventData",
            Dialect::TideDb => "tideDbData",
            Dialect::Dossier => "dossierData",
        }
    }

    pub fn profile(&self) -> &'static dyn DialectProfile {
        match self {
            Dialect::DnsEvent => &DnsEvent,
            Dialect::TideDb => &TideDb,
            Dialect::Dossier => &Dossier,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source '{0}'")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        Dialect::ALL
            .into_iter()
            .find(|dialect| dialect.as_str() == raw)
            .ok_or_else(|| UnknownDialect(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatType {
    Host,
    Ip,
    Url,
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThreatType::Host => "host",
            ThreatType::Ip => "ip",
            ThreatType::Url => "url",
        })
    }
}

/// Where a dialect carries the query time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeEncoding {
    /// `<start_key>=<epoch secs>&<stop_key>=<epoch secs>&<query>`
    EpochSeconds {
        start_key: &'static str,
        stop_key: &'static str,
    },
    /// `<start_key>=<ISO ms>&<stop_key>=<ISO ms>&<query>`
    IsoMillis {
        start_key: &'static str,
        stop_key: &'static str,
    },
    /// Bare query; qualifiers are dropped.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationShape {
    /// One call returns everything; `max_fetch` is forwarded as the request limit when set.
    SingleShot { max_fetch: Option<usize> },
    /// Fixed pages walked from the start of the result set.
    PageCursor { page_size: usize, max_fetch: usize },
}

/// Logical fields that point at another object; their literal is matched
/// against the accepted value types of each native field.
pub const REFERENCE_FIELDS: [&str; 4] = [
    "src_ref.value",
    "hostname_ref.value",
    "ip_ref.value",
    "extensions.dns-ext.question.domain_ref.value",
];

pub fn is_reference_field(field: &str) -> bool {
    REFERENCE_FIELDS.contains(&field)
}

/// Value types a native field accepts when reached through a reference field.
pub fn accepted_types(native_field: &str) -> &'static [ValueType] {
    match native_field {
        "qip" => &[ValueType::Ipv4, ValueType::Ipv4Cidr],
        "value" => &[ValueType::Ipv4, ValueType::Ipv4Cidr, ValueType::DomainName],
        "qname" => &[ValueType::DomainName],
        "ip" => &[
            ValueType::Ipv4,
            ValueType::Ipv4Cidr,
            ValueType::Ipv6,
            ValueType::Ipv6Cidr,
        ],
        _ => &[],
    }
}

/// Capabilities every Infoblox dialect provides to the translator, the
/// formatter and the paginator.
pub trait DialectProfile: Sync {
    fn dialect(&self) -> Dialect;

    fn time_encoding(&self) -> TimeEncoding;

    fn pagination(&self, config: &ConnectorConfig) -> PaginationShape;

    fn and_token(&self) -> &'static str {
        "&"
    }

    fn comparator(&self, operator: ComparisonOperator) -> Option<&'static str> {
        match operator {
            ComparisonOperator::Equal => Some("="),
            _ => None,
        }
    }

    /// Converts a literal into the encoding the backend expects for `native_field`.
    fn rewrite_value(&self, _native_field: &str, value: &str) -> Result<String> {
        Ok(value.to_string())
    }

    fn threat_type(&self, _object: &str, _field: &str) -> Option<ThreatType> {
        None
    }

    /// Whether payloads carry the inferred `threatType`.
    fn tags_threat_type(&self) -> bool {
        false
    }

    fn build_request(
        &self,
        payload: &QueryPayload,
        cursor: usize,
        limit: Option<usize>,
    ) -> std::result::Result<BackendRequest, TransmissionError>;

    /// Unpacks a 200 body into records wrapped for the results surface.
    fn unpack(&self, body: Value) -> std::result::Result<Vec<Value>, TransmissionError>;

    /// Message reported for a rejected request (400).
    fn rejection_message(&self, body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .pointer("/error/0/message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.to_string())
    }
}

/// `{"<dialect>": record}` for every entry of `body[key]`.
fn wrap_records(
    dialect: Dialect,
    body: &Value,
    key: &str,
) -> std::result::Result<Vec<Value>, TransmissionError> {
    let records = body.get(key).and_then(Value::as_array).ok_or_else(|| {
        TransmissionError::Unknown(format!(
            "unexpected {dialect} response: missing '{key}' list"
        ))
    })?;

    Ok(records
        .iter()
        .map(|record| {
            let mut wrapped = serde_json::Map::new();
            wrapped.insert(dialect.as_str().to_string(), record.clone());
            Value::Object(wrapped)
        })
        .collect())
}
