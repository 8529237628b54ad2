#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::{cell::RefCell, collections::VecDeque};
use threat_query::{
    telemetry,
    transport::{BackendRequest, BackendResponse, Transport, TransportError},
    Dialect,
};

pub fn init() {
    telemetry::init_tracing("threat_query=debug");
}

/// Fixed clock for translations that fall back to the trailing window.
pub fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2021-01-01T00:10:00Z")
        .expect("valid fixture time")
        .with_timezone(&Utc)
}

pub fn payload(source: &str, query: &str, threat_type: Option<&str>) -> String {
    let mut payload = json!({"offset": 0, "query": query, "source": source});
    if let Some(threat_type) = threat_type {
        payload["threatType"] = json!(threat_type);
    }
    payload.to_string()
}

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<BackendResponse, TransportError>>>,
    requests: RefCell<Vec<BackendRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.responses
            .borrow_mut()
            .push_back(Ok(BackendResponse::new(status, body)));
        self
    }

    pub fn respond_without_status(self, body: impl Into<String>) -> Self {
        self.responses.borrow_mut().push_back(Ok(BackendResponse {
            status: None,
            body: body.into(),
        }));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.responses
            .borrow_mut()
            .push_back(Err(TransportError(message.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn call(&self, request: &BackendRequest) -> Result<BackendResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("no scripted response left".into())))
    }
}

/// A backend holding `total` numbered records, answering each dialect's
/// paging parameters the way the real API does.
pub struct DatasetTransport {
    dialect: Dialect,
    total: usize,
    requests: RefCell<Vec<BackendRequest>>,
}

impl DatasetTransport {
    pub fn new(dialect: Dialect, total: usize) -> Self {
        Self {
            dialect,
            total,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.borrow().clone()
    }

    fn records(&self, range: std::ops::Range<usize>) -> Vec<Value> {
        range.map(|n| json!({"n": n})).collect()
    }
}

pub fn param(query: &str, key: &str) -> Option<usize> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix(key)?.strip_prefix('='))
        .and_then(|value| value.parse().ok())
}

impl Transport for DatasetTransport {
    fn call(&self, request: &BackendRequest) -> Result<BackendResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        let body = match self.dialect {
            Dialect::DnsEvent => {
                let offset = param(&request.query, "_offset").unwrap_or(0);
                let limit = param(&request.query, "_limit").unwrap_or(self.total);
                let end = self.total.min(offset.saturating_add(limit));
                json!({"result": self.records(offset.min(end)..end), "status_code": "200"})
            }
            Dialect::TideDb => {
                let limit = param(&request.query, "rlimit").unwrap_or(self.total);
                json!({"threat": self.records(0..self.total.min(limit))})
            }
            Dialect::Dossier => json!({
                "status": "success",
                "job": {"id": "job-1"},
                "results": [{"status": "success", "data": {"items": self.records(0..self.total)}}]
            }),
        };
        Ok(BackendResponse::new(200, body.to_string()))
    }
}

/// Numbers carried by records, whatever the dialect wrapping.
pub fn numbers(records: &[Value]) -> Vec<u64> {
    records
        .iter()
        .filter_map(|record| {
            record
                .pointer("/dnsEventData/n")
                .or_else(|| record.pointer("/tideDbData/n"))
                .or_else(|| record.pointer("/dossierData/results/0/data/items/0/n"))
                .and_then(Value::as_u64)
        })
        .collect()
}
