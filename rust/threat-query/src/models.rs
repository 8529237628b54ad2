use crate::error::{ErrorCode, TransmissionError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Translator output: one native query ready to hand to the results call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPayload {
    #[serde(default)]
    pub offset: usize,
    pub query: String,
    #[serde(
        rename = "threatType",
        alias = "threat_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub threat_type: Option<String>,
    pub source: String,
}

/// The `{"success": ...}` envelope returned by every connector call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectorResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl ConnectorResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            search_id: None,
            status: None,
            progress: None,
            error: None,
            code: None,
        }
    }

    pub fn with_data(data: Vec<Value>) -> Self {
        Self {
            data: Some(data),
            ..Self::ok()
        }
    }

    pub fn with_search_id(search_id: impl Into<String>) -> Self {
        Self {
            search_id: Some(search_id.into()),
            ..Self::ok()
        }
    }

    pub fn completed() -> Self {
        Self {
            status: Some("COMPLETED".to_string()),
            progress: Some(100),
            ..Self::ok()
        }
    }

    pub fn failure(err: &TransmissionError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            code: Some(err.code()),
            ..Self::ok()
        }
    }
}
