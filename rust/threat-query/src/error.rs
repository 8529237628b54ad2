use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranslateError>;

/// Failures raised while turning a pattern into native queries.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("operator {0} unsupported for the Infoblox connector")]
    UnsupportedOperator(String),

    #[error("multiple criteria for one field is not supported: {fields} mapped from {field}")]
    ConflictingCriteria { field: String, fields: String },

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("time range of {0} minutes is out of bounds")]
    InvalidTimeRange(i64),

    #[error("malformed START/STOP qualifier '{0}'")]
    MalformedTimeRangeMarker(String),

    #[error("invalid object path '{0}'")]
    InvalidObjectPath(String),

    #[error("unable to map property '{object}:{field}'")]
    UnmappedField { object: String, field: String },

    #[error("invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },

    #[error("malformed pattern: {0}")]
    MalformedPattern(String),

    #[error("failed to serialize query payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Wire codes reported by the results surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidParameter,
    AuthenticationFail,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransmissionError {
    #[error("{0}")]
    InvalidParameter(String),

    #[error("{0}")]
    AuthenticationFail(String),

    #[error("{0}")]
    Unknown(String),
}

impl TransmissionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TransmissionError::InvalidParameter(_) => ErrorCode::InvalidParameter,
            TransmissionError::AuthenticationFail(_) => ErrorCode::AuthenticationFail,
            TransmissionError::Unknown(_) => ErrorCode::Unknown,
        }
    }

    /// Classifies a non-200 backend status; `message` is what the caller gets to see.
    pub fn from_status(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            Some(400) => TransmissionError::InvalidParameter(message),
            Some(401) => TransmissionError::AuthenticationFail(message),
            _ => TransmissionError::Unknown(message),
        }
    }
}

impl From<serde_json::Error> for TransmissionError {
    fn from(err: serde_json::Error) -> Self {
        TransmissionError::Unknown(err.to_string())
    }
}
