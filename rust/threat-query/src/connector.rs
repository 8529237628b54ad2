//! Results surface: serialized payload in, `{"success": ...}` envelope out.

use crate::{
    config::ConnectorConfig,
    dialect::{Dialect, TideDb, UnknownDialect},
    error::TransmissionError,
    models::{ConnectorResponse, QueryPayload},
    pagination::{fetch_window, PageWindow},
    transport::Transport,
};
use serde_json::Value;
use tracing::{error, info};

pub struct Connector<T> {
    transport: T,
    config: ConnectorConfig,
}

impl<T: Transport> Connector<T> {
    pub fn new(transport: T, config: ConnectorConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Results are fetched synchronously inside `results`; there is no job to poll.
    pub fn is_async(&self) -> bool {
        false
    }

    pub fn ping(&self) -> ConnectorResponse {
        let outcome = self
            .transport
            .call(&TideDb::ping_request())
            .map_err(|err| TransmissionError::Unknown(err.to_string()))
            .and_then(|response| match response.status {
                Some(200) => Ok(()),
                Some(status) => Err(TransmissionError::from_status(
                    Some(status),
                    format!("ping failed with status {status}"),
                )),
                None => Err(TransmissionError::Unknown(
                    "ping failed without a status code".into(),
                )),
            });

        match outcome {
            Ok(()) => ConnectorResponse::ok(),
            Err(err) => {
                error!(error = %err, code = ?err.code(), "ping failed");
                ConnectorResponse::failure(&err)
            }
        }
    }

    /// The translated payload doubles as the search id.
    pub fn query(&self, payload: &str) -> ConnectorResponse {
        ConnectorResponse::with_search_id(payload)
    }

    pub fn status(&self, _search_id: &str) -> ConnectorResponse {
        ConnectorResponse::completed()
    }

    pub fn delete(&self, _search_id: &str) -> ConnectorResponse {
        ConnectorResponse::ok()
    }

    /// Records `[offset, offset + length)` of the query serialized in `search_id`.
    /// `length` is clamped to the configured result limit.
    pub fn results(&self, search_id: &str, offset: usize, length: usize) -> ConnectorResponse {
        match self.fetch(search_id, offset, length) {
            Ok(records) => {
                info!(offset, length, records = records.len(), "results fetched");
                ConnectorResponse::with_data(records)
            }
            Err(err) => {
                error!(error = %err, code = ?err.code(), "results call failed");
                ConnectorResponse::failure(&err)
            }
        }
    }

    fn fetch(
        &self,
        search_id: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<Value>, TransmissionError> {
        let window = PageWindow::new(offset, length.min(self.config.result_limit))?;
        let raw: Value = serde_json::from_str(search_id)?;
        let payload: QueryPayload = serde_json::from_value(raw)?;
        let dialect = payload.source.parse::<Dialect>().map_err(|UnknownDialect(source)| {
            TransmissionError::Unknown(format!("Unknown source provided source={source}"))
        })?;

        fetch_window(
            &self.transport,
            dialect.profile(),
            &payload,
            window,
            &self.config,
        )
    }
}
