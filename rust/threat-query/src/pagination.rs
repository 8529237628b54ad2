//! Reconciles a client `(offset, length)` window with each dialect's pagination shape.

use crate::{
    config::ConnectorConfig,
    dialect::{DialectProfile, PaginationShape},
    error::TransmissionError,
    models::QueryPayload,
    transport::{BackendRequest, Transport},
};
use serde_json::Value;
use tracing::debug;

type Result<T> = std::result::Result<T, TransmissionError>;

/// The slice of the result set a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: usize,
    pub length: usize,
}

impl PageWindow {
    pub fn new(offset: usize, length: usize) -> Result<Self> {
        if length == 0 {
            return Err(TransmissionError::InvalidParameter(
                "length must be greater than zero".into(),
            ));
        }
        Ok(Self { offset, length })
    }

    /// Exclusive end of the window.
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.length)
    }

    fn slice(&self, records: Vec<Value>) -> Vec<Value> {
        records
            .into_iter()
            .skip(self.offset)
            .take(self.length)
            .collect()
    }
}

/// Fetches `window` of the results of `payload`.
///
/// Backend calls are sequential; the first failure is returned and anything
/// gathered before it is discarded.
pub fn fetch_window<T: Transport + ?Sized>(
    transport: &T,
    profile: &dyn DialectProfile,
    payload: &QueryPayload,
    window: PageWindow,
    config: &ConnectorConfig,
) -> Result<Vec<Value>> {
    let records = match profile.pagination(config) {
        PaginationShape::SingleShot { max_fetch } => {
            let limit = max_fetch.map(|cap| window.end().min(cap));
            let request = profile.build_request(payload, 0, limit)?;
            let mut records = execute(transport, profile, &request)?;
            if let Some(limit) = limit {
                records.truncate(limit);
            }
            records
        }
        PaginationShape::PageCursor {
            page_size,
            max_fetch,
        } => walk_pages(transport, profile, payload, window.end().min(max_fetch), page_size)?,
    };

    Ok(window.slice(records))
}

/// Reads pages from the start of the result set until `target` records are held
/// or the backend runs dry.
fn walk_pages<T: Transport + ?Sized>(
    transport: &T,
    profile: &dyn DialectProfile,
    payload: &QueryPayload,
    target: usize,
    page_size: usize,
) -> Result<Vec<Value>> {
    let page_size = page_size.max(1);
    let mut records = Vec::with_capacity(target.min(page_size));
    let mut cursor = 0;

    while cursor < target {
        let want = page_size.min(target - cursor);
        let request = profile.build_request(payload, cursor, Some(want))?;
        let mut page = execute(transport, profile, &request)?;
        let received = page.len();
        page.truncate(want);
        cursor += page.len();
        records.append(&mut page);

        if received < want {
            break;
        }
    }

    Ok(records)
}

/// One backend call: status classification plus dialect unpacking of a 200 body.
pub fn execute<T: Transport + ?Sized>(
    transport: &T,
    profile: &dyn DialectProfile,
    request: &BackendRequest,
) -> Result<Vec<Value>> {
    let dialect = profile.dialect();
    debug!(%dialect, url = %request.url(), "calling backend");

    let response = transport
        .call(request)
        .map_err(|err| TransmissionError::Unknown(err.to_string()))?;

    match response.status {
        Some(200) => {
            let body: Value = serde_json::from_str(&response.body)?;
            let records = profile.unpack(body)?;
            debug!(%dialect, records = records.len(), "backend page received");
            Ok(records)
        }
        Some(400) => Err(TransmissionError::InvalidParameter(
            profile.rejection_message(&response.body),
        )),
        status => {
            debug!(%dialect, ?status, "backend call failed");
            Err(TransmissionError::from_status(status, response.body))
        }
    }
}
