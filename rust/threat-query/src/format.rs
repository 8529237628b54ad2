//! Turns rendered clauses into dialect payloads: time window encoding and threat-type tagging.

use crate::{
    dialect::{DialectProfile, TimeEncoding},
    error::{Result, TranslateError},
    models::QueryPayload,
    time::{qualified_window, TimeWindow},
    translate::{RenderedQuery, Translation},
};
use chrono::{DateTime, Utc};
use tracing::info;

/// Payloads for every rendered query; `source` is left empty for the caller to stamp.
///
/// Queries whose qualifiers do not agree on exactly one START/STOP window are
/// dropped and logged. An unparseable timestamp fails the whole batch.
pub fn format_queries(
    profile: &dyn DialectProfile,
    translation: &Translation,
    time_range_minutes: i64,
    now: DateTime<Utc>,
) -> Result<Vec<QueryPayload>> {
    let mut payloads = Vec::with_capacity(translation.queries.len());

    for rendered in &translation.queries {
        let Some(query) = encode_window(profile.time_encoding(), rendered, time_range_minutes, now)?
        else {
            continue;
        };
        if query.is_empty() {
            continue;
        }

        let threat_type = if profile.tags_threat_type() {
            translation
                .threat_types
                .get(&rendered.clause)
                .map(ToString::to_string)
        } else {
            None
        };

        payloads.push(QueryPayload {
            offset: 0,
            query,
            threat_type,
            source: String::new(),
        });
    }

    Ok(payloads)
}

fn encode_window(
    encoding: TimeEncoding,
    rendered: &RenderedQuery,
    time_range_minutes: i64,
    now: DateTime<Utc>,
) -> Result<Option<String>> {
    if encoding == TimeEncoding::Ignored {
        return Ok(Some(rendered.clause.clone()));
    }

    let window = if rendered.qualifiers.is_empty() {
        TimeWindow::trailing(now, time_range_minutes)?
    } else {
        match qualified_window(&rendered.qualifiers) {
            Ok(window) => window,
            Err(TranslateError::MalformedTimeRangeMarker(qualifier)) => {
                info!(
                    query = %rendered.text(),
                    %qualifier,
                    "omitting query with malformed START/STOP qualifier"
                );
                return Ok(None);
            }
            Err(err) => return Err(err),
        }
    };
    let clause = &rendered.clause;

    let query = match encoding {
        TimeEncoding::EpochSeconds {
            start_key,
            stop_key,
        } => format!(
            "{start_key}={}&{stop_key}={}&{clause}",
            window.start.epoch_seconds(),
            window.stop.epoch_seconds()
        ),
        TimeEncoding::IsoMillis {
            start_key,
            stop_key,
        } => format!(
            "{start_key}={}&{stop_key}={}&{clause}",
            window.start.iso(),
            window.stop.iso()
        ),
        TimeEncoding::Ignored => clause.clone(),
    };
    Ok(Some(query))
}
