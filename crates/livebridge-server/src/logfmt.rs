//! Display helpers for the request/response event log.
//!
//! When debug logging is enabled every inbound request and outbound
//! response is logged with a truncated session identifier and the
//! payload trimmed to a bounded display width, so a pasted screenful of
//! script source cannot flood the console.

use uuid::Uuid;

/// Maximum characters of payload shown per log line.
const MAX_LOG_LEN: usize = 80;

/// Suffix appended to a trimmed payload.
const ELLIPSIS: &str = " ...";

/// Truncated peer identifier for log lines (first 8 hex chars).
pub fn short_session(session: Uuid) -> String {
    let full = session.simple().to_string();
    full.chars().take(8).collect()
}

/// Trim a payload to the bounded display width.
pub fn trim_payload(payload: &str) -> String {
    let budget = MAX_LOG_LEN - ELLIPSIS.len();
    if payload.chars().count() <= MAX_LOG_LEN {
        payload.to_owned()
    } else {
        let head: String = payload.chars().take(budget).collect();
        format!("{head}{ELLIPSIS}")
    }
}
