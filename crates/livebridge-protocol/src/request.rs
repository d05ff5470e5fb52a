//! Inbound request messages.
//!
//! A request is a JSON object carrying exactly one of four verb fields.
//! The server tests the verbs in a fixed priority order (`call`, `eval`,
//! `get`, `set`) and acts on the first one present; a request with no
//! verb field is invalid and is answered with an error response sent
//! only to the requester.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The four verbs a client can issue, in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Invoke a named routine in the namespace with keyword arguments.
    Call,
    /// Evaluate a source fragment against the persistent namespace.
    Eval,
    /// Read a variable from the namespace.
    Get,
    /// Bind or rebind a variable in the namespace.
    Set,
}

/// An inbound request from a connected client.
///
/// Exactly one of the verb fields should be present. Additional fields
/// carry the verb's payload: `args` for `call`, `value` for `set`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Request {
    /// Name of the routine to invoke.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<String>,

    /// Source fragment to evaluate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval: Option<String>,

    /// Name of the variable to read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<String>,

    /// Name of the variable to write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set: Option<String>,

    /// Value payload for `set`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Keyword arguments for `call`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Map<String, Value>>,
}

impl Request {
    /// Select the verb to dispatch, testing `call`, `eval`, `get`,
    /// `set` in that fixed priority order.
    ///
    /// Returns `None` when no verb field is present, which the server
    /// treats as an invalid request.
    pub const fn verb(&self) -> Option<Verb> {
        if self.call.is_some() {
            Some(Verb::Call)
        } else if self.eval.is_some() {
            Some(Verb::Eval)
        } else if self.get.is_some() {
            Some(Verb::Get)
        } else if self.set.is_some() {
            Some(Verb::Set)
        } else {
            None
        }
    }
}
