//! Outbound response messages and the model state snapshot.
//!
//! Every matched request produces a [`Response`] that is broadcast to
//! all connected clients, so each viewer observes every mutation made
//! by any client. Successful `eval` responses may additionally carry a
//! [`StateSnapshot`] publishing the model entity's current state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result tag of a [`Response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The request was handled and produced a value.
    Success,
    /// An `eval` fragment raised or failed to parse; the captured
    /// output (including the fault text) is in `return`.
    Exception,
    /// The request could not be handled (unknown variable, malformed
    /// payload, or no recognized verb).
    Error,
}

/// The model state payload attached to a response when the model entity
/// changed since it was last published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// The model's `modules` attribute, verbatim.
    pub modules: Value,
    /// The model's `connections` attribute, verbatim.
    pub connections: Value,
}

/// An outbound response to a client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Outcome tag: `success`, `exception`, or `error`.
    pub result: Outcome,

    /// Returned value: the captured textual output for `eval`, or the
    /// raw returned value for `call`/`get`. Absent for `set` and for
    /// error responses.
    #[serde(rename = "return", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Human-readable description of an error outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Model state snapshot, attached to `eval` responses when the
    /// change detector decides the model must be re-published.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StateSnapshot>,
}

impl Response {
    /// A success response carrying a return value.
    pub const fn success(value: Value) -> Self {
        Self {
            result: Outcome::Success,
            value: Some(value),
            description: None,
            state: None,
        }
    }

    /// A bare success response with no return value (the `set` shape).
    pub const fn ok() -> Self {
        Self {
            result: Outcome::Success,
            value: None,
            description: None,
            state: None,
        }
    }

    /// An exception response carrying the captured output text.
    pub fn exception(output: impl Into<String>) -> Self {
        Self {
            result: Outcome::Exception,
            value: Some(Value::String(output.into())),
            description: None,
            state: None,
        }
    }

    /// An error response with a description.
    pub fn error(description: impl Into<String>) -> Self {
        Self {
            result: Outcome::Error,
            value: None,
            description: Some(description.into()),
            state: None,
        }
    }

    /// The response sent for a request matching no known verb.
    pub fn invalid_request() -> Self {
        Self::error("invalid request")
    }

    /// Attach a state snapshot to this response.
    #[must_use]
    pub fn with_state(mut self, state: StateSnapshot) -> Self {
        self.state = Some(state);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_with_return_field() {
        let response = Response::success(Value::String(String::from("2\n")));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"result": "success", "return": "2\n"}));
    }

    #[test]
    fn set_shape_omits_absent_fields() {
        let json = serde_json::to_value(Response::ok()).unwrap();
        assert_eq!(json, serde_json::json!({"result": "success"}));
    }

    #[test]
    fn error_serializes_with_description() {
        let json = serde_json::to_value(Response::error("no such variable")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"result": "error", "description": "no such variable"})
        );
    }

    #[test]
    fn snapshot_rides_along_on_eval_responses() {
        let snapshot = StateSnapshot {
            modules: serde_json::json!({"osc1": {"kind": "oscillator"}}),
            connections: serde_json::json!([["osc1", "out"]]),
        };
        let response = Response::success(Value::String(String::new())).with_state(snapshot);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["state"]["modules"]["osc1"]["kind"], "oscillator");
        assert_eq!(json["state"]["connections"][0][0], "osc1");
    }
}
