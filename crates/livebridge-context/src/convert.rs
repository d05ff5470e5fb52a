//! Conversions between JSON wire values and script values.

use rhai::Dynamic;
use serde_json::Value;

use crate::error::ContextError;

/// Convert a script value into a JSON value for the wire.
///
/// Opaque custom types (such as the model handle itself) have no JSON
/// representation; they fall back to their display form so a `get` on
/// them still produces something readable instead of failing.
pub fn dynamic_to_json(value: &Dynamic) -> Value {
    rhai::serde::from_dynamic::<Value>(value)
        .unwrap_or_else(|_| Value::String(value.to_string()))
}

/// Convert a JSON wire value into a script value.
pub fn json_to_dynamic(value: &Value) -> Result<Dynamic, ContextError> {
    rhai::serde::to_dynamic(value).map_err(|e| ContextError::Conversion(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn scalars_round_trip() {
        let value = serde_json::json!(5);
        let dynamic = json_to_dynamic(&value).unwrap();
        assert_eq!(dynamic.as_int().unwrap(), 5);
        assert_eq!(dynamic_to_json(&dynamic), value);
    }

    #[test]
    fn maps_and_arrays_round_trip() {
        let value = serde_json::json!({"name": "osc1", "taps": [1, 2, 3]});
        let dynamic = json_to_dynamic(&value).unwrap();
        assert_eq!(dynamic_to_json(&dynamic), value);
    }

    #[test]
    fn opaque_values_fall_back_to_display_text() {
        let model = Dynamic::from(crate::model::Model::new());
        let json = dynamic_to_json(&model);
        assert!(json.is_string());
    }
}
