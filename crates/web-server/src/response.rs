//! The JSON envelope shared by every endpoint.

use axum::Json;
use serde_json::{json, Value};

/// RFC 3339 timestamp in UTC with millisecond precision.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// `{success: true, message, timestamp}` merged with `fields`.
///
/// `fields` must be a JSON object; anything else is placed under `data`.
pub fn success(message: impl Into<String>, fields: Value) -> Json<Value> {
    let mut body = json!({
        "success": true,
        "message": message.into(),
        "timestamp": timestamp(),
    });
    if let Some(envelope) = body.as_object_mut() {
        match fields {
            Value::Object(extra) => envelope.extend(extra),
            Value::Null => {}
            other => {
                envelope.insert("data".into(), other);
            }
        }
    }
    Json(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_object_fields_into_envelope() {
        let Json(body) = success("ok", json!({ "data": [1, 2] }));
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "ok");
        assert_eq!(body["data"], json!([1, 2]));
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn wraps_non_object_payload_as_data() {
        let Json(body) = success("ok", json!(3));
        assert_eq!(body["data"], 3);
    }
}
