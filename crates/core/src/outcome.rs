// crates/core/src/outcome.rs
use serde::Serialize;
use serde_json::Value;

/// What a collaborator hands back on success: a human-readable message
/// plus optional action-specific extras (created env name, paths, …).
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub message: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Outcome {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: Value::Null,
        }
    }

    pub fn with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_message_omits_data() {
        let json = serde_json::to_string(&Outcome::message("done")).unwrap();
        assert_eq!(json, r#"{"message":"done"}"#);
    }

    #[test]
    fn data_is_carried() {
        let outcome = Outcome::with_data("env ready", json!({"env_name": "proj_env"}));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["data"]["env_name"], "proj_env");
    }
}
