use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Envelope every storefront endpoint answers with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
    pub error: Option<Value>,
}

impl<T: DeserializeOwned> ApiResponse<T> {
    pub fn from_value(body: Value, context: &'static str) -> AppResult<Self> {
        serde_json::from_value(body).map_err(|err| {
            tracing::warn!(error = %err, context, "response did not match the envelope");
            AppError::UnexpectedResponse(context)
        })
    }

    /// Returns `data` of a successful envelope, or fails with the shape error.
    pub fn into_data(self, context: &'static str) -> AppResult<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(AppError::UnexpectedResponse(context)),
        }
    }
}

/// Pulls a human readable message out of an error body.
///
/// Validation errors arrive as `{"error": {"field": ["msg", ...]}}` and are
/// flattened into one line.
pub fn error_message(body: &Value) -> Option<String> {
    match body.get("error") {
        Some(Value::String(message)) if !message.is_empty() => return Some(message.clone()),
        Some(Value::Object(fields)) => {
            let parts: Vec<String> = fields.values().flat_map(flatten_strings).collect();
            if !parts.is_empty() {
                return Some(parts.join(" "));
            }
        }
        _ => {}
    }

    body.get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

fn flatten_strings(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(flatten_strings).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}
