//! # Broker wire format.
//!
//! One JSON object per queue item:
//!
//! ```json
//! { "script": "reports.daily", "params": "2026-08-25" }
//! ```
//!
//! ## Decoding rules
//! - The payload must be a single JSON object; arrays and unparsable text are
//!   decode failures.
//! - `script` must be a string; any other type is a decode failure.
//! - `params` absent or `null` → no parameters; a string is used verbatim; an
//!   object becomes a structured parameter document.
//!
//! Every decode failure is [`FlumeError::NonCritical`]: the malformed item is
//! discarded and the consuming supplier moves on to the next pop.

use serde_json::Value;

use crate::error::FlumeError;
use crate::tasks::{Params, Task};

/// Decodes one queue payload into `(script, params)`.
pub fn decode(payload: &str) -> Result<(String, Params), FlumeError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| FlumeError::non_critical(format!("unparsable queue item: {e}")))?;

    let obj = match value {
        Value::Object(obj) => obj,
        other => {
            return Err(FlumeError::non_critical(format!(
                "queue item must be a JSON object, got {}",
                json_type(&other)
            )))
        }
    };

    let script = match obj.get("script") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(FlumeError::non_critical(format!(
                "'script' must be a string, got {}",
                json_type(other)
            )))
        }
        None => return Err(FlumeError::non_critical("queue item has no 'script' field")),
    };

    let params = match obj.get("params") {
        None | Some(Value::Null) => Params::None,
        Some(Value::String(s)) => Params::Text(s.clone()),
        Some(doc @ Value::Object(_)) => Params::Doc(doc.clone()),
        Some(other) => {
            return Err(FlumeError::non_critical(format!(
                "'params' must be a string or object, got {}",
                json_type(other)
            )))
        }
    };

    Ok((script, params))
}

/// Encodes a task back into the wire shape, for diagnostics and re-queueing.
///
/// Produces `{"script":"<s>","params":"<p>"}`; `params` is omitted when the
/// task has none. Structured documents are emitted in their normalized string
/// form, matching what the engine would have received.
pub fn encode(task: &Task) -> Result<String, FlumeError> {
    let script = serde_json::to_string(task.script())
        .map_err(|e| FlumeError::runtime(format!("could not encode script name: {e}")))?;
    match task.params().normalize_opt()? {
        Some(p) => {
            let params = serde_json::to_string(&p)
                .map_err(|e| FlumeError::runtime(format!("could not encode params: {e}")))?;
            Ok(format!(r#"{{"script":{script},"params":{params}}}"#))
        }
        None => Ok(format!(r#"{{"script":{script}}}"#)),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
