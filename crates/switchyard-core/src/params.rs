//! Structured parameter decoding and enrichment.

use crate::config::DispatchConfig;
use crate::error::ExecuteError;
use serde_json::{Map, Value};
use tracing::debug;

/// Decoded params object handed to the JSON-input modalities.
///
/// Keys keep their arrival order.
pub type Params = Map<String, Value>;

/// Parse the raw `params` text of a request.
///
/// Malformed text, or text whose top level is not an object, is treated as
/// if no params were sent.
pub fn decode_params(raw: Option<&str>) -> Option<Params> {
    let raw = raw?;
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            debug!("Ignoring params that are not an object: {}", other);
            None
        }
        Err(e) => {
            debug!("Ignoring malformed params: {}", e);
            None
        }
    }
}

/// Insert the caller address under `remoteAddr` unless the key is taken.
///
/// Returns whether the address was inserted.
pub fn enrich_remote_addr(params: &mut Params, remote_addr: &str) -> bool {
    if params.contains_key(DispatchConfig::REMOTE_ADDR_KEY) {
        debug!(
            "Parameter {} already present, keeping caller value",
            DispatchConfig::REMOTE_ADDR_KEY
        );
        return false;
    }
    params.insert(
        DispatchConfig::REMOTE_ADDR_KEY.to_string(),
        Value::String(remote_addr.to_string()),
    );
    true
}

/// Params required by a JSON-input modality, or the missing-params failure.
pub fn require_params(params: Option<Params>) -> Result<Params, ExecuteError> {
    params.ok_or_else(|| ExecuteError::new(DispatchConfig::MISSING_PARAMS_MESSAGE))
}

/// Extract an optional bool parameter, supporting both snake_case and camelCase.
pub fn get_bool_param(params: &Params, snake: &str, camel: &str) -> Option<bool> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .and_then(|v| v.as_bool())
}
