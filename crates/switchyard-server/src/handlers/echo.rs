//! Echo action.

use serde_json::Value;
use switchyard::params::get_bool_param;
use switchyard::{async_trait, ExecuteError, HandlerParams, JsonInOutHandler, Params};

/// Returns the decoded params object, `remoteAddr` included.
///
/// Setting `should_fail` (or `shouldFail`) to true makes the call fail instead.
pub struct Echo;

#[async_trait]
impl JsonInOutHandler for Echo {
    async fn process(&self, params: Params, _config: &HandlerParams) -> Result<Value, ExecuteError> {
        if get_bool_param(&params, "should_fail", "shouldFail").unwrap_or(false) {
            return Err(ExecuteError::new("Echo asked to fail"));
        }
        Ok(Value::Object(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use switchyard::Handler;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_echo_returns_params() {
        let handler = Handler::json_in_out(Echo);
        let value = handler
            .process_json(params(json!({"a": 1, "remoteAddr": "10.0.0.1"})))
            .await
            .unwrap();
        assert_eq!(value, json!({"a": 1, "remoteAddr": "10.0.0.1"}));
    }

    #[tokio::test]
    async fn test_echo_fail_flag() {
        let handler = Handler::json_in_out(Echo);
        let err = handler
            .process_json(params(json!({"shouldFail": true})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Echo asked to fail");
    }
}
