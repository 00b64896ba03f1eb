//! Liveness action.

use serde_json::{json, Value};
use switchyard::{async_trait, ActionRequest, ExecuteError, HandlerParams, JsonOutputHandler};

/// Reports the server is up, with the current time and configured site root.
pub struct Ping;

#[async_trait]
impl JsonOutputHandler for Ping {
    async fn process(
        &self,
        request: &ActionRequest,
        config: &HandlerParams,
    ) -> Result<Value, ExecuteError> {
        Ok(json!({
            "status": "ok",
            "time": chrono::Utc::now().to_rfc3339(),
            "siteRoot": config.get("siteRoot"),
            "remoteAddr": request.remote_addr(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard::Handler;

    #[tokio::test]
    async fn test_ping() {
        let handler = Handler::json_output(Ping);
        handler.configure("siteRoot", "/srv/www");
        let request = ActionRequest::new().with_remote_addr("10.0.0.1");

        let value = handler.process_request_json(&request).await.unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["siteRoot"], "/srv/www");
        assert_eq!(value["remoteAddr"], "10.0.0.1");
        assert!(chrono::DateTime::parse_from_rfc3339(value["time"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_ping_without_site_root() {
        let value = Handler::json_output(Ping)
            .process_request_json(&ActionRequest::new())
            .await
            .unwrap();
        assert!(value["siteRoot"].is_null());
    }
}
