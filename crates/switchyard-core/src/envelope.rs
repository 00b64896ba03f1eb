//! The error envelope written for failed JSON-producing calls.

use serde::{Deserialize, Serialize};
use tracing::error;

/// `{"error": {"message": ...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                message: message.into(),
            },
        }
    }

    /// Same envelope as [`ErrorEnvelope::new`], logging `message` and `cause`
    /// at error level first. The cause never reaches the envelope.
    pub fn logged(message: impl Into<String>, cause: &dyn std::error::Error) -> Self {
        let message = message.into();
        error!("{}: {}", message, cause);
        Self::new(message)
    }

    pub fn message(&self) -> &str {
        &self.error.message
    }

    /// Compact JSON text of the envelope.
    pub fn to_json_string(&self) -> String {
        // A struct of two strings always serializes.
        serde_json::to_string(self)
            .unwrap_or_else(|_| String::from(r#"{"error":{"message":""}}"#))
    }
}

impl std::fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_json_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let envelope = ErrorEnvelope::new("Something broke");
        assert_eq!(
            envelope.to_json_string(),
            r#"{"error":{"message":"Something broke"}}"#
        );
    }

    #[test]
    fn test_envelope_escapes_message() {
        let envelope = ErrorEnvelope::new("say \"hi\"");
        let parsed: serde_json::Value = serde_json::from_str(&envelope.to_string()).unwrap();
        assert_eq!(parsed["error"]["message"], "say \"hi\"");
    }

    #[test]
    fn test_logged_envelope_omits_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "stack details");
        let envelope = ErrorEnvelope::logged("Lookup failed", &cause);
        assert_eq!(envelope, ErrorEnvelope::new("Lookup failed"));
        assert!(!envelope.to_json_string().contains("stack details"));
    }
}
