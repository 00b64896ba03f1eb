//! Handler modalities.
//!
//! A modality is the calling convention a handler is written against. It
//! decides what the dispatcher hands the handler (the raw request or the
//! decoded params object) and where the output goes (the raw response, a
//! text writer, or a returned JSON value).

use serde::{Deserialize, Serialize};

/// Calling convention of a handler, fixed when the handler is authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    /// Raw request in, raw response out. The handler sets its own content type.
    Raw,
    /// Raw request in, text writer out with a pre-declared content type.
    Text,
    /// Params object in, raw response out.
    JsonInputRaw,
    /// Params object in, text writer out with a pre-declared content type.
    JsonInput,
    /// Raw request in, returned JSON value out.
    JsonOutput,
    /// Params object in, returned JSON value out.
    JsonInOut,
}

impl Modality {
    pub const ALL: [Modality; 6] = [
        Modality::Raw,
        Modality::Text,
        Modality::JsonInputRaw,
        Modality::JsonInput,
        Modality::JsonOutput,
        Modality::JsonInOut,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Raw => "RAW",
            Modality::Text => "TEXT",
            Modality::JsonInputRaw => "JSON_INPUT_RAW",
            Modality::JsonInput => "JSON_INPUT",
            Modality::JsonOutput => "JSON_OUTPUT",
            Modality::JsonInOut => "JSON_IN_OUT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "RAW" => Some(Modality::Raw),
            "TEXT" => Some(Modality::Text),
            "JSON_INPUT_RAW" => Some(Modality::JsonInputRaw),
            "JSON_INPUT" => Some(Modality::JsonInput),
            "JSON_OUTPUT" => Some(Modality::JsonOutput),
            "JSON_IN_OUT" => Some(Modality::JsonInOut),
            _ => None,
        }
    }

    /// Whether the handler receives the decoded params object.
    pub fn takes_params(&self) -> bool {
        matches!(
            self,
            Modality::JsonInputRaw | Modality::JsonInput | Modality::JsonInOut
        )
    }

    /// Whether output goes through the shared text writer, which needs a
    /// content type before it is acquired.
    pub fn uses_writer(&self) -> bool {
        matches!(
            self,
            Modality::Text | Modality::JsonInput | Modality::JsonOutput | Modality::JsonInOut
        )
    }

    /// Whether the handler returns a JSON value. Only these modalities report
    /// failures through an error envelope.
    pub fn returns_json(&self) -> bool {
        matches!(self, Modality::JsonOutput | Modality::JsonInOut)
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
