//! Centralized configuration for the dispatcher.
//!
//! This module provides the well-known names and constants shared by the
//! registry, the dispatcher and handler implementations.

/// Dispatch-level configuration.
pub struct DispatchConfig;

impl DispatchConfig {
    /// Module assumed when a handler or a request does not name one.
    pub const DEFAULT_MODULE: &'static str = "core";
    /// Separator between module and action in a registry key.
    pub const KEY_SEPARATOR: &'static str = ".";
    /// Request parameter carrying the action name.
    pub const ACTION_PARAM: &'static str = "action";
    /// Request parameter carrying the module name.
    pub const MODULE_PARAM: &'static str = "module";
    /// Request parameter carrying the structured parameters as JSON text.
    pub const PARAMS_PARAM: &'static str = "params";
    /// Key under which the caller's address is injected into params.
    pub const REMOTE_ADDR_KEY: &'static str = "remoteAddr";
    /// Handler parameter receiving the host's site root.
    pub const SITE_ROOT_PARAM: &'static str = "siteRoot";
    /// Failure message for JSON-input modalities called without params.
    pub const MISSING_PARAMS_MESSAGE: &'static str = "No params object provided";
    /// Status written when no handler could be resolved.
    pub const NOT_IMPLEMENTED_STATUS: u16 = 501;
    /// Status written for every other outcome.
    pub const OK_STATUS: u16 = 200;
}

/// Content types used by the stock handler modalities.
pub struct ContentTypes;

impl ContentTypes {
    pub const JSON: &'static str = "application/json; charset=UTF-8";
    pub const TEXT: &'static str = "text/plain; charset=UTF-8";
    pub const HTML: &'static str = "text/html; charset=UTF-8";
    pub const OCTET_STREAM: &'static str = "application/octet-stream";
}

/// Header names written by the dispatcher or the response helpers.
pub struct HeaderNames;

impl HeaderNames {
    pub const CONTENT_DISPOSITION: &'static str = "Content-Disposition";
    pub const ALLOW_ORIGIN: &'static str = "Access-Control-Allow-Origin";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_module_is_core() {
        assert_eq!(DispatchConfig::DEFAULT_MODULE, "core");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(DispatchConfig::NOT_IMPLEMENTED_STATUS, 501);
        assert_eq!(DispatchConfig::OK_STATUS, 200);
    }
}
