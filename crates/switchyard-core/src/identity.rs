//! Handler identity: the `(module, action)` pair and its registry key.

use crate::config::DispatchConfig;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Immutable `(module, action)` pair naming a handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerIdentity {
    module: String,
    action: String,
}

impl HandlerIdentity {
    pub fn new(module: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            action: action.into(),
        }
    }

    /// Identity in the default module.
    pub fn in_default_module(action: impl Into<String>) -> Self {
        Self::new(DispatchConfig::DEFAULT_MODULE, action)
    }

    /// Identity named after the simple name of `T`, in the default module.
    pub fn of<T: ?Sized>() -> Self {
        Self::in_default_module(simple_type_name::<T>())
    }

    /// Same action under another module.
    pub fn with_module(self, module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            action: self.action,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Registry key, `module.action`.
    pub fn key(&self) -> String {
        registry_key(&self.module, &self.action)
    }
}

impl std::fmt::Display for HandlerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.module, DispatchConfig::KEY_SEPARATOR, self.action)
    }
}

pub(crate) fn registry_key(module: &str, action: &str) -> String {
    format!("{}{}{}", module, DispatchConfig::KEY_SEPARATOR, action)
}

/// Last path segment of a type name, without generic arguments.
///
/// `my_crate::handlers::Echo` becomes `Echo`, `Wrapper<u8>` becomes `Wrapper`.
pub fn simple_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Packaging metadata naming the module a set of handlers belongs to.
///
/// Stored as JSON, e.g. `{"moduleName": "reports"}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleManifest {
    #[serde(default)]
    pub module_name: Option<String>,
}

impl ModuleManifest {
    /// Module name from a manifest file.
    ///
    /// A missing, unreadable or malformed manifest, or one without a
    /// `moduleName`, yields the default module. Failures are logged at debug
    /// level and never abort discovery.
    pub fn module_name_from(path: impl AsRef<Path>) -> String {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Could not read module manifest {}: {}", path.display(), e);
                return DispatchConfig::DEFAULT_MODULE.to_string();
            }
        };

        match serde_json::from_str::<ModuleManifest>(&content) {
            Ok(manifest) => manifest
                .module_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DispatchConfig::DEFAULT_MODULE.to_string()),
            Err(e) => {
                debug!("Could not parse module manifest {}: {}", path.display(), e);
                DispatchConfig::DEFAULT_MODULE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct ReportSummary;

    #[allow(dead_code)]
    struct Generic<T>(T);

    #[test]
    fn test_key_format() {
        let identity = HandlerIdentity::new("reports", "Summary");
        assert_eq!(identity.key(), "reports.Summary");
        assert_eq!(identity.to_string(), "reports.Summary");
    }

    #[test]
    fn test_default_module() {
        let identity = HandlerIdentity::in_default_module("Echo");
        assert_eq!(identity.module(), "core");
        assert_eq!(identity.key(), "core.Echo");
    }

    #[test]
    fn test_identity_from_type_name() {
        let identity = HandlerIdentity::of::<ReportSummary>();
        assert_eq!(identity.action(), "ReportSummary");
        assert_eq!(identity.module(), "core");
        assert_eq!(simple_type_name::<Generic<u8>>(), "Generic");
    }

    #[test]
    fn test_with_module_keeps_action() {
        let identity = HandlerIdentity::of::<ReportSummary>().with_module("reports");
        assert_eq!(identity.key(), "reports.ReportSummary");
    }

    #[test]
    fn test_manifest_module_name() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("module.json");
        std::fs::write(&path, r#"{"moduleName": "reports"}"#).unwrap();
        assert_eq!(ModuleManifest::module_name_from(&path), "reports");
    }

    #[test]
    fn test_manifest_missing_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.json");
        assert_eq!(ModuleManifest::module_name_from(&path), "core");
    }

    #[test]
    fn test_manifest_corrupt_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("module.json");
        std::fs::write(&path, "moduleName = reports").unwrap();
        assert_eq!(ModuleManifest::module_name_from(&path), "core");

        std::fs::write(&path, r#"{"moduleName": "  "}"#).unwrap();
        assert_eq!(ModuleManifest::module_name_from(&path), "core");
    }
}
