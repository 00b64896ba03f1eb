//! The handler contract.
//!
//! Handler authors implement exactly one of the six modality traits below
//! and wrap the implementation in a [`Handler`], which carries the identity,
//! configuration parameters and cross-origin policy. The wrapper exposes one
//! entry point per modality; calling any entry point other than the one
//! matching the wrapped implementation fails with
//! [`DispatchError::Unsupported`].

use crate::config::ContentTypes;
use crate::error::{DispatchError, ExecuteError, Result};
use crate::identity::{HandlerIdentity, ModuleManifest};
use crate::modality::Modality;
use crate::params::Params;
use crate::transport::{ActionRequest, ResponseSink, TextWriter};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

/// Raw request in, raw response out.
#[async_trait]
pub trait RawHandler: Send + Sync + 'static {
    async fn process(
        &self,
        request: &ActionRequest,
        response: &mut ResponseSink,
        config: &HandlerParams,
    ) -> std::result::Result<(), ExecuteError>;

    fn release(&self) -> std::result::Result<(), ExecuteError> {
        Ok(())
    }
}

/// Raw request in, text out.
#[async_trait]
pub trait TextHandler: Send + Sync + 'static {
    fn content_type(&self) -> &str;

    async fn process(
        &self,
        request: &ActionRequest,
        out: &mut TextWriter<'_>,
        config: &HandlerParams,
    ) -> std::result::Result<(), ExecuteError>;

    fn release(&self) -> std::result::Result<(), ExecuteError> {
        Ok(())
    }
}

/// Params in, raw response out.
#[async_trait]
pub trait JsonInputRawHandler: Send + Sync + 'static {
    async fn process(
        &self,
        params: Params,
        response: &mut ResponseSink,
        config: &HandlerParams,
    ) -> std::result::Result<(), ExecuteError>;

    fn release(&self) -> std::result::Result<(), ExecuteError> {
        Ok(())
    }
}

/// Params in, text out.
#[async_trait]
pub trait JsonInputHandler: Send + Sync + 'static {
    fn content_type(&self) -> &str;

    async fn process(
        &self,
        params: Params,
        out: &mut TextWriter<'_>,
        config: &HandlerParams,
    ) -> std::result::Result<(), ExecuteError>;

    fn release(&self) -> std::result::Result<(), ExecuteError> {
        Ok(())
    }
}

/// Raw request in, JSON value out.
#[async_trait]
pub trait JsonOutputHandler: Send + Sync + 'static {
    fn content_type(&self) -> &str {
        ContentTypes::JSON
    }

    async fn process(
        &self,
        request: &ActionRequest,
        config: &HandlerParams,
    ) -> std::result::Result<Value, ExecuteError>;

    fn release(&self) -> std::result::Result<(), ExecuteError> {
        Ok(())
    }
}

/// Params in, JSON value out.
#[async_trait]
pub trait JsonInOutHandler: Send + Sync + 'static {
    fn content_type(&self) -> &str {
        ContentTypes::JSON
    }

    async fn process(
        &self,
        params: Params,
        config: &HandlerParams,
    ) -> std::result::Result<Value, ExecuteError>;

    fn release(&self) -> std::result::Result<(), ExecuteError> {
        Ok(())
    }
}

/// The one implementation a handler wraps. The variant is the modality.
pub enum HandlerKind {
    Raw(Box<dyn RawHandler>),
    Text(Box<dyn TextHandler>),
    JsonInputRaw(Box<dyn JsonInputRawHandler>),
    JsonInput(Box<dyn JsonInputHandler>),
    JsonOutput(Box<dyn JsonOutputHandler>),
    JsonInOut(Box<dyn JsonInOutHandler>),
}

impl HandlerKind {
    pub fn modality(&self) -> Modality {
        match self {
            HandlerKind::Raw(_) => Modality::Raw,
            HandlerKind::Text(_) => Modality::Text,
            HandlerKind::JsonInputRaw(_) => Modality::JsonInputRaw,
            HandlerKind::JsonInput(_) => Modality::JsonInput,
            HandlerKind::JsonOutput(_) => Modality::JsonOutput,
            HandlerKind::JsonInOut(_) => Modality::JsonInOut,
        }
    }
}

/// Configuration strings pushed into a handler by the host.
///
/// Written with [`Handler::configure`], read by the handler during calls.
#[derive(Debug, Default)]
pub struct HandlerParams {
    values: RwLock<HashMap<String, String>>,
}

impl HandlerParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.contains_key(name)
    }

    /// Copy of every parameter.
    pub fn snapshot(&self) -> HashMap<String, String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.clone()
    }

    fn set(&self, name: String, value: String) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(name, value);
    }
}

/// A registered unit of request-handling logic.
pub struct Handler {
    identity: HandlerIdentity,
    kind: HandlerKind,
    params: HandlerParams,
    cross_origin_domains: Option<String>,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("identity", &self.identity)
            .field("modality", &self.modality())
            .field("cross_origin_domains", &self.cross_origin_domains)
            .finish()
    }
}

impl Handler {
    /// Wrap an implementation under an explicit identity.
    pub fn new(identity: HandlerIdentity, kind: HandlerKind) -> Self {
        Self {
            identity,
            kind,
            params: HandlerParams::new(),
            cross_origin_domains: None,
        }
    }

    pub fn raw<H: RawHandler>(handler: H) -> Self {
        Self::new(HandlerIdentity::of::<H>(), HandlerKind::Raw(Box::new(handler)))
    }

    pub fn text<H: TextHandler>(handler: H) -> Self {
        Self::new(HandlerIdentity::of::<H>(), HandlerKind::Text(Box::new(handler)))
    }

    pub fn json_input_raw<H: JsonInputRawHandler>(handler: H) -> Self {
        Self::new(
            HandlerIdentity::of::<H>(),
            HandlerKind::JsonInputRaw(Box::new(handler)),
        )
    }

    pub fn json_input<H: JsonInputHandler>(handler: H) -> Self {
        Self::new(
            HandlerIdentity::of::<H>(),
            HandlerKind::JsonInput(Box::new(handler)),
        )
    }

    pub fn json_output<H: JsonOutputHandler>(handler: H) -> Self {
        Self::new(
            HandlerIdentity::of::<H>(),
            HandlerKind::JsonOutput(Box::new(handler)),
        )
    }

    pub fn json_in_out<H: JsonInOutHandler>(handler: H) -> Self {
        Self::new(
            HandlerIdentity::of::<H>(),
            HandlerKind::JsonInOut(Box::new(handler)),
        )
    }

    /// Move the handler into another module. The action name is kept.
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.identity = self.identity.with_module(module);
        self
    }

    /// Move the handler into the module named by a manifest file.
    ///
    /// An unusable manifest leaves the handler in the default module.
    pub fn with_module_manifest(self, path: impl AsRef<Path>) -> Self {
        let module = ModuleManifest::module_name_from(path);
        self.with_module(module)
    }

    /// Domains allowed to call this handler cross-origin.
    pub fn with_cross_origin_domains(mut self, domains: impl Into<String>) -> Self {
        self.cross_origin_domains = Some(domains.into());
        self
    }

    pub fn identity(&self) -> &HandlerIdentity {
        &self.identity
    }

    pub fn module(&self) -> &str {
        self.identity.module()
    }

    pub fn action(&self) -> &str {
        self.identity.action()
    }

    pub fn key(&self) -> String {
        self.identity.key()
    }

    pub fn modality(&self) -> Modality {
        self.kind.modality()
    }

    /// Content type of the handler's output.
    ///
    /// RAW and JSON_INPUT_RAW handlers set their own content type on the
    /// response, so asking them fails.
    pub fn content_type(&self) -> Result<&str> {
        match &self.kind {
            HandlerKind::Text(h) => Ok(h.content_type()),
            HandlerKind::JsonInput(h) => Ok(h.content_type()),
            HandlerKind::JsonOutput(h) => Ok(h.content_type()),
            HandlerKind::JsonInOut(h) => Ok(h.content_type()),
            HandlerKind::Raw(_) | HandlerKind::JsonInputRaw(_) => {
                Err(DispatchError::unsupported("content_type", self.modality()))
            }
        }
    }

    pub fn cross_origin_domains(&self) -> Option<&str> {
        self.cross_origin_domains.as_deref()
    }

    /// Set a configuration parameter. Last write per name wins.
    pub fn configure(&self, name: impl Into<String>, value: impl Into<String>) {
        self.params.set(name.into(), value.into());
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.params.get(name)
    }

    pub fn params(&self) -> &HandlerParams {
        &self.params
    }

    /// RAW entry point.
    pub async fn process_raw(
        &self,
        request: &ActionRequest,
        response: &mut ResponseSink,
    ) -> Result<()> {
        match &self.kind {
            HandlerKind::Raw(h) => Ok(h.process(request, response, &self.params).await?),
            _ => Err(DispatchError::unsupported("process_raw", self.modality())),
        }
    }

    /// TEXT entry point.
    pub async fn process_text(
        &self,
        request: &ActionRequest,
        out: &mut TextWriter<'_>,
    ) -> Result<()> {
        match &self.kind {
            HandlerKind::Text(h) => Ok(h.process(request, out, &self.params).await?),
            _ => Err(DispatchError::unsupported("process_text", self.modality())),
        }
    }

    /// JSON_INPUT_RAW entry point.
    pub async fn process_params_raw(
        &self,
        params: Params,
        response: &mut ResponseSink,
    ) -> Result<()> {
        match &self.kind {
            HandlerKind::JsonInputRaw(h) => Ok(h.process(params, response, &self.params).await?),
            _ => Err(DispatchError::unsupported(
                "process_params_raw",
                self.modality(),
            )),
        }
    }

    /// JSON_INPUT entry point.
    pub async fn process_params_text(
        &self,
        params: Params,
        out: &mut TextWriter<'_>,
    ) -> Result<()> {
        match &self.kind {
            HandlerKind::JsonInput(h) => Ok(h.process(params, out, &self.params).await?),
            _ => Err(DispatchError::unsupported(
                "process_params_text",
                self.modality(),
            )),
        }
    }

    /// JSON_OUTPUT entry point.
    pub async fn process_request_json(&self, request: &ActionRequest) -> Result<Value> {
        match &self.kind {
            HandlerKind::JsonOutput(h) => Ok(h.process(request, &self.params).await?),
            _ => Err(DispatchError::unsupported(
                "process_request_json",
                self.modality(),
            )),
        }
    }

    /// JSON_IN_OUT entry point.
    pub async fn process_json(&self, params: Params) -> Result<Value> {
        match &self.kind {
            HandlerKind::JsonInOut(h) => Ok(h.process(params, &self.params).await?),
            _ => Err(DispatchError::unsupported("process_json", self.modality())),
        }
    }

    /// Release resources held by the implementation.
    pub fn release(&self) -> std::result::Result<(), ExecuteError> {
        match &self.kind {
            HandlerKind::Raw(h) => h.release(),
            HandlerKind::Text(h) => h.release(),
            HandlerKind::JsonInputRaw(h) => h.release(),
            HandlerKind::JsonInput(h) => h.release(),
            HandlerKind::JsonOutput(h) => h.release(),
            HandlerKind::JsonInOut(h) => h.release(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl JsonInOutHandler for Echo {
        async fn process(
            &self,
            params: Params,
            _config: &HandlerParams,
        ) -> std::result::Result<Value, ExecuteError> {
            Ok(Value::Object(params))
        }
    }

    struct Banner;

    #[async_trait]
    impl TextHandler for Banner {
        fn content_type(&self) -> &str {
            ContentTypes::HTML
        }

        async fn process(
            &self,
            _request: &ActionRequest,
            out: &mut TextWriter<'_>,
            config: &HandlerParams,
        ) -> std::result::Result<(), ExecuteError> {
            let root = config.get("siteRoot").unwrap_or_default();
            out.print(&format!("<p>{}</p>", root));
            Ok(())
        }
    }

    struct Download;

    #[async_trait]
    impl RawHandler for Download {
        async fn process(
            &self,
            _request: &ActionRequest,
            response: &mut ResponseSink,
            _config: &HandlerParams,
        ) -> std::result::Result<(), ExecuteError> {
            response.set_content_type(ContentTypes::OCTET_STREAM);
            response.write(b"\x00\x01");
            Ok(())
        }
    }

    #[test]
    fn test_identity_defaults_to_type_name() {
        let handler = Handler::json_in_out(Echo);
        assert_eq!(handler.action(), "Echo");
        assert_eq!(handler.module(), "core");
        assert_eq!(handler.key(), "core.Echo");
        assert_eq!(Handler::text(Banner).action(), "Banner");
    }

    #[test]
    fn test_with_module() {
        let handler = Handler::json_in_out(Echo).with_module("demo");
        assert_eq!(handler.key(), "demo.Echo");
    }

    #[test]
    fn test_with_module_manifest() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let manifest = temp_dir.path().join("module.json");
        std::fs::write(&manifest, r#"{"moduleName": "reports"}"#).unwrap();

        let handler = Handler::json_in_out(Echo).with_module_manifest(&manifest);
        assert_eq!(handler.key(), "reports.Echo");

        let fallback = Handler::text(Banner).with_module_manifest(temp_dir.path().join("none.json"));
        assert_eq!(fallback.key(), "core.Banner");
    }

    #[test]
    fn test_modality_follows_implementation() {
        assert_eq!(Handler::json_in_out(Echo).modality(), Modality::JsonInOut);
        assert_eq!(Handler::text(Banner).modality(), Modality::Text);
        assert_eq!(Handler::raw(Download).modality(), Modality::Raw);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(
            Handler::json_in_out(Echo).content_type().unwrap(),
            ContentTypes::JSON
        );
        assert_eq!(Handler::text(Banner).content_type().unwrap(), ContentTypes::HTML);
    }

    #[test]
    fn test_raw_content_type_is_unsupported() {
        let err = Handler::raw(Download).content_type().unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_configure_last_write_wins() {
        let handler = Handler::text(Banner);
        handler.configure("siteRoot", "/srv/a");
        handler.configure("siteRoot", "/srv/b");
        assert_eq!(handler.param("siteRoot").as_deref(), Some("/srv/b"));
        assert!(handler.params().contains("siteRoot"));
        assert_eq!(handler.params().snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_matching_entry_point() {
        let handler = Handler::json_in_out(Echo);
        let mut params = Params::new();
        params.insert("a".into(), json!(1));
        let value = handler.process_json(params).await.unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_mismatched_entry_points_fail() {
        let handler = Handler::json_in_out(Echo);
        let request = ActionRequest::new();
        let mut sink = ResponseSink::new();

        let err = handler.process_raw(&request, &mut sink).await.unwrap_err();
        assert!(err.is_unsupported());

        let err = handler
            .process_params_raw(Params::new(), &mut sink)
            .await
            .unwrap_err();
        assert!(err.is_unsupported());

        let err = handler.process_request_json(&request).await.unwrap_err();
        assert!(err.is_unsupported());

        {
            let mut out = sink.writer();
            let err = handler.process_text(&request, &mut out).await.unwrap_err();
            assert!(err.is_unsupported());
            let err = handler
                .process_params_text(Params::new(), &mut out)
                .await
                .unwrap_err();
            assert!(err.is_unsupported());
        }
        assert!(sink.body().is_empty());
    }

    #[tokio::test]
    async fn test_text_handler_reads_config() {
        let handler = Handler::text(Banner);
        handler.configure("siteRoot", "/srv/www");
        let request = ActionRequest::new();
        let mut sink = ResponseSink::new();
        {
            let mut out = sink.writer();
            handler.process_text(&request, &mut out).await.unwrap();
        }
        assert_eq!(sink.body_text(), "<p>/srv/www</p>");
    }

    #[tokio::test]
    async fn test_raw_handler_writes_response() {
        let handler = Handler::raw(Download);
        let mut sink = ResponseSink::new();
        handler
            .process_raw(&ActionRequest::new(), &mut sink)
            .await
            .unwrap();
        assert_eq!(sink.content_type(), Some(ContentTypes::OCTET_STREAM));
        assert_eq!(sink.body(), b"\x00\x01");
    }

    #[test]
    fn test_default_release_succeeds() {
        assert!(Handler::raw(Download).release().is_ok());
    }
}
