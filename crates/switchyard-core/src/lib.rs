//! Switchyard - a pluggable action dispatcher.
//!
//! Many independently written handlers share one entry point. A request
//! names a `(module, action)` pair and optionally carries a JSON params
//! object; the dispatcher resolves the handler, calls it through the one
//! calling convention (modality) it was written for, and turns the result or
//! the failure into a response.
//!
//! This crate knows nothing about HTTP. Hosts translate their transport into
//! an [`ActionRequest`] and write the filled [`ResponseSink`] back out.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use switchyard::{Dispatcher, Handler, HandlerRegistry, ActionRequest, ResponseSink};
//!
//! let registry = Arc::new(HandlerRegistry::new());
//! registry.register_all(vec![Handler::json_in_out(Echo)]);
//!
//! let dispatcher = Dispatcher::new(Arc::clone(&registry)).with_site_root("/srv/www");
//! let request = ActionRequest::new()
//!     .with_parameter("action", "Echo")
//!     .with_parameter("params", r#"{"a":1}"#);
//! let mut response = ResponseSink::new();
//! dispatcher.dispatch(&request, &mut response).await?;
//!
//! registry.shutdown();
//! ```

pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod identity;
pub mod modality;
pub mod params;
pub mod registry;
pub mod transport;

// Re-export commonly used types
pub use config::{ContentTypes, DispatchConfig, HeaderNames};
pub use dispatch::{request_diagnostics, DispatchOutcome, Dispatcher};
pub use envelope::ErrorEnvelope;
pub use error::{DispatchError, ExecuteError, Result};
pub use handler::{
    Handler, HandlerKind, HandlerParams, JsonInOutHandler, JsonInputHandler,
    JsonInputRawHandler, JsonOutputHandler, RawHandler, TextHandler,
};
pub use identity::{HandlerIdentity, ModuleManifest};
pub use modality::Modality;
pub use params::Params;
pub use registry::{HandlerRegistry, HandlerSource, ShutdownReport};
pub use transport::{ActionRequest, ResponseSink, TextWriter};

// Handler implementations name these in their trait impls.
pub use async_trait::async_trait;
pub use serde_json::Value;
