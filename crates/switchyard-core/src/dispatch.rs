//! The dispatch entry point and invocation adapter.
//!
//! One call to [`Dispatcher::dispatch`] walks a single request through
//! resolve, execute and respond:
//!
//! 1. Resolve `(action, module)` in the registry. Unknown handlers get a
//!    501 status and no body.
//! 2. Decode `params`, leniently, and inject the caller address.
//! 3. Push the site root into the handler and apply its cross-origin policy.
//! 4. Call the one entry point matching the handler's modality. Writer
//!    modalities get their content type set before the writer is acquired.
//! 5. Recover handler failures and panics: log them with the request dump,
//!    and for JSON_OUTPUT / JSON_IN_OUT write an error envelope to the same
//!    writer. The status stays 200.
//!
//! A modality mismatch is the only error returned to the caller.

use crate::config::{DispatchConfig, HeaderNames};
use crate::envelope::ErrorEnvelope;
use crate::error::{DispatchError, Result};
use crate::handler::Handler;
use crate::modality::Modality;
use crate::params::{decode_params, enrich_remote_addr, require_params, Params};
use crate::registry::HandlerRegistry;
use crate::transport::{ActionRequest, ResponseSink};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// What happened to one dispatched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No handler was resolved; the response carries a 501 status.
    NotImplemented { reason: String },
    /// The handler ran to completion.
    Succeeded { key: String, modality: Modality },
    /// The handler failed or panicked and the failure was recovered.
    Failed {
        key: String,
        modality: Modality,
        message: String,
    },
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Succeeded { .. })
    }

    pub fn modality(&self) -> Option<Modality> {
        match self {
            DispatchOutcome::NotImplemented { .. } => None,
            DispatchOutcome::Succeeded { modality, .. }
            | DispatchOutcome::Failed { modality, .. } => Some(*modality),
        }
    }
}

/// Ties the registry to the transport boundary.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    site_root: Option<String>,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            site_root: None,
        }
    }

    /// Site root pushed into every handler before it runs.
    pub fn with_site_root(mut self, site_root: impl Into<String>) -> Self {
        self.site_root = Some(site_root.into());
        self
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn site_root(&self) -> Option<&str> {
        self.site_root.as_deref()
    }

    /// Dispatch one request, writing the outcome into `response`.
    pub async fn dispatch(
        &self,
        request: &ActionRequest,
        response: &mut ResponseSink,
    ) -> Result<DispatchOutcome> {
        let handler = match self.registry.resolve(request.action(), request.module()) {
            Ok(handler) => handler,
            Err(e) => {
                warn!("Request for an unavailable handler: {}", e);
                response.set_status(DispatchConfig::NOT_IMPLEMENTED_STATUS);
                return Ok(DispatchOutcome::NotImplemented {
                    reason: e.to_string(),
                });
            }
        };

        let key = handler.key();
        let modality = handler.modality();
        let params = prepare_params(request);

        if let Some(site_root) = &self.site_root {
            handler.configure(DispatchConfig::SITE_ROOT_PARAM, site_root.as_str());
        }
        if let Some(domains) = handler.cross_origin_domains() {
            response.set_header(HeaderNames::ALLOW_ORIGIN, domains);
        }

        debug!("Dispatching {} to {} handler", key, modality);

        let executed = AssertUnwindSafe(execute(&handler, request, params, &mut *response))
            .catch_unwind()
            .await;

        let message = match executed {
            Ok(Ok(())) => {
                return Ok(DispatchOutcome::Succeeded { key, modality });
            }
            Ok(Err(DispatchError::Execute(e))) => {
                error!("Action {} failed: {}", key, e);
                e.message().to_string()
            }
            Ok(Err(e)) if e.is_unsupported() => {
                error!("Dispatch table mismatch for {}: {}", key, e);
                return Err(e);
            }
            Ok(Err(e)) => {
                error!("Unexpected error in {}: {}", key, e);
                e.to_string()
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Unhandled panic in {}: {}", key, message);
                message
            }
        };

        for line in request_diagnostics(request) {
            debug!("{}", line);
        }

        if modality.returns_json() {
            write_envelope(&handler, response, &message);
        }

        Ok(DispatchOutcome::Failed {
            key,
            modality,
            message,
        })
    }
}

/// Decode the request params and add the caller address when possible.
pub(crate) fn prepare_params(request: &ActionRequest) -> Option<Params> {
    let mut params = decode_params(request.params_text())?;
    if let Some(remote_addr) = request.remote_addr() {
        enrich_remote_addr(&mut params, remote_addr);
    }
    Some(params)
}

async fn execute(
    handler: &Handler,
    request: &ActionRequest,
    params: Option<Params>,
    response: &mut ResponseSink,
) -> Result<()> {
    match handler.modality() {
        Modality::Raw => handler.process_raw(request, response).await,
        Modality::Text => {
            response.set_content_type(handler.content_type()?);
            let mut out = response.writer();
            handler.process_text(request, &mut out).await?;
            out.close();
            Ok(())
        }
        Modality::JsonInputRaw => {
            let params = require_params(params)?;
            handler.process_params_raw(params, response).await
        }
        Modality::JsonInput => {
            let params = require_params(params)?;
            response.set_content_type(handler.content_type()?);
            let mut out = response.writer();
            handler.process_params_text(params, &mut out).await?;
            out.close();
            Ok(())
        }
        Modality::JsonOutput => {
            response.set_content_type(handler.content_type()?);
            let mut out = response.writer();
            let value = handler.process_request_json(request).await?;
            out.print(&serde_json::to_string(&value)?);
            out.close();
            Ok(())
        }
        Modality::JsonInOut => {
            let params = require_params(params)?;
            response.set_content_type(handler.content_type()?);
            let mut out = response.writer();
            let value = handler.process_json(params).await?;
            out.print(&serde_json::to_string(&value)?);
            out.close();
            Ok(())
        }
    }
}

fn write_envelope(handler: &Handler, response: &mut ResponseSink, message: &str) {
    if response.content_type().is_none() {
        if let Ok(content_type) = handler.content_type() {
            response.set_content_type(content_type);
        }
    }
    let mut out = response.writer();
    out.print(&ErrorEnvelope::new(message).to_json_string());
    out.close();
}

/// Lines describing every request parameter and header, for failure logs.
///
/// Repeated header values are joined with a newline and a tab.
pub fn request_diagnostics(request: &ActionRequest) -> Vec<String> {
    let mut lines = vec!["Request params:".to_string()];
    for name in request.parameter_names() {
        let values: Vec<&str> = request.parameter_values(name).collect();
        lines.push(format!("{} = {:?}", name, values));
    }

    lines.push("Request headers:".to_string());
    for name in request.header_names() {
        let values: String = request
            .header_values(name)
            .map(|v| format!("\n\t{}", v))
            .collect();
        lines.push(format!("{} ={}", name, values));
    }
    lines
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Handler panicked".to_string()
    }
}
