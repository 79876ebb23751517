//! REST work-item handler: one blocking HTTP invocation per work item.
//!
//! # Design
//! The handler holds only immutable configuration (authentication defaults,
//! error policy, result type registry, connector), so a single instance can
//! serve concurrent work items without locking. Everything mutable belongs
//! to one `invoke` call: the request, the resolved credentials and the
//! executor session, which is dropped when `invoke` returns on any path.

use std::sync::Arc;

use tracing::{error, info, info_span};

use crate::auth::{self, AuthConfig};
use crate::config::{ErrorPolicy, HandlerConfig};
use crate::content::ResultTypeRegistry;
use crate::error::RestError;
use crate::executor::{Connector, UreqConnector};
use crate::params::InvocationParameters;
use crate::request;
use crate::result::{self, PackagingContext, ResultBundle};
use crate::workitem::{WorkItem, WorkItemManager};

pub struct RestWorkItemHandler {
    auth: AuthConfig,
    error_policy: ErrorPolicy,
    registry: ResultTypeRegistry,
    connector: Arc<dyn Connector>,
}

impl RestWorkItemHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            auth: config.auth(),
            error_policy: config.error_policy,
            registry: ResultTypeRegistry::new(),
            connector: Arc::new(UreqConnector),
        }
    }

    /// Handler without authentication.
    pub fn anonymous() -> Self {
        Self::new(HandlerConfig::anonymous())
    }

    /// Handler using preemptive Basic authentication by default.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(HandlerConfig::basic(username, password))
    }

    /// Handler using form-based login against `auth_url` by default.
    pub fn form_based(
        username: impl Into<String>,
        password: impl Into<String>,
        auth_url: impl Into<String>,
    ) -> Self {
        Self::new(HandlerConfig::form_based(username, password, auth_url))
    }

    pub fn with_registry(mut self, registry: ResultTypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    pub fn auth_url(&self) -> Option<&str> {
        self.auth.auth_url.as_deref()
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// Run the HTTP invocation described by `params`.
    ///
    /// Returns exactly one of a `ResultBundle` or an error. All parameter,
    /// method and strategy validation happens before the first request.
    pub fn invoke(&self, params: &InvocationParameters) -> Result<ResultBundle, RestError> {
        let url = params.url()?;
        let method = params.method()?;
        let result_class = params.result_class()?;
        let handle_response_errors = params.handle_response_errors();

        let spec = request::build_request(method, url, params)?;
        let auth = self.auth.resolve(params)?;
        let span = info_span!("rest_invocation", method = %spec.method, url, auth = %auth.auth_type());
        let _guard = span.enter();

        let session = self.connector.connect(params.timeouts());
        let outcome = auth::execute_with_auth(session.as_ref(), &spec, &auth)?;
        drop(session);

        let bundle = result::package(
            outcome,
            PackagingContext {
                url,
                result_class,
                handle_response_errors,
            },
            &self.registry,
        )?;
        info!(status = bundle.status, "invocation finished");
        Ok(bundle)
    }

    /// Invoke for `item` and report the outcome to `manager`.
    ///
    /// On success the item is completed with the result bundle. On failure
    /// the error policy applies: `Throw` hands the error back, `Log` records
    /// it. Under `Log` a rejected response still completes the item with its
    /// status; other failures leave the item to the engine.
    pub fn execute_work_item(&self, item: &WorkItem, manager: &dyn WorkItemManager) -> Result<(), RestError> {
        let err = match self.invoke(&item.parameters) {
            Ok(bundle) => {
                manager.complete_work_item(item.id, bundle);
                return Ok(());
            }
            Err(err) => err,
        };
        if self.error_policy == ErrorPolicy::Throw {
            return Err(err);
        }
        error!(work_item = item.id, name = %item.name, error = %err, "REST work item failed");
        if let Some(status) = err.status() {
            let bundle = ResultBundle {
                status,
                status_msg: err.to_string(),
                result: None,
            };
            manager.complete_work_item(item.id, bundle);
        }
        Ok(())
    }

    /// A REST call in flight cannot be aborted; nothing to do.
    pub fn abort_work_item(&self, item: &WorkItem, _manager: &dyn WorkItemManager) {
        info!(work_item = item.id, "abort requested for REST work item, ignoring");
    }
}

impl Default for RestWorkItemHandler {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl std::fmt::Debug for RestWorkItemHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestWorkItemHandler")
            .field("auth_type", &self.auth.strategy)
            .field("auth_url", &self.auth.auth_url)
            .field("error_policy", &self.error_policy)
            .field("registry", &self.registry)
            .finish()
    }
}
