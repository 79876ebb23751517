//! Outbound REST invocation engine for workflow work items.
//!
//! # Overview
//! Given a work item's parameters (`Url`, `Method`, `Content`, credentials,
//! timeouts, ...) the engine builds one HTTP request, runs it under the
//! selected authentication strategy, and packages the response as the
//! `Status` / `StatusMsg` / `Result` completion entries.
//!
//! # Design
//! - `request` builds an immutable `RequestSpec`; `content` (de)serializes
//!   bodies by content type.
//! - `auth` dispatches over the closed set None / Basic / FormBased and
//!   drives the `executor` one exchange at a time.
//! - `result` applies the success/failure policy.
//! - `handler::RestWorkItemHandler` ties these together and is the only type
//!   a workflow engine needs; `workitem` describes the engine-side boundary.
//! - Every invocation is blocking and owns its own executor session.

pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod executor;
pub mod handler;
pub mod http;
pub mod params;
pub mod request;
pub mod result;
pub mod workitem;

pub use auth::{AuthConfig, AuthType, Credentials, ResolvedAuth};
pub use config::{ErrorPolicy, HandlerConfig};
pub use content::{ResultTypeRegistry, ResultValue};
pub use error::{FormStep, RestError};
pub use executor::{Connector, HttpExecutor, UreqConnector, UreqExecutor};
pub use handler::RestWorkItemHandler;
pub use http::{HttpMethod, RequestSpec, ResponseOutcome};
pub use params::{InvocationParameters, ParamValue, Timeouts};
pub use result::ResultBundle;
pub use workitem::{WorkItem, WorkItemManager};
