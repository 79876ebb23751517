//! Boundary to the workflow engine's work-item lifecycle.
//!
//! The engine owns work items; this crate only reads their parameters and
//! reports back through `WorkItemManager`.

use crate::params::InvocationParameters;
use crate::result::ResultBundle;

/// A unit of work dispatched by the workflow engine.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub id: u64,
    pub name: String,
    pub parameters: InvocationParameters,
}

impl WorkItem {
    pub fn new(id: u64, name: impl Into<String>, parameters: InvocationParameters) -> Self {
        Self {
            id,
            name: name.into(),
            parameters,
        }
    }
}

/// Completion side of the work-item protocol, implemented by the engine.
pub trait WorkItemManager {
    fn complete_work_item(&self, id: u64, results: ResultBundle);
    fn abort_work_item(&self, id: u64);
}
