//! Task type registry
//!
//! Maps type tags to factories. Registration replaces the runtime
//! constructor lookup a dynamic dispatcher would do: every tag is
//! declared up front, and specs are validated before they enter the
//! queue.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::tasks::google_search::GoogleSearchFactory;
use crate::tasks::traits::{Task, TaskFactory, TaskSpec};
use crate::tasks::web_scraping::WebScrapingFactory;
use crate::{Error, Result};

#[derive(Default)]
pub struct TaskRegistry {
    factories: HashMap<String, Arc<dyn TaskFactory>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in task types
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GoogleSearchFactory));
        registry.register(Arc::new(WebScrapingFactory));
        registry
    }

    pub fn register(&mut self, factory: Arc<dyn TaskFactory>) {
        debug!("Registering task type {}", factory.kind());
        self.factories.insert(factory.kind().to_string(), factory);
    }

    pub fn known_kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    fn factory(&self, kind: &str) -> Result<&Arc<dyn TaskFactory>> {
        self.factories
            .get(kind)
            .ok_or_else(|| Error::unknown_task_type(kind))
    }

    /// Check a spec without building the task
    pub fn validate(&self, spec: &TaskSpec) -> Result<()> {
        self.factory(&spec.kind)?.validate(spec)
    }

    /// Validate and build a task from the spec
    pub fn create(&self, spec: &TaskSpec) -> Result<Arc<dyn Task>> {
        let factory = self.factory(&spec.kind)?;
        factory.validate(spec)?;
        factory.build(spec)
    }
}
