//! Task abstraction

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::captcha::CaptchaSolver;
use crate::session::{BrowserSession, PageSession};
use crate::tasks::action::Action;
use crate::Result;

/// Page readiness and selector wait ceiling
pub const DEFAULT_PAGE_LOAD_TIMEOUT_MS: u64 = 30_000;
/// Post-navigation network settle ceiling
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 60_000;

/// Session resources a task executes against.
///
/// The manager holds non-owning references; the session registry owns
/// the underlying browser.
#[derive(Clone)]
pub struct TaskContext {
    pub session: Arc<dyn BrowserSession>,
    pub page: Arc<dyn PageSession>,
    /// Set when a solving service is configured
    pub captcha: Option<Arc<CaptchaSolver>>,
    /// Ceiling for readiness gates and selector waits
    pub page_load_timeout_ms: u64,
    /// Ceiling for post-navigation network settle waits
    pub navigation_timeout_ms: u64,
}

impl TaskContext {
    pub fn new(session: Arc<dyn BrowserSession>, page: Arc<dyn PageSession>) -> Self {
        Self {
            session,
            page,
            captcha: None,
            page_load_timeout_ms: DEFAULT_PAGE_LOAD_TIMEOUT_MS,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
        }
    }

    pub fn with_captcha(mut self, solver: Arc<CaptchaSolver>) -> Self {
        self.captcha = Some(solver);
        self
    }

    pub fn with_timeouts(mut self, page_load_ms: u64, navigation_ms: u64) -> Self {
        self.page_load_timeout_ms = page_load_ms;
        self.navigation_timeout_ms = navigation_ms;
        self
    }

    /// Solve any challenge currently on the page.
    ///
    /// A no-op without a configured solver or challenge frame.
    pub async fn handle_captcha(&self) -> Result<()> {
        if let Some(solver) = &self.captcha {
            if solver.detect(&self.page).await? {
                solver.solve(&self.page).await?;
            }
        }
        Ok(())
    }
}

/// What to run, before a factory turns it into a concrete task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub kind: String,
    pub parameters: Map<String, Value>,
    pub actions: Vec<Action>,
}

impl TaskSpec {
    pub fn new<S: Into<String>>(kind: S, parameters: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            parameters,
            actions: Vec::new(),
        }
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    /// A required string parameter, as a validation helper
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.parameters
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                crate::Error::invalid_parameters(format!(
                    "{} is required for {} tasks",
                    key, self.kind
                ))
            })
    }
}

/// A runnable unit of browser work
#[async_trait]
pub trait Task: Send + Sync {
    /// The type tag this task was built from
    fn kind(&self) -> &str;

    /// Run against the given session resources
    async fn execute(&self, context: &TaskContext) -> Result<Value>;
}

/// Builds tasks of one type tag from specs
pub trait TaskFactory: Send + Sync {
    fn kind(&self) -> &str;

    /// Reject specs with missing or malformed parameters
    fn validate(&self, spec: &TaskSpec) -> Result<()>;

    fn build(&self, spec: &TaskSpec) -> Result<Arc<dyn Task>>;
}
