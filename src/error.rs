//! Unified error types for Botweaver

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Botweaver
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Outbound HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Session not found in the registry
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Browser is no longer connected
    #[error("Browser disconnected: {0}")]
    BrowserDisconnected(String),

    /// Page has been closed
    #[error("Page closed: {0}")]
    PageClosed(String),

    /// Element not found
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Timeout
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Navigation failed
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Script execution failed
    #[error("Script execution failed: {0}")]
    ScriptExecutionFailed(String),

    /// Missing or invalid task parameters
    #[error("Invalid task parameters: {0}")]
    InvalidParameters(String),

    /// Unknown task type tag
    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),

    /// Task not found in the queue
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Captcha detection/solving failures
    #[error("Captcha solving failed: {0}")]
    Captcha(String),

    /// All proxy retry attempts failed
    #[error("All {attempts} proxy attempts failed. Last error: {last}")]
    ProxyExhausted { attempts: u32, last: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new WebSocket error
    pub fn websocket<S: Into<String>>(msg: S) -> Self {
        Error::WebSocket(msg.into())
    }

    /// Create a new CDP error
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Create a new session not found error
    pub fn session_not_found<S: Into<String>>(id: S) -> Self {
        Error::SessionNotFound(id.into())
    }

    /// Create a new browser disconnected error
    pub fn browser_disconnected<S: Into<String>>(msg: S) -> Self {
        Error::BrowserDisconnected(msg.into())
    }

    /// Create a new page closed error
    pub fn page_closed<S: Into<String>>(id: S) -> Self {
        Error::PageClosed(id.into())
    }

    /// Create a new element not found error
    pub fn element_not_found<S: Into<String>>(selector: S) -> Self {
        Error::ElementNotFound(selector.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new navigation failed error
    pub fn navigation_failed<S: Into<String>>(msg: S) -> Self {
        Error::NavigationFailed(msg.into())
    }

    /// Create a new script execution failed error
    pub fn script_execution_failed<S: Into<String>>(msg: S) -> Self {
        Error::ScriptExecutionFailed(msg.into())
    }

    /// Create a new invalid parameters error
    pub fn invalid_parameters<S: Into<String>>(msg: S) -> Self {
        Error::InvalidParameters(msg.into())
    }

    /// Create a new unknown task type error
    pub fn unknown_task_type<S: Into<String>>(kind: S) -> Self {
        Error::UnknownTaskType(kind.into())
    }

    /// Create a new task not found error
    pub fn task_not_found<S: Into<String>>(id: S) -> Self {
        Error::TaskNotFound(id.into())
    }

    /// Create a new captcha error
    pub fn captcha<S: Into<String>>(msg: S) -> Self {
        Error::Captcha(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether a task execution error is worth another attempt.
    ///
    /// Validation failures never succeed on retry; everything that can
    /// come back after a transient network or resource hiccup does.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::InvalidParameters(_)
                | Error::UnknownTaskType(_)
                | Error::TaskNotFound(_)
                | Error::Configuration(_)
        )
    }
}
