//! Capability interface for driving a stateful remote UI session.
//!
//! The estimate workflow only ever talks to the listing service through
//! [`SessionDriver`]; [`chrome`] provides the live browser implementation and
//! [`fake`] a deterministic scripted one for tests.

pub mod chrome;
pub mod fake;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Element lookup strategy. Mirrors the strategies the listing UI requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
    Id(String),
    Name(String),
    ClassName(String),
    LinkText(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn class_name(name: impl Into<String>) -> Self {
        Self::ClassName(name.into())
    }

    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css {s}"),
            Self::XPath(s) => write!(f, "xpath {s}"),
            Self::Id(s) => write!(f, "id {s}"),
            Self::Name(s) => write!(f, "name {s}"),
            Self::ClassName(s) => write!(f, "class {s}"),
            Self::LinkText(s) => write!(f, "link text {s}"),
        }
    }
}

/// Condition a bounded wait resolves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Present,
    Visible,
    Clickable,
}

/// Opaque reference to an element located in the session. Handles are only
/// valid until the next navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub(crate) id: u64,
}

impl ElementHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self { id }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    #[error("no element matching {0}")]
    NotFound(String),

    #[error("stale element handle {0}")]
    Stale(u64),

    #[error("driver error: {0}")]
    Driver(String),

    #[error("script error: {0}")]
    Script(String),
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// One remote UI session. Calls are strictly sequential; implementations are
/// not required to support concurrent use.
#[async_trait]
pub trait SessionDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> SessionResult<()>;

    async fn current_url(&self) -> SessionResult<String>;

    async fn find(&self, locator: &Locator) -> SessionResult<ElementHandle>;

    async fn find_all(&self, locator: &Locator) -> SessionResult<Vec<ElementHandle>>;

    /// Polls until an element matching `locator` reaches `state`, or fails
    /// with [`SessionError::Timeout`] once `timeout` elapses.
    async fn wait_for(
        &self,
        locator: &Locator,
        state: ElementState,
        timeout: Duration,
    ) -> SessionResult<ElementHandle>;

    async fn wait_for_url_change(&self, from: &str, timeout: Duration) -> SessionResult<()>;

    async fn click(&self, element: &ElementHandle) -> SessionResult<()>;

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> SessionResult<()>;

    async fn clear(&self, element: &ElementHandle) -> SessionResult<()>;

    async fn text(&self, element: &ElementHandle) -> SessionResult<String>;

    async fn attr(&self, element: &ElementHandle, name: &str) -> SessionResult<Option<String>>;

    async fn is_selected(&self, element: &ElementHandle) -> SessionResult<bool>;

    /// Runs `body` as a script, with `element` (when given) bound as `this`.
    /// Escape hatch for controls whose direct clicks the page intercepts.
    async fn run_script(&self, body: &str, element: Option<&ElementHandle>)
        -> SessionResult<Value>;

    /// Releases the session. Called exactly once per run.
    async fn close(&self) -> SessionResult<()>;
}
