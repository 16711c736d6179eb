//! Capabilities a host page may provide.
//!
//! The page realm is the only place certain globals live, and none of them are
//! guaranteed to exist. Each capability is its own trait; lookups return
//! `Option` so "patch if present, no-op otherwise" is the caller's one-line
//! contract instead of a duck-typed mutation.

use std::sync::Arc;

/// An exception surfaced by page-provided code.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct PageApiError(pub String);

impl PageApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Shared-document surface visible to both the isolated and page realms.
pub trait PageDom: Send + Sync {
    /// The page's current URL as the page reports it.
    fn url(&self) -> String;

    /// The raw credential-store string, `name=value` entries joined by `;`.
    fn cookie_string(&self) -> String;

    /// Resolve the element targeted by a typing simulation, if it exists.
    fn typing_target(&self, selector: &str) -> Option<Arc<dyn TypingTarget>>;

    /// Reload the page. Tears down both per-page realms.
    fn reload(&self);
}

/// An input element receiving a synthetic keystroke sequence.
///
/// Per character the simulation dispatches key-down, appends the character to
/// the element's value, dispatches an input event carrying it, then key-up —
/// the order page frameworks expect from native typing.
pub trait TypingTarget: Send + Sync {
    fn key_down(&self, ch: char);
    fn append(&self, ch: char);
    fn input(&self, ch: char);
    fn key_up(&self, ch: char);
}

/// The page's optional automation namespace carrying environment predicates.
pub trait AutomationNamespace: Send + Sync {
    /// Overwrite the `is_app` / `is_wechat` predicates in place.
    fn set_predicates(&self, is_app: bool, is_wechat: bool) -> Result<(), PageApiError>;
}

/// The page's optional credential primitives.
pub trait TokenPrimitive: Send + Sync {
    fn update_token(&self, token: &str) -> Result<(), PageApiError>;
    fn clear_token(&self) -> Result<(), PageApiError>;
}

/// Everything the main-world executor can reach on its page.
pub trait PageRealm: PageDom {
    /// `None` when the page does not expose the namespace; patching is then a
    /// silent no-op.
    fn automation_namespace(&self) -> Option<Arc<dyn AutomationNamespace>>;

    /// `None` when the page has no token primitives.
    fn token_primitive(&self) -> Option<Arc<dyn TokenPrimitive>>;
}
