//! Error taxonomy for the bridge core.
//!
//! Every failure is caught at the boundary nearest its origin. No realm channel
//! carries an error-return path, so a failure on the far side of a realm hop is
//! reported locally through a [`NotificationSink`](crate::notify::NotificationSink)
//! and never propagated back to the sender.

use thiserror::Error;

use crate::relay::TabId;

/// Result alias used throughout the crate.
pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The addressed tab is not registered with the relay.
    #[error("tab {0} is not registered")]
    TabNotFound(TabId),

    /// A privileged injection into a tab's page realm failed.
    #[error("injection into tab {tab} failed: {reason}")]
    InjectionFailed { tab: TabId, reason: String },

    /// The target realm has no listener registered for this channel.
    #[error("no listener registered on the {0} channel")]
    ListenerMissing(&'static str),

    /// The page does not expose an expected global capability.
    #[error("page does not expose {0}")]
    CapabilityMissing(&'static str),

    /// No credential entry carrying the expected marker was found.
    #[error("credential entry not found")]
    CredentialMissing,

    /// A credential entry was found but could not be parsed.
    #[error("credential entry is malformed")]
    CredentialUnparsable,

    /// A user-authored script threw during evaluation.
    #[error("script '{name}' failed: {message}")]
    ScriptFailed { name: String, message: String },

    /// An import payload did not match the expected bundle shape.
    #[error("invalid import payload: {0}")]
    InvalidImport(String),

    /// A required configuration field is missing.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("storage i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Whether this error came from evaluating user-authored code.
    pub fn is_script_failure(&self) -> bool {
        matches!(self, Self::ScriptFailed { .. })
    }
}
