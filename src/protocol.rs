//! Message envelopes crossing context boundaries.
//!
//! Two directional contracts, both JSON-tagged on `type` with no version and
//! no correlation id. Additional message types are forward-compatible
//! extensions; receivers ignore tags they do not know.

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// A named unit of user-authored code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPayload {
    pub name: String,
    pub code: String,
}

/// Envelope on the isolated realm ↔ page realm channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RealmMessage {
    /// One-time readiness announcement from the page realm.
    RealmReady,
    /// Full configuration snapshot. Repeated identical snapshots are no-ops
    /// downstream.
    ConfigSnapshot { data: Config },
    /// Apply the stored token to the page. `None` means no token is cached.
    SetToken { data: Option<String> },
    /// Remove the page's credential.
    ClearToken,
    /// Evaluate one ad hoc script in the page realm.
    ExecuteScript { data: ScriptPayload },
}

impl RealmMessage {
    /// Whether this message is the retained-latest kind: only the most recent
    /// snapshot is worth replaying to a consumer that registers late.
    pub fn is_snapshot(&self) -> bool {
        matches!(self, RealmMessage::ConfigSnapshot { .. })
    }
}

/// Envelope on the host-platform channel (UI/background → isolated realm).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostCommand {
    /// Extract the credential from the page and cache it.
    GetToken,
    /// Push the cached credential into the page realm.
    SetToken,
    /// Clear the page realm's credential.
    ClearToken,
    /// Type the saved password for the current page into the login input.
    CodeDesignLogin,
    /// Forward one ad hoc script to the page realm.
    ExecuteScript { message: ScriptPayload },
}
