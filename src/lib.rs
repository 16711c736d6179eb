//! Cross-realm message bridge and conditional automation engine.
//!
//! Three mutually isolated execution contexts cooperate over lossy message
//! channels: a privileged background relay, a per-tab isolated bridge, and an
//! executor inside the page's own realm. The bridge synchronizes a shared
//! configuration, moves a credential between realms, and the executor applies
//! environment patches, auto-login typing, and user-authored scripts against
//! the live page — with the contract that one automation's failure never
//! aborts the others or the host page.

pub mod bridge;
pub mod channel;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod notify;
pub mod page;
pub mod protocol;
pub mod relay;
pub mod schedule;
pub mod script;
pub mod session;
pub mod store;
pub mod transfer;
pub mod typing;

// Re-export the session surface at the crate root for convenience
pub use error::{BridgeError, BridgeResult};
pub use protocol::{HostCommand, RealmMessage, ScriptPayload};
pub use session::{SessionOptions, TabSession};
