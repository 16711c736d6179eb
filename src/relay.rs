//! Background relay for actions that need host-level privilege.
//!
//! The operator surface has no direct channel into a specific page realm; the
//! relay holds that capability per tab. Probing is an explicit asynchronous
//! operation with a success/failure-with-reason result, so callers can know a
//! remote realm is reachable before depending on it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{BridgeError, BridgeResult};
use crate::page::PageApiError;

/// Host-assigned tab identifier.
pub type TabId = u32;

/// Privileged injection capability for one tab's page realm. The current
/// payload is a no-op marker execution; an extension point for future
/// payloads.
#[async_trait]
pub trait RealmInjector: Send + Sync {
    async fn inject_marker(&self) -> Result<(), PageApiError>;
}

/// Relay tracking which tabs are live and injectable.
pub struct BackgroundRelay {
    tabs: RwLock<HashMap<TabId, Arc<dyn RealmInjector>>>,
}

impl BackgroundRelay {
    pub fn new() -> Self {
        Self {
            tabs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a live tab. Replaces any previous injector for the id.
    pub fn register_tab(&self, tab: TabId, injector: Arc<dyn RealmInjector>) {
        self.tabs.write().unwrap().insert(tab, injector);
    }

    /// Drop a tab on navigation away or close.
    pub fn unregister_tab(&self, tab: TabId) {
        self.tabs.write().unwrap().remove(&tab);
    }

    pub fn is_registered(&self, tab: TabId) -> bool {
        self.tabs.read().unwrap().contains_key(&tab)
    }

    /// Inject a no-op marker execution into the tab's page realm, verifying
    /// injectability and priming the realm before a subsequent token push.
    pub async fn probe_realm(&self, tab: TabId) -> BridgeResult<()> {
        let injector = self
            .tabs
            .read()
            .unwrap()
            .get(&tab)
            .cloned()
            .ok_or(BridgeError::TabNotFound(tab))?;

        injector
            .inject_marker()
            .await
            .map_err(|err| BridgeError::InjectionFailed {
                tab,
                reason: err.to_string(),
            })?;

        tracing::debug!(tab, "probe injection succeeded");
        Ok(())
    }
}

impl Default for BackgroundRelay {
    fn default() -> Self {
        Self::new()
    }
}
