//! Per-tab isolated-realm bridge.
//!
//! The bridge owns the store subscription for its tab, translates host
//! commands and storage changes into cross-realm messages, and performs the
//! privileged reads the page realm cannot (credential extraction from the
//! shared document). Page-bound traffic goes through the replay outbox, so a
//! page realm that becomes ready after a message was produced still receives
//! the latest snapshot and any pending commands exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use crate::channel::ReplayOutbox;
use crate::config::Config;
use crate::error::{BridgeError, BridgeResult};
use crate::notify::NotificationSink;
use crate::page::PageDom;
use crate::protocol::{HostCommand, RealmMessage};
use crate::schedule::Scheduler;
use crate::store::{CONFIG_KEY, ConfigStore};
use crate::typing::simulate_typing;

/// Bridge lifecycle. Transitions are monotonic; a bridge never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum BridgeState {
    Uninitialized = 0,
    Bootstrapping = 1,
    Active = 2,
}

/// Fixed markers and delays governing bridge-side behavior.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Substring identifying the credential entry in the page's cookie string.
    pub token_marker: String,
    /// Selector of the login input the typing simulation targets.
    pub login_selector: String,
    /// Inter-character delay for operator-triggered login typing.
    pub typing_delay: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            token_marker: "DATA_PRODUCT_CMS_TOKEN".to_string(),
            login_selector: ".t-input__inner".to_string(),
            typing_delay: Duration::from_millis(200),
        }
    }
}

/// Per-tab mediator between the host platform, the store, and the page realm.
pub struct IsolatedBridge {
    store: Arc<dyn ConfigStore>,
    dom: Arc<dyn PageDom>,
    notify: Arc<dyn NotificationSink>,
    outbox: Arc<ReplayOutbox>,
    scheduler: Scheduler,
    state: AtomicU8,
    page_ready: AtomicBool,
    options: BridgeOptions,
}

impl IsolatedBridge {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        dom: Arc<dyn PageDom>,
        notify: Arc<dyn NotificationSink>,
        outbox: Arc<ReplayOutbox>,
        options: BridgeOptions,
    ) -> Self {
        Self {
            store,
            dom,
            notify,
            outbox,
            scheduler: Scheduler::new(),
            state: AtomicU8::new(BridgeState::Uninitialized as u8),
            page_ready: AtomicBool::new(false),
            options,
        }
    }

    pub fn state(&self) -> BridgeState {
        match self.state.load(Ordering::SeqCst) {
            0 => BridgeState::Uninitialized,
            1 => BridgeState::Bootstrapping,
            _ => BridgeState::Active,
        }
    }

    /// Whether the page realm has announced readiness.
    pub fn page_ready(&self) -> bool {
        self.page_ready.load(Ordering::SeqCst)
    }

    fn advance(&self, to: BridgeState) {
        self.state.fetch_max(to as u8, Ordering::SeqCst);
    }

    /// Bring the bridge up: emit the initial snapshot, subscribe to store
    /// changes, and start listening for the page realm's messages.
    pub async fn bootstrap(
        self: Arc<Self>,
        from_page: mpsc::UnboundedReceiver<RealmMessage>,
    ) -> BridgeResult<()> {
        self.advance(BridgeState::Bootstrapping);

        let initial = self.store.load_config().await?;
        self.outbox.send(RealmMessage::ConfigSnapshot { data: initial });

        let changes = self.store.subscribe();
        let bridge = self.clone();
        self.scheduler
            .spawn(async move { bridge.watch_store(changes).await });

        let bridge = self.clone();
        self.scheduler
            .spawn(async move { bridge.listen_page(from_page).await });

        self.advance(BridgeState::Active);
        Ok(())
    }

    /// Tear the bridge down, cancelling its loops and pending typing tasks.
    pub fn shutdown(&self) {
        self.scheduler.cancel();
    }

    /// Forward every config write as a fresh full snapshot. Redundant writes
    /// re-emit; downstream treats identical snapshots as no-ops.
    async fn watch_store(&self, mut changes: broadcast::Receiver<crate::store::StoreChange>) {
        loop {
            match changes.recv().await {
                Ok(change) if change.key == CONFIG_KEY => {
                    let config = match change.new_value {
                        Some(value) => serde_json::from_value(value).unwrap_or_default(),
                        None => Config::default(),
                    };
                    self.outbox.send(RealmMessage::ConfigSnapshot { data: config });
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Missed notifications collapse into one re-read.
                    tracing::debug!(skipped, "store watch lagged, re-reading config");
                    if let Ok(config) = self.store.load_config().await {
                        self.outbox.send(RealmMessage::ConfigSnapshot { data: config });
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    async fn listen_page(&self, mut from_page: mpsc::UnboundedReceiver<RealmMessage>) {
        while let Some(message) = from_page.recv().await {
            match message {
                RealmMessage::RealmReady => {
                    self.page_ready.store(true, Ordering::SeqCst);
                    self.outbox.mark_ready();
                }
                other => {
                    tracing::debug!(?other, "unexpected message from page realm");
                }
            }
        }
    }

    // ── Host command dispatch ───────────────────────────────────────────────

    /// Handle one host-platform command. Failures are reported through the
    /// notification sink in this realm; nothing propagates back to the caller
    /// and nothing is retried.
    pub async fn handle_command(&self, command: HostCommand) {
        match command {
            HostCommand::GetToken => self.capture_token().await,
            HostCommand::SetToken => self.push_token().await,
            HostCommand::ClearToken => self.outbox.send(RealmMessage::ClearToken),
            HostCommand::CodeDesignLogin => self.code_design_login().await,
            HostCommand::ExecuteScript { message } => {
                if !self.page_ready() {
                    self.notify
                        .error("current environment does not support loading scripts");
                    return;
                }
                self.outbox.send(RealmMessage::ExecuteScript { data: message });
            }
        }
    }

    /// Scan the shared credential store for the marker entry and cache it.
    async fn capture_token(&self) {
        match extract_token(&self.dom.cookie_string(), &self.options.token_marker) {
            Ok(token) => match self.store.save_token(&token).await {
                Ok(()) => self.notify.success("token captured"),
                Err(err) => {
                    tracing::warn!(%err, "token capture could not be persisted");
                    self.notify.error("failed to capture token");
                }
            },
            Err(err) => {
                tracing::debug!(%err, "token capture failed");
                self.notify.error("failed to capture token");
            }
        }
    }

    /// Relay the cached token toward the page realm. No local validation; the
    /// page realm reports application failures where they occur.
    async fn push_token(&self) {
        let token = match self.store.load_token().await {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(%err, "stored token unreadable");
                None
            }
        };
        self.outbox.send(RealmMessage::SetToken { data: token });
    }

    async fn code_design_login(&self) {
        let config = match self.store.load_config().await {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(%err, "config unreadable");
                self.notify.error("saved logins are unavailable");
                return;
            }
        };

        let url = self.dom.url();
        let password = match config.login_entry_for(&url) {
            Some(entry) if !entry.password.is_empty() => entry.password.clone(),
            _ => {
                self.notify.error("saved password is empty");
                return;
            }
        };

        match self.dom.typing_target(&self.options.login_selector) {
            Some(target) => {
                let delay = self.options.typing_delay;
                self.scheduler.spawn(async move {
                    simulate_typing(target.as_ref(), &password, delay).await;
                });
            }
            None => self.notify.error("login input not found"),
        }
    }
}

/// Pull the credential value out of a `name=value;...` cookie string.
///
/// The entry is identified by a marker substring; the value is everything
/// after the first `=`.
pub fn extract_token(cookies: &str, marker: &str) -> BridgeResult<String> {
    let entry = cookies
        .split(';')
        .find(|part| part.contains(marker))
        .ok_or(BridgeError::CredentialMissing)?;
    let (_, value) = entry
        .split_once('=')
        .ok_or(BridgeError::CredentialUnparsable)?;
    let value = value.trim();
    if value.is_empty() {
        return Err(BridgeError::CredentialUnparsable);
    }
    Ok(value.to_string())
}
