//! Main-world executor: the engine half that lives inside the page's own
//! realm, where page globals and credential primitives are reachable.
//!
//! Lifecycle is NotReady → Ready, set exactly once when the realm starts; all
//! later work is stateless side-effecting handling of incoming messages. Every
//! sub-behavior tolerates partial or missing data, and a failure in one
//! automation never aborts the others or the host page.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::channel::RealmChannel;
use crate::config::{Config, Environment};
use crate::notify::NotificationSink;
use crate::page::PageRealm;
use crate::protocol::{RealmMessage, ScriptPayload};
use crate::schedule::Scheduler;
use crate::script::ScriptEngine;
use crate::typing::simulate_typing;

/// Fixed delays and selectors governing page-side automation.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Wait before driving auto-login, letting the page settle.
    pub settle_delay: Duration,
    /// Wait before reloading after a token change takes effect.
    pub reload_delay: Duration,
    /// Inter-character delay for auto-login typing.
    pub typing_delay: Duration,
    /// Selector of the login input the typing simulation targets.
    pub login_selector: String,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
            reload_delay: Duration::from_secs(1),
            typing_delay: Duration::from_millis(100),
            login_selector: ".t-input__inner".to_string(),
        }
    }
}

/// Executor driving automation from inside the page realm.
pub struct MainWorldExecutor {
    page: Arc<dyn PageRealm>,
    engine: Arc<dyn ScriptEngine>,
    notify: Arc<dyn NotificationSink>,
    to_isolated: Arc<RealmChannel<RealmMessage>>,
    scheduler: Scheduler,
    ready: AtomicBool,
    last_snapshot: Mutex<Option<Config>>,
    options: ExecutorOptions,
}

impl MainWorldExecutor {
    pub fn new(
        page: Arc<dyn PageRealm>,
        engine: Arc<dyn ScriptEngine>,
        notify: Arc<dyn NotificationSink>,
        to_isolated: Arc<RealmChannel<RealmMessage>>,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            page,
            engine,
            notify,
            to_isolated,
            scheduler: Scheduler::new(),
            ready: AtomicBool::new(false),
            last_snapshot: Mutex::new(None),
            options,
        }
    }

    /// Transition to Ready (once) and announce it across the boundary.
    pub fn announce_ready(&self) {
        if !self.ready.swap(true, Ordering::SeqCst) {
            self.to_isolated.send(RealmMessage::RealmReady);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Announce readiness, then handle incoming messages until the channel
    /// closes or the realm is torn down.
    pub async fn run(self: Arc<Self>, mut inbox: mpsc::UnboundedReceiver<RealmMessage>) {
        self.announce_ready();
        while let Some(message) = inbox.recv().await {
            self.handle(message);
        }
    }

    /// Spawn [`run`](Self::run) under this executor's own scheduler so
    /// shutting the realm down stops the loop.
    pub fn start(
        self: Arc<Self>,
        inbox: mpsc::UnboundedReceiver<RealmMessage>,
    ) -> tokio::task::JoinHandle<()> {
        let executor = self.clone();
        self.scheduler.spawn(executor.run(inbox))
    }

    /// Tear the realm down, cancelling any pending typing or reload timers.
    pub fn shutdown(&self) {
        self.scheduler.cancel();
    }

    pub fn handle(&self, message: RealmMessage) {
        match message {
            RealmMessage::ConfigSnapshot { data } => self.apply_snapshot(data),
            RealmMessage::SetToken { data } => self.apply_token(data),
            RealmMessage::ClearToken => self.clear_token(),
            RealmMessage::ExecuteScript { data } => self.execute(&data),
            RealmMessage::RealmReady => {
                tracing::debug!("ignoring readiness echo in page realm");
            }
        }
    }

    // ── Config snapshot ─────────────────────────────────────────────────────

    /// Three independent sub-behaviors; each tolerates partial data. The
    /// store notifies on redundant writes too, so a snapshot identical to the
    /// last one applied is a no-op.
    fn apply_snapshot(&self, config: Config) {
        {
            let mut last = self.last_snapshot.lock().unwrap();
            if last.as_ref() == Some(&config) {
                tracing::debug!("identical config snapshot, skipping");
                return;
            }
            *last = Some(config.clone());
        }

        self.patch_environment(&config);

        let url = self.page.url();
        self.schedule_auto_login(&config, &url);
        self.run_auto_scripts(&config, &url);
    }

    fn patch_environment(&self, config: &Config) {
        // Absent namespace: silent no-op.
        let Some(namespace) = self.page.automation_namespace() else {
            return;
        };
        let (is_app, is_wechat) = Environment::predicates(config.environment);
        if let Err(err) = namespace.set_predicates(is_app, is_wechat) {
            tracing::warn!(%err, "environment patch failed");
        }
    }

    fn schedule_auto_login(&self, config: &Config, url: &str) {
        let Some(entry) = config.auto_login_entry_for(url) else {
            return;
        };
        if entry.password.is_empty() {
            self.notify
                .error(&format!("login entry '{}' has no saved password", entry.name));
            return;
        }

        let page = self.page.clone();
        let notify = self.notify.clone();
        let selector = self.options.login_selector.clone();
        let password = entry.password.clone();
        let typing_delay = self.options.typing_delay;
        self.scheduler
            .spawn_after(self.options.settle_delay, async move {
                match page.typing_target(&selector) {
                    Some(target) => simulate_typing(target.as_ref(), &password, typing_delay).await,
                    None => notify.error("login input not found"),
                }
            });
    }

    fn run_auto_scripts(&self, config: &Config, url: &str) {
        for entry in config.auto_run_scripts_for(url) {
            // One failing entry never stops the rest of the pass.
            if let Err(err) = self.engine.eval(&entry.name, &entry.code) {
                self.notify.error(&err.to_string());
            }
        }
    }

    // ── Token effects ───────────────────────────────────────────────────────

    fn apply_token(&self, token: Option<String>) {
        let Some(primitive) = self.page.token_primitive() else {
            self.notify.error("failed to set token: page does not support it");
            return;
        };
        let Some(token) = token else {
            self.notify.error("failed to set token: nothing stored");
            return;
        };
        match primitive.update_token(&token) {
            Ok(()) => {
                self.notify.success("token set");
                self.schedule_reload();
            }
            Err(err) => self.notify.error(&format!("failed to set token: {err}")),
        }
    }

    fn clear_token(&self) {
        let Some(primitive) = self.page.token_primitive() else {
            self.notify.error("failed to remove token: page does not support it");
            return;
        };
        match primitive.clear_token() {
            Ok(()) => {
                self.notify.success("token removed");
                self.schedule_reload();
            }
            Err(err) => self.notify.error(&format!("failed to remove token: {err}")),
        }
    }

    /// Reload after a short delay so the new credential state takes effect.
    fn schedule_reload(&self) {
        let page = self.page.clone();
        self.scheduler
            .spawn_after(self.options.reload_delay, async move {
                page.reload();
            });
    }

    // ── Ad hoc scripts ──────────────────────────────────────────────────────

    fn execute(&self, payload: &ScriptPayload) {
        match self.engine.eval(&payload.name, &payload.code) {
            Ok(()) => tracing::debug!(script = %payload.name, "ad hoc script completed"),
            Err(err) => self.notify.error(&err.to_string()),
        }
    }
}
