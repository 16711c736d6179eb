//! Per-tab composition root.
//!
//! Wires one page's two realms together: builds the channel pair, registers
//! both listeners before any realm starts producing, bootstraps the bridge,
//! then starts the executor. Registering the bridge's listener before the
//! executor runs means the readiness announcement cannot be lost to the raw
//! channel's drop-if-unregistered behavior.

use std::sync::Arc;

use crate::bridge::{BridgeOptions, IsolatedBridge};
use crate::channel::{RealmChannel, ReplayOutbox};
use crate::error::BridgeResult;
use crate::executor::{ExecutorOptions, MainWorldExecutor};
use crate::notify::NotificationSink;
use crate::page::PageRealm;
use crate::protocol::HostCommand;
use crate::script::ScriptEngine;
use crate::store::ConfigStore;

/// Options for both halves of a tab session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub bridge: BridgeOptions,
    pub executor: ExecutorOptions,
}

/// One tab's bridge/executor pair, running until shut down or dropped.
pub struct TabSession {
    pub bridge: Arc<IsolatedBridge>,
    pub executor: Arc<MainWorldExecutor>,
}

impl TabSession {
    /// Open a session against a page host.
    ///
    /// Both realms report through their own notification sink, mirroring the
    /// rule that failures surface in the realm where they occur.
    pub async fn open<P: PageRealm + 'static>(
        store: Arc<dyn ConfigStore>,
        page: Arc<P>,
        engine: Arc<dyn ScriptEngine>,
        bridge_notify: Arc<dyn NotificationSink>,
        page_notify: Arc<dyn NotificationSink>,
        options: SessionOptions,
    ) -> BridgeResult<TabSession> {
        let outbox = Arc::new(ReplayOutbox::new(RealmChannel::new("isolated->page")));
        let to_isolated = Arc::new(RealmChannel::new("page->isolated"));

        let page_inbox = outbox.register();
        let bridge_inbox = to_isolated.register();

        let bridge = Arc::new(IsolatedBridge::new(
            store,
            page.clone(),
            bridge_notify,
            outbox,
            options.bridge,
        ));
        bridge.clone().bootstrap(bridge_inbox).await?;

        let executor = Arc::new(MainWorldExecutor::new(
            page,
            engine,
            page_notify,
            to_isolated,
            options.executor,
        ));
        executor.clone().start(page_inbox);

        Ok(TabSession { bridge, executor })
    }

    /// Dispatch one host-platform command to this tab's bridge.
    pub async fn command(&self, command: HostCommand) {
        self.bridge.handle_command(command).await;
    }

    /// Tear both realms down, cancelling every pending timer and loop.
    pub fn shutdown(&self) {
        self.executor.shutdown();
        self.bridge.shutdown();
    }
}
