//! End-to-end tests over a full tab session: bridge, executor, replay
//! delivery, and the conditional automation behaviors.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pagebridge::bridge::{BridgeOptions, IsolatedBridge};
use pagebridge::channel::{RealmChannel, ReplayOutbox};
use pagebridge::config::{CodeEntry, Config, Environment, ScriptEntry};
use pagebridge::executor::{ExecutorOptions, MainWorldExecutor};
use pagebridge::notify::{BufferSink, Severity};
use pagebridge::protocol::{HostCommand, ScriptPayload};
use pagebridge::session::{SessionOptions, TabSession};
use pagebridge::store::{ConfigStore, MemoryStore};

use common::{FakePage, RecordingEngine};

fn fast_options() -> SessionOptions {
    SessionOptions {
        bridge: BridgeOptions {
            typing_delay: Duration::from_millis(1),
            ..Default::default()
        },
        executor: ExecutorOptions {
            settle_delay: Duration::from_millis(10),
            reload_delay: Duration::from_millis(50),
            typing_delay: Duration::from_millis(1),
            ..Default::default()
        },
    }
}

struct Harness {
    session: TabSession,
    store: Arc<MemoryStore>,
    page: Arc<FakePage>,
    engine: Arc<RecordingEngine>,
    bridge_sink: Arc<BufferSink>,
    page_sink: Arc<BufferSink>,
}

async fn open(config: Config, page: FakePage) -> Harness {
    open_with(config, page, fast_options()).await
}

async fn open_with(config: Config, page: FakePage, options: SessionOptions) -> Harness {
    let store = Arc::new(MemoryStore::new());
    store.save_config(&config).await.unwrap();

    let page = Arc::new(page);
    let engine = Arc::new(RecordingEngine::default());
    let bridge_sink = Arc::new(BufferSink::new());
    let page_sink = Arc::new(BufferSink::new());

    let session = TabSession::open(
        store.clone(),
        page.clone(),
        engine.clone(),
        bridge_sink.clone(),
        page_sink.clone(),
        options,
    )
    .await
    .unwrap();

    Harness {
        session,
        store,
        page,
        engine,
        bridge_sink,
        page_sink,
    }
}

/// Poll until `cond` holds; paused-clock sleeps make this cheap.
async fn eventually(cond: impl Fn() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not met in time");
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

fn auto_script(name: &str, code: &str, condition: &str) -> ScriptEntry {
    ScriptEntry {
        key: format!("script-{name}"),
        name: name.to_string(),
        code: code.to_string(),
        auto_run: true,
        auto_run_condition: condition.to_string(),
    }
}

fn login_entry(name: &str, link: &str, password: &str, auto_run: bool) -> CodeEntry {
    CodeEntry {
        key: format!("code-{name}"),
        name: name.to_string(),
        link: link.to_string(),
        password: password.to_string(),
        auto_run,
    }
}

// ── Auto-run scripts ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn unconditional_script_runs_on_any_url() {
    let config = Config {
        other_list: vec![auto_script("A", "setFlag(1)", "")],
        ..Default::default()
    };
    let harness = open(config, FakePage::at("https://example.com")).await;

    eventually(|| harness.engine.flag("flag") == Some(1)).await;
    assert_eq!(harness.engine.executed_names(), vec!["A"]);
}

#[tokio::test(start_paused = true)]
async fn unmatched_condition_skips_script() {
    let config = Config {
        other_list: vec![auto_script("B", "setFlag(1)", "foo.com\nbar.com")],
        ..Default::default()
    };
    let harness = open(config, FakePage::at("https://baz.com")).await;

    settle().await;
    assert!(harness.engine.executed_names().is_empty());
    assert_eq!(harness.engine.flag("flag"), None);
}

#[tokio::test(start_paused = true)]
async fn failing_script_does_not_stop_the_pass() {
    let config = Config {
        other_list: vec![
            auto_script("bad", "throw new Error('x')", ""),
            auto_script("good", "setFlag(2)", ""),
        ],
        ..Default::default()
    };
    let harness = open(config, FakePage::at("https://example.com")).await;

    eventually(|| harness.engine.flag("flag") == Some(2)).await;
    assert_eq!(harness.engine.executed_names(), vec!["good"]);
    assert_eq!(harness.page_sink.count(Severity::Error), 1);
    let (_, message) = &harness.page_sink.records()[0];
    assert!(message.contains("bad"));
}

#[tokio::test(start_paused = true)]
async fn identical_snapshot_is_a_no_op() {
    let config = Config {
        other_list: vec![auto_script("A", "setFlag(1)", "")],
        ..Default::default()
    };
    let harness = open(config.clone(), FakePage::at("https://example.com")).await;
    eventually(|| !harness.engine.executed_names().is_empty()).await;

    // Redundant write of the same value renotifies; executor skips it.
    harness.store.save_config(&config).await.unwrap();
    settle().await;
    assert_eq!(harness.engine.executed_names().len(), 1);

    // A genuinely changed config is applied.
    let mut changed = config.clone();
    changed.other_list.push(auto_script("C", "setFlag(3)", ""));
    harness.store.save_config(&changed).await.unwrap();
    eventually(|| harness.engine.flag("flag") == Some(3)).await;
}

// ── Auto-login ──────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn auto_login_types_password_after_settling() {
    let config = Config {
        code_list: vec![login_entry("P", "foo.com", "ab", true)],
        ..Default::default()
    };
    let harness = open(config, FakePage::at("https://foo.com/login")).await;

    let input = harness.page.input.as_ref().unwrap().clone();
    eventually(move || input.value.lock().unwrap().as_str() == "ab").await;

    let events = harness.page.input.as_ref().unwrap().events.lock().unwrap().clone();
    assert_eq!(events, vec!["down:a", "input:a", "up:a", "down:b", "input:b", "up:b"]);
}

#[tokio::test(start_paused = true)]
async fn empty_password_reports_failure_without_keystrokes() {
    let config = Config {
        code_list: vec![login_entry("P", "foo.com", "", true)],
        ..Default::default()
    };
    let harness = open(config, FakePage::at("https://foo.com/")).await;

    eventually(|| harness.page_sink.count(Severity::Error) == 1).await;
    assert!(harness.page.input.as_ref().unwrap().value.lock().unwrap().is_empty());
    assert!(harness.page.input.as_ref().unwrap().events.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn first_matching_auto_run_entry_wins() {
    let config = Config {
        code_list: vec![
            login_entry("skip", "foo.com", "first", false),
            login_entry("winner", "foo.com", "xy", true),
            login_entry("later", "foo", "zz", true),
        ],
        ..Default::default()
    };
    let harness = open(config, FakePage::at("https://foo.com/")).await;

    let input = harness.page.input.as_ref().unwrap().clone();
    eventually(move || input.value.lock().unwrap().as_str() == "xy").await;
}

// ── Environment patch ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn environment_selection_patches_namespace_predicates() {
    let config = Config {
        environment: Some(Environment::Wechat),
        ..Default::default()
    };
    let harness = open(config, FakePage::at("https://example.com")).await;

    let namespace = harness.page.namespace.as_ref().unwrap().clone();
    eventually(move || *namespace.predicates.lock().unwrap() == Some((false, true))).await;
}

#[tokio::test(start_paused = true)]
async fn missing_namespace_is_a_silent_no_op() {
    let config = Config {
        environment: Some(Environment::App),
        other_list: vec![auto_script("A", "setFlag(1)", "")],
        ..Default::default()
    };
    let harness = open(config, FakePage::at("https://example.com").without_namespace()).await;

    // The rest of the snapshot still applies.
    eventually(|| harness.engine.flag("flag") == Some(1)).await;
    assert_eq!(harness.page_sink.count(Severity::Error), 0);
}

// ── Token flows ─────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn get_token_captures_marked_cookie() {
    let page = FakePage::at("https://example.com")
        .with_cookies("session=s1; DATA_PRODUCT_CMS_TOKEN=tok-9; theme=dark");
    let harness = open(Config::default(), page).await;

    harness.session.command(HostCommand::GetToken).await;
    assert_eq!(
        harness.store.load_token().await.unwrap().as_deref(),
        Some("tok-9")
    );
    assert_eq!(harness.bridge_sink.count(Severity::Success), 1);
}

#[tokio::test(start_paused = true)]
async fn get_token_without_marker_reports_failure() {
    let page = FakePage::at("https://example.com").with_cookies("a=1; b=2");
    let harness = open(Config::default(), page).await;

    harness.session.command(HostCommand::GetToken).await;
    assert!(harness.store.load_token().await.unwrap().is_none());
    assert_eq!(harness.bridge_sink.count(Severity::Error), 1);
}

#[tokio::test(start_paused = true)]
async fn set_token_applies_and_reloads() {
    let harness = open(Config::default(), FakePage::at("https://example.com")).await;
    harness.store.save_token("tok-42").await.unwrap();

    harness.session.command(HostCommand::SetToken).await;

    let tokens = harness.page.tokens.as_ref().unwrap().clone();
    eventually(move || {
        tokens.current.lock().unwrap().as_deref() == Some("tok-42")
    })
    .await;
    eventually(|| harness.page.reload_count() == 1).await;
    assert_eq!(harness.page_sink.count(Severity::Success), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_token_update_does_not_reload() {
    let mut page = FakePage::at("https://example.com");
    page.tokens = Some(Arc::new(common::FakeTokens {
        current: std::sync::Mutex::new(None),
        fail: true,
    }));
    let harness = open(Config::default(), page).await;
    harness.store.save_token("tok").await.unwrap();

    harness.session.command(HostCommand::SetToken).await;

    eventually(|| harness.page_sink.count(Severity::Error) == 1).await;
    settle().await;
    assert_eq!(harness.page.reload_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn clear_token_clears_and_reloads() {
    let harness = open(Config::default(), FakePage::at("https://example.com")).await;
    let tokens = harness.page.tokens.as_ref().unwrap().clone();
    *tokens.current.lock().unwrap() = Some("old".to_string());

    harness.session.command(HostCommand::ClearToken).await;

    let probe = tokens.clone();
    eventually(move || probe.current.lock().unwrap().is_none()).await;
    eventually(|| harness.page.reload_count() == 1).await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_reload() {
    let mut options = fast_options();
    options.executor.reload_delay = Duration::from_secs(5);
    let harness = open_with(
        Config::default(),
        FakePage::at("https://example.com"),
        options,
    )
    .await;
    harness.store.save_token("tok").await.unwrap();

    harness.session.command(HostCommand::SetToken).await;
    let tokens = harness.page.tokens.as_ref().unwrap().clone();
    eventually(move || tokens.current.lock().unwrap().is_some()).await;

    harness.session.shutdown();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.page.reload_count(), 0);
}

// ── Operator-triggered login ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn code_design_login_types_saved_password() {
    let config = Config {
        code_list: vec![login_entry("P", "foo.com", "pw", false)],
        ..Default::default()
    };
    let harness = open(config, FakePage::at("https://foo.com/admin")).await;

    harness.session.command(HostCommand::CodeDesignLogin).await;

    let input = harness.page.input.as_ref().unwrap().clone();
    eventually(move || input.value.lock().unwrap().as_str() == "pw").await;
}

#[tokio::test(start_paused = true)]
async fn code_design_login_with_no_match_reports_failure() {
    let config = Config {
        code_list: vec![login_entry("P", "other.com", "pw", false)],
        ..Default::default()
    };
    let harness = open(config, FakePage::at("https://foo.com/")).await;

    harness.session.command(HostCommand::CodeDesignLogin).await;
    assert_eq!(harness.bridge_sink.count(Severity::Error), 1);
    assert!(harness.page.input.as_ref().unwrap().value.lock().unwrap().is_empty());
}

// ── Ad hoc script execution ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn ad_hoc_script_runs_once_realm_is_ready() {
    let harness = open(Config::default(), FakePage::at("https://example.com")).await;
    eventually(|| harness.session.bridge.page_ready()).await;

    harness
        .session
        .command(HostCommand::ExecuteScript {
            message: ScriptPayload {
                name: "adhoc".into(),
                code: "setFlag(9)".into(),
            },
        })
        .await;

    eventually(|| harness.engine.flag("flag") == Some(9)).await;
}

#[tokio::test(start_paused = true)]
async fn ad_hoc_script_is_dropped_before_readiness() {
    // Bridge wired without any executor: the page realm never announces.
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let page = Arc::new(FakePage::at("https://example.com"));
    let sink = Arc::new(BufferSink::new());
    let outbox = Arc::new(ReplayOutbox::new(RealmChannel::new("isolated->page")));
    let to_isolated: Arc<RealmChannel<pagebridge::RealmMessage>> =
        Arc::new(RealmChannel::new("page->isolated"));
    let bridge_inbox = to_isolated.register();

    let bridge = Arc::new(IsolatedBridge::new(
        store,
        page,
        sink.clone(),
        outbox,
        BridgeOptions::default(),
    ));
    bridge.clone().bootstrap(bridge_inbox).await.unwrap();

    bridge
        .handle_command(HostCommand::ExecuteScript {
            message: ScriptPayload {
                name: "adhoc".into(),
                code: "setFlag(9)".into(),
            },
        })
        .await;

    assert_eq!(sink.count(Severity::Error), 1);
    assert!(!bridge.page_ready());
}

// ── Late consumer replay ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn late_executor_still_receives_initial_snapshot() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    store
        .save_config(&Config {
            other_list: vec![auto_script("A", "setFlag(1)", "")],
            ..Default::default()
        })
        .await
        .unwrap();

    let page = Arc::new(FakePage::at("https://example.com"));
    let engine = Arc::new(RecordingEngine::default());
    let outbox = Arc::new(ReplayOutbox::new(RealmChannel::new("isolated->page")));
    let to_isolated = Arc::new(RealmChannel::new("page->isolated"));
    let bridge_inbox = to_isolated.register();

    let bridge = Arc::new(IsolatedBridge::new(
        store,
        page.clone(),
        Arc::new(BufferSink::new()),
        outbox.clone(),
        BridgeOptions::default(),
    ));
    bridge.clone().bootstrap(bridge_inbox).await.unwrap();

    // The snapshot was produced while no page realm existed.
    settle().await;

    // A page realm comes up much later and registers before announcing.
    let page_inbox = outbox.register();
    let executor = Arc::new(MainWorldExecutor::new(
        page,
        engine.clone(),
        Arc::new(BufferSink::new()),
        to_isolated,
        ExecutorOptions::default(),
    ));
    executor.clone().start(page_inbox);

    eventually(|| engine.flag("flag") == Some(1)).await;
}
