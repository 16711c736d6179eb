//! Shared test doubles: a fake page host and a recording script engine.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pagebridge::error::{BridgeError, BridgeResult};
use pagebridge::page::{
    AutomationNamespace, PageApiError, PageDom, PageRealm, TokenPrimitive, TypingTarget,
};
use pagebridge::script::ScriptEngine;

// ── Fake page host ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeInput {
    pub value: Mutex<String>,
    pub events: Mutex<Vec<String>>,
}

impl TypingTarget for FakeInput {
    fn key_down(&self, ch: char) {
        self.events.lock().unwrap().push(format!("down:{ch}"));
    }

    fn append(&self, ch: char) {
        self.value.lock().unwrap().push(ch);
    }

    fn input(&self, ch: char) {
        self.events.lock().unwrap().push(format!("input:{ch}"));
    }

    fn key_up(&self, ch: char) {
        self.events.lock().unwrap().push(format!("up:{ch}"));
    }
}

#[derive(Default)]
pub struct FakeNamespace {
    pub predicates: Mutex<Option<(bool, bool)>>,
    pub fail: bool,
}

impl AutomationNamespace for FakeNamespace {
    fn set_predicates(&self, is_app: bool, is_wechat: bool) -> Result<(), PageApiError> {
        if self.fail {
            return Err(PageApiError::new("namespace is sealed"));
        }
        *self.predicates.lock().unwrap() = Some((is_app, is_wechat));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTokens {
    pub current: Mutex<Option<String>>,
    pub fail: bool,
}

impl TokenPrimitive for FakeTokens {
    fn update_token(&self, token: &str) -> Result<(), PageApiError> {
        if self.fail {
            return Err(PageApiError::new("update rejected"));
        }
        *self.current.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) -> Result<(), PageApiError> {
        if self.fail {
            return Err(PageApiError::new("clear rejected"));
        }
        *self.current.lock().unwrap() = None;
        Ok(())
    }
}

/// A page host with every capability injectable per test.
pub struct FakePage {
    pub url: String,
    pub cookies: String,
    pub input: Option<Arc<FakeInput>>,
    pub namespace: Option<Arc<FakeNamespace>>,
    pub tokens: Option<Arc<FakeTokens>>,
    pub reloads: AtomicUsize,
}

impl FakePage {
    pub fn at(url: &str) -> Self {
        Self {
            url: url.to_string(),
            cookies: String::new(),
            input: Some(Arc::new(FakeInput::default())),
            namespace: Some(Arc::new(FakeNamespace::default())),
            tokens: Some(Arc::new(FakeTokens::default())),
            reloads: AtomicUsize::new(0),
        }
    }

    pub fn with_cookies(mut self, cookies: &str) -> Self {
        self.cookies = cookies.to_string();
        self
    }

    pub fn without_namespace(mut self) -> Self {
        self.namespace = None;
        self
    }

    pub fn without_tokens(mut self) -> Self {
        self.tokens = None;
        self
    }

    pub fn without_input(mut self) -> Self {
        self.input = None;
        self
    }

    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

impl PageDom for FakePage {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn cookie_string(&self) -> String {
        self.cookies.clone()
    }

    fn typing_target(&self, _selector: &str) -> Option<Arc<dyn TypingTarget>> {
        self.input
            .as_ref()
            .map(|input| input.clone() as Arc<dyn TypingTarget>)
    }

    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}

impl PageRealm for FakePage {
    fn automation_namespace(&self) -> Option<Arc<dyn AutomationNamespace>> {
        self.namespace
            .as_ref()
            .map(|ns| ns.clone() as Arc<dyn AutomationNamespace>)
    }

    fn token_primitive(&self) -> Option<Arc<dyn TokenPrimitive>> {
        self.tokens
            .as_ref()
            .map(|t| t.clone() as Arc<dyn TokenPrimitive>)
    }
}

// ── Recording script engine ─────────────────────────────────────────────────

/// Engine that records evaluations and interprets two toy statements:
/// `setFlag(n)` stores a flag value, `throw ...` fails the evaluation.
#[derive(Default)]
pub struct RecordingEngine {
    pub executed: Mutex<Vec<String>>,
    pub flags: Mutex<HashMap<String, i64>>,
}

impl RecordingEngine {
    pub fn executed_names(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn flag(&self, name: &str) -> Option<i64> {
        self.flags.lock().unwrap().get(name).copied()
    }
}

impl ScriptEngine for RecordingEngine {
    fn eval(&self, name: &str, code: &str) -> BridgeResult<()> {
        if code.trim_start().starts_with("throw") {
            return Err(BridgeError::ScriptFailed {
                name: name.to_string(),
                message: "thrown by script".to_string(),
            });
        }
        if let Some(rest) = code.trim().strip_prefix("setFlag(") {
            if let Some(num) = rest.strip_suffix(')') {
                if let Ok(value) = num.trim().parse::<i64>() {
                    self.flags.lock().unwrap().insert("flag".to_string(), value);
                }
            }
        }
        self.executed.lock().unwrap().push(name.to_string());
        Ok(())
    }
}
