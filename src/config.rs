//! Shared configuration aggregate and the pure matching rules that drive
//! conditional automation.
//!
//! `Config` is a single versionless blob: environment selection, saved login
//! entries, and user-authored scripts. It is created empty on first use,
//! mutated only by operator actions, persisted atomically per mutation, and
//! observed reactively for the lifetime of each tab's bridge.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Target environment a page can be made to believe it runs in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Environment {
    App,
    Wechat,
    Other,
}

impl Environment {
    /// The `(is_app, is_wechat)` predicate pair a page namespace should report
    /// for this selection. `None` (no selection) clears both predicates.
    pub fn predicates(selected: Option<Environment>) -> (bool, bool) {
        match selected {
            Some(Environment::App) => (true, false),
            Some(Environment::Wechat) => (false, true),
            Some(Environment::Other) | None => (false, false),
        }
    }
}

/// A saved login entry: matched against the page URL, typed into the page's
/// login input when activated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeEntry {
    pub key: String,
    pub name: String,
    /// URL substring matcher; an empty link matches every URL.
    pub link: String,
    pub password: String,
    #[serde(default)]
    pub auto_run: bool,
}

/// A user-authored page script, optionally auto-run when its condition lines
/// match the current URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptEntry {
    pub key: String,
    pub name: String,
    /// Opaque source text, evaluated in the page realm.
    pub code: String,
    #[serde(default)]
    pub auto_run: bool,
    /// Newline-separated URL substrings. Empty means "every URL".
    #[serde(default)]
    pub auto_run_condition: String,
}

/// The single shared configuration aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub code_list: Vec<CodeEntry>,
    #[serde(default)]
    pub other_list: Vec<ScriptEntry>,
}

impl Config {
    /// First login entry whose `link` is a substring of `url`, regardless of
    /// its auto-run flag. This is the operator-triggered login selection.
    pub fn login_entry_for(&self, url: &str) -> Option<&CodeEntry> {
        self.code_list.iter().find(|entry| url.contains(&entry.link))
    }

    /// The single entry eligible for auto-login on `url`: first in list order
    /// with a matching `link` and `auto_run` set.
    pub fn auto_login_entry_for(&self, url: &str) -> Option<&CodeEntry> {
        self.code_list
            .iter()
            .find(|entry| entry.auto_run && url.contains(&entry.link))
    }

    /// All scripts that should auto-run on `url`, in list order.
    pub fn auto_run_scripts_for(&self, url: &str) -> Vec<&ScriptEntry> {
        self.other_list
            .iter()
            .filter(|entry| entry.auto_run && does_url_match(url, &entry.auto_run_condition))
            .collect()
    }
}

/// Whether `url` satisfies a newline-separated condition list.
///
/// Case-sensitive substring containment, OR semantics across lines, vacuously
/// true when no non-empty line remains.
pub fn does_url_match(url: &str, condition_lines: &str) -> bool {
    let mut lines = condition_lines
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .peekable();
    if lines.peek().is_none() {
        return true;
    }
    lines.any(|line| url.contains(line))
}

/// Generate a unique entry key, e.g. `script-18c2f4a9b3e-7f21`.
pub fn generate_key(prefix: &str) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let salt: u16 = rand::random();
    format!("{prefix}-{timestamp:x}-{salt:04x}")
}
