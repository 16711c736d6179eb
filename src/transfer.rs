//! Export/import transform for saved logins and scripts.
//!
//! The bundle is plain JSON with a version tag and an export timestamp.
//! Import merges by `name` uniqueness per list: entries whose name already
//! exists are skipped, new entries receive freshly generated keys, and
//! existing entries are never overwritten — importing the same bundle twice
//! adds nothing the second time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{CodeEntry, Config, ScriptEntry, generate_key};
use crate::error::{BridgeError, BridgeResult};

/// Current bundle format version.
pub const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    #[serde(default)]
    pub other_list: Vec<ScriptEntry>,
    #[serde(default)]
    pub code_list: Vec<CodeEntry>,
}

/// The persisted export/import format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: u32,
    pub export_time: DateTime<Utc>,
    pub data: ExportData,
}

/// What an import pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub added_scripts: usize,
    pub added_codes: usize,
    pub skipped: usize,
}

impl ImportSummary {
    pub fn added(&self) -> usize {
        self.added_scripts + self.added_codes
    }
}

/// Snapshot the shareable parts of a config into a bundle.
pub fn export_config(config: &Config) -> ExportBundle {
    ExportBundle {
        version: EXPORT_VERSION,
        export_time: Utc::now(),
        data: ExportData {
            other_list: config.other_list.clone(),
            code_list: config.code_list.clone(),
        },
    }
}

/// Parse a bundle, mapping any shape mismatch to a validation error.
pub fn parse_bundle(json: &str) -> BridgeResult<ExportBundle> {
    serde_json::from_str(json).map_err(|err| BridgeError::InvalidImport(err.to_string()))
}

/// Merge a bundle into `config` by name uniqueness per list.
pub fn import_bundle(config: &mut Config, bundle: &ExportBundle) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for script in &bundle.data.other_list {
        if config.other_list.iter().any(|e| e.name == script.name) {
            summary.skipped += 1;
            continue;
        }
        let mut entry = script.clone();
        entry.key = generate_key("script");
        config.other_list.push(entry);
        summary.added_scripts += 1;
    }

    for code in &bundle.data.code_list {
        if config.code_list.iter().any(|e| e.name == code.name) {
            summary.skipped += 1;
            continue;
        }
        let mut entry = code.clone();
        entry.key = generate_key("code");
        config.code_list.push(entry);
        summary.added_codes += 1;
    }

    summary
}
