use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub keys: KeyConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// How to reach the issue-tracker command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Program name or path
    #[serde(default = "default_command")]
    pub command: String,
    /// Upper bound on any single invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum records fetched per listing
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Sort order passed through to the tracker
    #[serde(default = "default_sort")]
    pub sort: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            command: default_command(),
            timeout_secs: default_timeout_secs(),
            limit: default_limit(),
            sort: default_sort(),
        }
    }
}

fn default_command() -> String {
    "bd".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_limit() -> usize {
    100
}

fn default_sort() -> String {
    "priority".to_string()
}

/// Key bindings, as key specs (`esc`, `/`, `ctrl+g`, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    #[serde(default = "default_cancel")]
    pub cancel: String,
    #[serde(default = "default_start_search")]
    pub start_search: String,
    #[serde(default = "default_edit")]
    pub edit: String,
    /// Must be a single character
    #[serde(default = "default_scroll_down")]
    pub scroll_down: String,
    /// Must be a single character
    #[serde(default = "default_scroll_up")]
    pub scroll_up: String,
    /// Digits 0-4 set priority
    #[serde(default = "default_true")]
    pub priority_hotkeys: bool,
    /// Allow entering search mode
    #[serde(default = "default_true")]
    pub search: bool,
}

impl Default for KeyConfig {
    fn default() -> Self {
        KeyConfig {
            cancel: default_cancel(),
            start_search: default_start_search(),
            edit: default_edit(),
            scroll_down: default_scroll_down(),
            scroll_up: default_scroll_up(),
            priority_hotkeys: true,
            search: true,
        }
    }
}

fn default_cancel() -> String {
    "esc".to_string()
}

fn default_start_search() -> String {
    "/".to_string()
}

fn default_edit() -> String {
    "e".to_string()
}

fn default_scroll_down() -> String {
    "J".to_string()
}

fn default_scroll_up() -> String {
    "K".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Rows given to the description preview below the list
    #[serde(default = "default_preview_height")]
    pub preview_height: usize,
    /// Theme overrides: slot name -> `#RRGGBB`
    #[serde(default)]
    pub colors: HashMap<String, String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            preview_height: default_preview_height(),
            colors: HashMap::new(),
        }
    }
}

fn default_preview_height() -> usize {
    8
}
