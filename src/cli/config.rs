use std::collections::HashMap;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::action::fingerprint::DiffThresholds;
use crate::session::apps::AppCatalog;
use crate::session::state::Platform;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "mobile-agent",
    version,
    about = "LLM-driven mobile UI automation agent"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Ollama API endpoint
    #[arg(long, global = true)]
    pub ollama_endpoint: Option<String>,

    /// Ollama model name
    #[arg(long, global = true)]
    pub ollama_model: Option<String>,

    /// Path to config file (default: mobile-agent.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a natural-language automation prompt
    Run {
        /// The instruction to carry out, e.g. "open settings and read the device name"
        #[arg(long)]
        prompt: String,

        /// Target platform: ios or android
        #[arg(long, default_value = "ios")]
        platform: String,

        /// Device name as known to the backend
        #[arg(long)]
        device: Option<String>,

        /// Print every raw tool call and response
        #[arg(long, default_value_t = false)]
        debug: bool,
    },

    /// Interactive prompt loop against a live session
    Repl {
        /// Target platform: ios or android
        #[arg(long, default_value = "ios")]
        platform: String,

        /// Device name as known to the backend
        #[arg(long)]
        device: Option<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `mobile-agent.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub verification: DiffThresholds,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub apps: AppsConfig,
}

/// How to launch the automation backend process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_command")]
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command: default_backend_command(),
            args: Vec::new(),
        }
    }
}

/// Settle and polling delays, all in milliseconds. Tests set these to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Wait after a tap before the verification fingerprint.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Pause between orchestrated tool calls.
    #[serde(default = "default_inter_call_ms")]
    pub inter_call_ms: u64,

    /// Wait after a scroll gesture.
    #[serde(default = "default_scroll_ms")]
    pub scroll_ms: u64,

    /// Poll interval for wait_for_element.
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,

    /// Pause between the two taps of a double tap.
    #[serde(default = "default_double_tap_pause_ms")]
    pub double_tap_pause_ms: u64,

    /// Scroll attempts before scroll_to_find gives up.
    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 2000,
            inter_call_ms: 1500,
            scroll_ms: 1000,
            poll_ms: 1000,
            double_tap_pause_ms: 500,
            max_scrolls: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_max_elements")]
    pub max_elements: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_elements: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OllamaConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

/// Extra app-name to bundle/package entries merged over the built-ins.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppsConfig {
    #[serde(default)]
    pub ios: HashMap<String, String>,
    #[serde(default)]
    pub android: HashMap<String, String>,
}

impl AppsConfig {
    pub fn build_catalog(&self) -> AppCatalog {
        let mut catalog = AppCatalog::default();
        catalog.extend(Platform::Ios, &self.ios);
        catalog.extend(Platform::Android, &self.android);
        catalog
    }
}

// Serde default helpers
fn default_backend_command() -> String { "appium-mcp-server".to_string() }
fn default_settle_ms() -> u64 { 2000 }
fn default_inter_call_ms() -> u64 { 1500 }
fn default_scroll_ms() -> u64 { 1000 }
fn default_poll_ms() -> u64 { 1000 }
fn default_double_tap_pause_ms() -> u64 { 500 }
fn default_max_elements() -> usize { 50 }
fn default_max_scrolls() -> usize { 5 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("mobile-agent.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}
