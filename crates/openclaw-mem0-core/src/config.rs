use crate::paths::{env_file_paths, get_plugin_config_path};
use crate::utils::{non_blank, parse_boolean, parse_boolean_str};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.mem0.ai";
pub const DEFAULT_USER_ID: &str = "openclaw-user";

pub const ENV_API_KEY: &str = "MEM0_API_KEY";
pub const ENV_USER_ID: &str = "MEM0_USER_ID";
pub const ENV_BASE_URL: &str = "MEM0_BASE_URL";
pub const ENV_ORG_ID: &str = "MEM0_ORG_ID";
pub const ENV_PROJECT_ID: &str = "MEM0_PROJECT_ID";
pub const ENV_TELEMETRY: &str = "MEM0_TELEMETRY";
pub const ENV_TELEMETRY_URL: &str = "MEM0_TELEMETRY_URL";

/// A frozen view of the environment variables the plugin reads.
///
/// Built once at process start by [`EnvSnapshot::load`]; the process
/// environment itself is never written to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Process environment merged with the well-known per-user env files.
    #[must_use]
    pub fn load() -> Self {
        let mut snapshot = Self::from_process();
        for (source, path) in env_file_paths() {
            snapshot.merge_env_file(source, &path);
        }
        snapshot
    }

    #[must_use]
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Adopts variables from a dotenv file for keys that are still unset or
    /// empty. A file that does not parse as a whole contributes nothing.
    /// Returns how many keys were adopted.
    pub fn merge_env_file(&mut self, source: &str, path: &Path) -> usize {
        if !path.exists() {
            return 0;
        }

        let entries = match dotenvy::from_path_iter(path) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(source, path = %path.display(), %error, "skipping unreadable env file");
                return 0;
            }
        };

        let entries = match entries.collect::<Result<Vec<_>, _>>() {
            Ok(entries) => entries,
            Err(error) => {
                warn!(source, path = %path.display(), %error, "skipping malformed env file");
                return 0;
            }
        };

        let mut adopted = 0_usize;
        for (key, value) in entries {
            if self.get(&key).is_none() {
                self.vars.insert(key, value);
                adopted += 1;
            }
        }

        debug!(source, adopted, "loaded env file");
        adopted
    }

    /// Returns the value for `key` unless it is unset or blank.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|x| !x.trim().is_empty())
    }

    fn get_owned(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }
}

/// Explicit plugin settings as handed over by the host runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    pub search_enabled: Option<Value>,
    pub add_enabled: Option<Value>,
    pub api_key: Option<String>,
    pub user_id: Option<String>,
    pub base_url: Option<String>,
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub organization_name: Option<String>,
    pub project_name: Option<String>,
    pub telemetry: Option<Value>,
    pub telemetry_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mem0Config {
    pub search_enabled: bool,
    pub add_enabled: bool,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub user_id: String,
    pub base_url: String,
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub organization_name: Option<String>,
    pub project_name: Option<String>,
    pub telemetry_enabled: bool,
    pub telemetry_url: Option<String>,
}

impl Default for Mem0Config {
    fn default() -> Self {
        build_config(None, &EnvSnapshot::default())
    }
}

/// Resolves the effective configuration: explicit setting, then environment,
/// then built-in default.
#[must_use]
pub fn build_config(plugin_config: Option<&PluginConfig>, env: &EnvSnapshot) -> Mem0Config {
    let explicit = plugin_config.cloned().unwrap_or_default();

    let telemetry_enabled = match explicit.telemetry.as_ref() {
        Some(value) => parse_boolean(Some(value), false),
        None => env
            .get(ENV_TELEMETRY)
            .and_then(parse_boolean_str)
            .unwrap_or(false),
    };

    Mem0Config {
        search_enabled: parse_boolean(explicit.search_enabled.as_ref(), true),
        add_enabled: parse_boolean(explicit.add_enabled.as_ref(), true),
        api_key: non_blank(explicit.api_key).or_else(|| env.get_owned(ENV_API_KEY)),
        user_id: non_blank(explicit.user_id)
            .or_else(|| env.get_owned(ENV_USER_ID))
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
        base_url: non_blank(explicit.base_url)
            .or_else(|| env.get_owned(ENV_BASE_URL))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        organization_id: non_blank(explicit.organization_id)
            .or_else(|| env.get_owned(ENV_ORG_ID)),
        project_id: non_blank(explicit.project_id).or_else(|| env.get_owned(ENV_PROJECT_ID)),
        organization_name: non_blank(explicit.organization_name),
        project_name: non_blank(explicit.project_name),
        telemetry_enabled,
        telemetry_url: non_blank(explicit.telemetry_url)
            .or_else(|| env.get_owned(ENV_TELEMETRY_URL)),
    }
}

pub fn load_plugin_config_at(config_path: &Path) -> anyhow::Result<PluginConfig> {
    if !config_path.exists() {
        return Ok(PluginConfig::default());
    }

    let raw = fs::read_to_string(config_path)
        .with_context(|| format!("read plugin config {}", config_path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parse plugin config {}", config_path.display()))
}

pub fn load_plugin_config() -> anyhow::Result<PluginConfig> {
    load_plugin_config_at(&get_plugin_config_path())
}
