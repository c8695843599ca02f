//! Player configuration.
//!
//! The configuration is built in three layers:
//! - the default configuration embedded in the crate,
//! - an optional YAML file merged on top of it,
//! - environment variables prefixed with `PMOPLAYER_CONFIG__`, where `__`
//!   separates path segments (`PMOPLAYER_CONFIG__SOURCE__USER_AGENT=foo`).
//!
//! The resulting [`PlayerConfig`] is a plain value handed to the
//! coordinator. Nothing is stored globally.

use std::{env, fs, path::Path, time::Duration};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::model::MediaItem;
use crate::samples::default_samples;
use crate::source::SourceContext;

const DEFAULT_CONFIG: &str = include_str!("default_config.yaml");
const ENV_PREFIX: &str = "PMOPLAYER_CONFIG__";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub user_agent: String,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

impl SourceConfig {
    pub fn to_context(&self) -> SourceContext {
        SourceContext {
            user_agent: self.user_agent.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogConfig {
    pub enabled: bool,
    /// Number of timeline periods logged before eliding the rest.
    pub max_timeline_lines: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub source: SourceConfig,
    pub event_log: EventLogConfig,
    /// Sample catalogue offered to the user. Falls back to the built-in
    /// list when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<MediaItem>>,
}

impl Default for PlayerConfig {
    /// The embedded configuration alone, without file or environment
    /// layers.
    fn default() -> Self {
        Self::from_layers(None, std::iter::empty::<(String, String)>())
            .expect("embedded default player configuration must parse")
    }
}

impl PlayerConfig {
    /// Loads the configuration from the optional `path`, applying the
    /// process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let external = match path {
            Some(path) => {
                let data = fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                info!(config_file = %path.display(), "Loaded config file");
                Some(data)
            }
            None => {
                info!("No config file given, using default embedded config");
                None
            }
        };
        Self::from_layers(external.as_deref(), env::vars())
    }

    /// Builds the configuration from an optional YAML document and a set of
    /// environment variables.
    pub fn from_layers<I>(external: Option<&str>, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut value: Value =
            serde_yaml::from_str(DEFAULT_CONFIG).context("parsing embedded default config")?;

        if let Some(external) = external {
            let external: Value =
                serde_yaml::from_str(external).context("parsing config file")?;
            merge_layer(&mut value, external);
        }

        apply_env_overrides(&mut value, vars)?;

        serde_yaml::from_value(value).context("invalid player configuration")
    }

    pub fn source_context(&self) -> SourceContext {
        self.source.to_context()
    }

    pub fn samples(&self) -> Vec<MediaItem> {
        self.samples.clone().unwrap_or_else(default_samples)
    }
}

fn apply_env_overrides<I>(config: &mut Value, vars: I) -> Result<()>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, raw) in vars {
        let Some(path) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<String> = path.split("__").map(str::to_lowercase).collect();
        debug!(key = %key, "Applying config override from environment");
        set_value(config, &path, convert_env_value(&raw))?;
    }
    Ok(())
}

fn set_value(data: &mut Value, path: &[String], value: Value) -> Result<()> {
    let Some((head, rest)) = path.split_first() else {
        *data = value;
        return Ok(());
    };
    let Value::Mapping(map) = data else {
        return Err(anyhow!("config node above '{}' is not a map", head));
    };
    let key = Value::String(head.clone());
    if rest.is_empty() {
        map.insert(key, value);
        Ok(())
    } else {
        let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
        set_value(entry, rest, value)
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

/// Lowercases every mapping key of `value`, recursively.
fn lower_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(key, inner)| (lower_key(key), lower_keys(inner)))
                .collect(),
        ),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(lower_keys).collect()),
        other => other,
    }
}

fn lower_key(key: Value) -> Value {
    match key {
        Value::String(name) => Value::String(name.to_lowercase()),
        other => other,
    }
}

/// Applies a user layer on top of `base`. Keys of the layer are matched
/// case-insensitively; a map merges key by key into the map below it, any
/// other value takes the place of whatever it lands on.
fn merge_layer(base: &mut Value, layer: Value) {
    let Value::Mapping(layer) = layer else {
        *base = lower_keys(layer);
        return;
    };
    if !base.is_mapping() {
        *base = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(base) = base else {
        return;
    };
    for (key, value) in layer {
        let key = lower_key(key);
        match base.get_mut(&key) {
            Some(slot) => merge_layer(slot, value),
            None => {
                base.insert(key, lower_keys(value));
            }
        }
    }
}
