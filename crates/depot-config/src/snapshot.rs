//! Immutable, flattened views of the configuration.
//!
//! A [`ConfigSnapshot`] is what activation predicates and provider factories
//! see. It is built by [`ConfigSource::load`] from three layers, later layers
//! overriding earlier ones:
//!
//! 1. the TOML configuration file (or the defaults when it is missing)
//! 2. `DEPOT_<SECTION>__<KEY>` environment variables
//! 3. one file per key in the secrets directory (`Database__Path`, ...)

use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, trace};

use crate::{
    config::Config,
    error::{ConfigError, Result},
    keys,
    path::default_config_path,
};

#[derive(Clone, Debug)]
struct Entry {
    key: String,
    value: String,
}

/// A point-in-time, read-only set of configuration values.
///
/// Keys are compared ignoring ASCII case and underscores.
#[derive(Clone, Default)]
pub struct ConfigSnapshot {
    entries: BTreeMap<String, Entry>,
}

impl ConfigSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from literal key/value pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |snapshot, (k, v)| snapshot.with(k, v))
    }

    /// Flattens a typed configuration, joining nested tables with `:`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let value = toml::Value::try_from(config)?;
        let mut snapshot = Self::new();
        flatten(&mut snapshot, None, &value);
        Ok(snapshot)
    }

    /// Returns a copy with `key` set to `value`, replacing any previous value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.entries.insert(
            keys::normalize(&key),
            Entry {
                key,
                value: value.into(),
            },
        );
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&keys::normalize(key))
            .map(|entry| entry.value.as_str())
    }

    /// True when `key` is set to `literal`, ignoring ASCII case.
    pub fn is(&self, key: &str, literal: &str) -> bool {
        self.get(key)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case(literal))
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };

        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => {
                Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected a boolean".to_string(),
                })
            }
        }
    }

    /// Iterates `(key, value)` pairs using each key's original spelling.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|entry| (entry.key.as_str(), entry.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn overlay_env<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            if keys::RESERVED_ENV.contains(&name.as_str()) {
                continue;
            }
            let Some(stripped) = name.strip_prefix(keys::ENV_PREFIX) else {
                continue;
            };
            let key = keys::from_env_name(stripped);
            trace!(key = %key, "configuration overridden by environment");
            self = self.with(key, value);
        }
        self
    }

    fn overlay_secrets(mut self, dir: &Path) -> Result<Self> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(self),
            Err(e) => return Err(ConfigError::IoError(e)),
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let value = fs::read_to_string(entry.path())?;
            let key = name.split("__").collect::<Vec<_>>().join(":");
            trace!(key = %key, "configuration overridden by secret file");
            self = self.with(key, value.trim_end_matches(['\r', '\n']));
        }

        Ok(self)
    }
}

impl fmt::Debug for ConfigSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

fn flatten(snapshot: &mut ConfigSnapshot, prefix: Option<&str>, value: &toml::Value) {
    let join = |key: &str| match prefix {
        Some(prefix) => format!("{prefix}{}{key}", keys::SEPARATOR),
        None => key.to_string(),
    };

    match value {
        toml::Value::Table(table) => {
            for (key, value) in table {
                flatten(snapshot, Some(&join(key)), value);
            }
        }
        toml::Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                flatten(snapshot, Some(&join(&index.to_string())), value);
            }
        }
        toml::Value::String(s) => {
            if let Some(prefix) = prefix {
                *snapshot = std::mem::take(snapshot).with(prefix, s.clone());
            }
        }
        other => {
            if let Some(prefix) = prefix {
                *snapshot = std::mem::take(snapshot).with(prefix, other.to_string());
            }
        }
    }
}

/// Where configuration comes from.
#[derive(Clone, Debug)]
pub struct ConfigSource {
    path: PathBuf,
    secrets_dir: Option<PathBuf>,
    use_env: bool,
}

impl ConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            secrets_dir: None,
            use_env: true,
        }
    }

    /// `$DEPOT_CONFIG` (or the XDG default) with `$DEPOT_SECRETS_DIR`
    /// (default `/run/secrets`) as the secrets directory.
    pub fn from_env() -> Self {
        let secrets_dir = std::env::var("DEPOT_SECRETS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/run/secrets"));
        Self::new(default_config_path()).with_secrets_dir(secrets_dir)
    }

    /// Reads the configuration file at `path` instead.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_secrets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.secrets_dir = Some(dir.into());
        self
    }

    /// Ignore `DEPOT_*` environment overrides.
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_config(&self) -> Result<Config> {
        Config::load(&self.path)
    }

    /// Reads every layer and produces a fresh snapshot.
    pub fn load(&self) -> Result<Arc<ConfigSnapshot>> {
        let config = self.load_config()?;
        let mut snapshot = ConfigSnapshot::from_config(&config)?;

        if self.use_env {
            snapshot = snapshot.overlay_env(std::env::vars());
        }
        if let Some(dir) = &self.secrets_dir {
            snapshot = snapshot.overlay_secrets(dir)?;
        }

        debug!(
            path = %self.path.display(),
            keys = snapshot.len(),
            "configuration loaded"
        );
        Ok(Arc::new(snapshot))
    }
}
