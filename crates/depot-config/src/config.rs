use std::{fs, path::Path};

use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};

use crate::{
    annotations::annotate_toml_table,
    error::{ConfigError, Result},
};

/// Application's configuration
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Root directory for depot's data.
    /// Default: $DEPOT_ROOT (or $XDG_DATA_HOME/depot)
    pub root_path: Option<String>,

    /// Apply pending database migrations before serving requests.
    /// Default: true
    pub run_migrations_at_startup: Option<bool>,

    /// Package metadata database.
    pub database: DatabaseConfig,

    /// Package and symbol storage.
    pub storage: StorageConfig,

    /// Search backend.
    pub search: SearchConfig,
}

/// Selects and configures the package metadata database.
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct DatabaseConfig {
    /// Database provider: "Sqlite" or "Memory".
    #[serde(rename = "type")]
    pub kind: String,

    /// Path of the SQLite database file.
    /// Default: $DEPOT_ROOT/db/depot.db
    pub path: Option<String>,
}

/// Selects and configures package and symbol storage.
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct StorageConfig {
    /// Storage provider: "FileSystem" or "Memory".
    #[serde(rename = "type")]
    pub kind: String,

    /// Root directory for the file system provider.
    /// Default: $DEPOT_ROOT/storage
    pub path: Option<String>,
}

/// Selects the search backend.
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct SearchConfig {
    /// Search provider: "Database" or "Null".
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// Minimal deployment: embedded database, local file storage, database search.
    pub fn default_config() -> Self {
        Self {
            root_path: Some("$DEPOT_ROOT".to_string()),
            run_migrations_at_startup: Some(true),
            database: DatabaseConfig {
                kind: "Sqlite".to_string(),
                path: Some("$DEPOT_ROOT/db/depot.db".to_string()),
            },
            storage: StorageConfig {
                kind: "FileSystem".to_string(),
                path: Some("$DEPOT_ROOT/storage".to_string()),
            },
            search: SearchConfig {
                kind: "Database".to_string(),
            },
        }
    }

    /// Loads the configuration file at `path`.
    /// A missing file yields the default configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    path = %path.display(),
                    "config file not found, using defaults"
                );
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Fills unset optional values and rejects empty provider selections.
    pub fn resolve(&mut self) -> Result<()> {
        for (key, value) in [
            ("Database:Type", &self.database.kind),
            ("Storage:Type", &self.storage.kind),
            ("Search:Type", &self.search.kind),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.clone(),
                    reason: "provider type must not be empty".to_string(),
                });
            }
        }

        let root = self
            .root_path
            .get_or_insert_with(|| "$DEPOT_ROOT".to_string())
            .clone();
        self.run_migrations_at_startup.get_or_insert(true);
        self.database
            .path
            .get_or_insert_with(|| format!("{root}/db/depot.db"));
        self.storage
            .path
            .get_or_insert_with(|| format!("{root}/storage"));

        Ok(())
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        if let Some(table) = doc.get_mut("database").and_then(|t| t.as_table_mut()) {
            annotate_toml_table::<DatabaseConfig>(table, false)?;
        }
        if let Some(table) = doc.get_mut("storage").and_then(|t| t.as_table_mut()) {
            annotate_toml_table::<StorageConfig>(table, false)?;
        }
        if let Some(table) = doc.get_mut("search").and_then(|t| t.as_table_mut()) {
            annotate_toml_table::<SearchConfig>(table, false)?;
        }

        Ok(doc)
    }
}

/// Writes the default configuration, annotated with field documentation, to `path`.
pub fn generate_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(ConfigError::ConfigAlreadyExists);
    }

    let annotated_doc = Config::default_config().to_annotated_document()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.database.kind, "Sqlite");
        assert_eq!(config.storage.kind, "FileSystem");
        assert_eq!(config.search.kind, "Database");
        assert_eq!(config.run_migrations_at_startup, Some(true));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.storage.kind, "FileSystem");
    }

    #[test]
    fn test_load_fills_optional_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
root_path = "/srv/depot"

[database]
type = "Memory"

[storage]
type = "Memory"

[search]
type = "Null"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.database.kind, "Memory");
        assert_eq!(config.search.kind, "Null");
        assert_eq!(config.run_migrations_at_startup, Some(true));
        assert_eq!(config.storage.path.as_deref(), Some("/srv/depot/storage"));
        assert_eq!(config.database.path.as_deref(), Some("/srv/depot/db/depot.db"));
    }

    #[test]
    fn test_resolve_rejects_empty_provider_type() {
        let mut config = Config::default_config();
        config.storage.kind = "  ".to_string();

        let result = config.resolve();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "Storage:Type"
        ));
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[database\ntype = ").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::TomlDeError(_))
        ));
    }

    #[test]
    fn test_generate_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depot").join("config.toml");

        generate_default_config(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("# Database provider"));

        let parsed: Config = toml::from_str(&content).unwrap();
        assert_eq!(parsed.database.kind, "Sqlite");

        assert!(matches!(
            generate_default_config(&path),
            Err(ConfigError::ConfigAlreadyExists)
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let serialized = toml::to_string(&config).unwrap();
        assert!(serialized.contains("type = \"FileSystem\""));

        let deserialized: std::result::Result<Config, _> = toml::from_str(&serialized);
        assert!(deserialized.is_ok());
    }
}
