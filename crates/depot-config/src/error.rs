use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum PathError {
    #[error("Path is empty")]
    #[diagnostic(code(depot_config::path::empty))]
    Empty,

    #[error("Failed to get current directory: {source}")]
    #[diagnostic(code(depot_config::path::current_dir))]
    CurrentDir {
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable `{var}` not set in `{input}`")]
    #[diagnostic(
        code(depot_config::path::missing_env_var),
        help("Export the variable or use an absolute path")
    )]
    MissingEnvVar { var: String, input: String },

    #[error("Unclosed variable expression starting at `{input}`")]
    #[diagnostic(code(depot_config::path::unclosed_variable))]
    UnclosedVariable { input: String },
}

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(depot_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(depot_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists")]
    #[diagnostic(
        code(depot_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists,

    #[error("Invalid value `{value}` for `{key}`: {reason}")]
    #[diagnostic(code(depot_config::invalid_value))]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    #[diagnostic(code(depot_config::io))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(depot_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(depot_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_error_display() {
        let err = PathError::MissingEnvVar {
            var: "DEPOT_ROOT".to_string(),
            input: "$DEPOT_ROOT/storage".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Environment variable `DEPOT_ROOT` not set in `$DEPOT_ROOT/storage`"
        );
    }

    #[test]
    fn test_invalid_value_display() {
        let err = ConfigError::InvalidValue {
            key: "RunMigrationsAtStartup".to_string(),
            value: "maybe".to_string(),
            reason: "expected a boolean".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value `maybe` for `RunMigrationsAtStartup`: expected a boolean"
        );
    }

    #[test]
    fn test_path_error_is_transparent() {
        let err: ConfigError = PathError::Empty.into();
        assert_eq!(err.to_string(), "Path is empty");
    }
}
