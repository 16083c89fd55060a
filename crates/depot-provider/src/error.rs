//! Error types for provider resolution.

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Boxed error returned by provider factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A configuration value an activation predicate looked at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectedValue {
    pub key: String,
    pub value: Option<String>,
}

impl fmt::Display for InspectedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} = {:?}", self.key, value),
            None => write!(f, "{} is not set", self.key),
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "none".to_string();
    }
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Diagnostic, Debug)]
pub enum ProviderError {
    #[error(
        "No active {capability} provider ({}; registered: {})",
        join(.inspected),
        join(.registered)
    )]
    #[diagnostic(
        code(depot_provider::no_active_provider),
        help("Set the configuration value to the name of one of the registered providers")
    )]
    NoActiveProvider {
        capability: &'static str,
        inspected: Vec<InspectedValue>,
        registered: Vec<&'static str>,
    },

    #[error("Providers '{first}' and '{second}' both claim {key} = {value:?} for {capability}")]
    #[diagnostic(
        code(depot_provider::duplicate_claim),
        help("Each provider of a capability must activate on a distinct configuration value")
    )]
    DuplicateClaim {
        capability: &'static str,
        key: &'static str,
        value: &'static str,
        first: &'static str,
        second: &'static str,
    },

    #[error("Failed to construct {capability} provider '{provider}': {source}")]
    #[diagnostic(
        code(depot_provider::construction),
        help("Check the settings the selected provider depends on")
    )]
    Construction {
        capability: &'static str,
        provider: &'static str,
        #[source]
        source: BoxError,
    },
}

impl ProviderError {
    /// The capability this error is about.
    pub fn capability(&self) -> &'static str {
        match self {
            Self::NoActiveProvider { capability, .. }
            | Self::DuplicateClaim { capability, .. }
            | Self::Construction { capability, .. } => capability,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_active_provider_display() {
        let err = ProviderError::NoActiveProvider {
            capability: "storage",
            inspected: vec![InspectedValue {
                key: "Storage:Type".to_string(),
                value: Some("S3".to_string()),
            }],
            registered: vec!["FileSystem", "Memory"],
        };

        assert_eq!(
            err.to_string(),
            "No active storage provider (Storage:Type = \"S3\"; registered: FileSystem, Memory)"
        );
        assert_eq!(err.capability(), "storage");
    }

    #[test]
    fn test_no_active_provider_unset_value() {
        let err = ProviderError::NoActiveProvider {
            capability: "search",
            inspected: vec![InspectedValue {
                key: "Search:Type".to_string(),
                value: None,
            }],
            registered: vec![],
        };

        assert_eq!(
            err.to_string(),
            "No active search provider (Search:Type is not set; registered: none)"
        );
    }

    #[test]
    fn test_construction_keeps_source() {
        use std::error::Error as _;

        let err = ProviderError::Construction {
            capability: "database",
            provider: "Sqlite",
            source: "unable to open database file".into(),
        };

        assert!(err.source().is_some());
        assert!(err.to_string().contains("unable to open database file"));
    }
}
