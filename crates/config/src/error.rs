//! Configuration error types

use std::io;

use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Validation error - required field missing
    #[error("{component} '{name}' is missing required field '{field}'")]
    MissingField {
        /// Component type (e.g., "source", "destination")
        component: &'static str,
        /// Name of the component
        name: &'static str,
        /// Missing field name
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: &'static str,
        /// Field name
        field: &'static str,
        /// What is wrong with it
        message: &'static str,
    },

    /// No sources enabled
    #[error("no sources are enabled - at least one source must be enabled")]
    NoSourcesEnabled,

    /// No destinations enabled
    #[error("no destinations are enabled - at least one destination must be enabled")]
    NoDestinationsEnabled,
}

impl ConfigError {
    /// Create a MissingField error
    pub fn missing_field(component: &'static str, name: &'static str, field: &'static str) -> Self {
        Self::MissingField {
            component,
            name,
            field,
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: &'static str,
        field: &'static str,
        message: &'static str,
    ) -> Self {
        Self::InvalidValue {
            component,
            name,
            field,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_error() {
        let err = ConfigError::missing_field("source", "mqtt", "broker");
        assert!(err.to_string().contains("source"));
        assert!(err.to_string().contains("mqtt"));
        assert!(err.to_string().contains("broker"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("destination", "stdout", "flush_length", "must be at least 1");
        assert!(err.to_string().contains("stdout"));
        assert!(err.to_string().contains("flush_length"));
    }

    #[test]
    fn test_nothing_enabled_errors() {
        assert!(ConfigError::NoSourcesEnabled.to_string().contains("no sources"));
        assert!(ConfigError::NoDestinationsEnabled
            .to_string()
            .contains("no destinations"));
    }
}
