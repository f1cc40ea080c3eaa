use std::path::Path;

/// Runtime settings of an [`Executor`](crate::Executor), usually read from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    pub errors: ErrorsConfig,
    pub tracing: TracingConfig,
    pub dataloader: DataloaderConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ErrorsConfig {
    /// Replace the message of errors no handler recognized with `unhandled_message`.
    pub mask_unhandled: bool,
    pub unhandled_message: String,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            mask_unhandled: true,
            unhandled_message: "Internal server error".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TracingConfig {
    /// Wrap every resolver call in an `execute_field` span.
    pub field_spans: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataloaderConfig {
    /// Drop every cached batch result before each root mutation field.
    pub clear_between_mutation_fields: bool,
}

impl Default for DataloaderConfig {
    fn default() -> Self {
        Self {
            clear_between_mutation_fields: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid executor configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ExecutorConfig {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&source)
    }
}
