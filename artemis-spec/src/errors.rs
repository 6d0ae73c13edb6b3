use thiserror::Error;

/// Validation failures raised while normalizing acceptor and plugin maps.
/// Every variant names the offending entry so an operator can find it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid acceptor '{acceptor}': {reason}")]
    InvalidAcceptorConfig { acceptor: String, reason: String },

    #[error("acceptor '{acceptor}' is missing required field '{field}'")]
    MissingRequiredField {
        acceptor: String,
        field: &'static str,
    },

    #[error("invalid plugin '{plugin}': {reason}")]
    InvalidPluginConfig { plugin: String, reason: String },

    #[error("plugin '{plugin}' must carry a boolean 'enable' field")]
    MissingEnableFlag { plugin: String },
}

impl ConfigError {
    /// Key of the acceptor or plugin entry that failed validation.
    pub fn entry(&self) -> &str {
        match self {
            ConfigError::InvalidAcceptorConfig { acceptor, .. }
            | ConfigError::MissingRequiredField { acceptor, .. } => acceptor,
            ConfigError::InvalidPluginConfig { plugin, .. }
            | ConfigError::MissingEnableFlag { plugin } => plugin,
        }
    }
}
