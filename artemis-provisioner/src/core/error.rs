use std::io;
use std::path::PathBuf;
use artemis_spec::ConfigError;
use thiserror::Error;
use crate::core::render::ArtifactKind;

/// Fatal failures of one reconciliation pass. Every variant carries the
/// instance name; none of them affect other instances.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("instance '{instance}': {source}")]
    Validation {
        instance: String,
        #[source]
        source: ConfigError,
    },

    #[error("instance '{instance}': creation failed: {reason}")]
    Creation { instance: String, reason: String },

    #[error("instance '{instance}': rendering {artifact} failed: {reason}")]
    Render {
        instance: String,
        artifact: ArtifactKind,
        reason: String,
    },

    #[error("instance '{instance}': writing {path:?} failed: {source}")]
    Artifact {
        instance: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("instance '{instance}': cannot resolve file ownership: {reason}")]
    Ownership { instance: String, reason: String },

    #[error("instance '{instance}': service {unit}: {source}")]
    Service {
        instance: String,
        unit: String,
        #[source]
        source: ServiceError,
    },

    #[error("instance '{instance}': reconciliation aborted: {reason}")]
    Aborted { instance: String, reason: String },
}

impl ProvisionError {
    pub fn instance(&self) -> &str {
        match self {
            ProvisionError::Validation { instance, .. }
            | ProvisionError::Creation { instance, .. }
            | ProvisionError::Render { instance, .. }
            | ProvisionError::Artifact { instance, .. }
            | ProvisionError::Ownership { instance, .. }
            | ProvisionError::Service { instance, .. }
            | ProvisionError::Aborted { instance, .. } => instance,
        }
    }
}

/// Failure reported by a template renderer.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

/// Failure reported by the service manager.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{command} timed out")]
    Timeout { command: String },

    #[error("{0}")]
    Other(String),
}
