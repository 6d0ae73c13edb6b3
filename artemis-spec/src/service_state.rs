use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceEnsure {
    Running,
    Stopped,
}

impl fmt::Display for ServiceEnsure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceEnsure::Running => f.write_str("running"),
            ServiceEnsure::Stopped => f.write_str("stopped"),
        }
    }
}

/// Resolved service state for one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveServiceState {
    pub enable: bool,
    pub ensure: ServiceEnsure,
}

impl Default for EffectiveServiceState {
    fn default() -> Self {
        Self {
            enable: true,
            ensure: ServiceEnsure::Running,
        }
    }
}

/// Instance-level overrides; an unset field defers to the process default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOverride {
    pub enable: Option<bool>,
    pub ensure: Option<ServiceEnsure>,
}

/// Override wins field by field, anything absent falls back to the default.
pub fn effective_state(
    instance_override: Option<ServiceOverride>,
    process_default: EffectiveServiceState,
) -> EffectiveServiceState {
    let overrides = instance_override.unwrap_or_default();
    EffectiveServiceState {
        enable: overrides.enable.unwrap_or(process_default.enable),
        ensure: overrides.ensure.unwrap_or(process_default.ensure),
    }
}
