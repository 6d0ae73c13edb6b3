use std::fmt;
use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::core::artifact::ArtifactReport;
use crate::core::installer::CreationOutcome;
use crate::core::service::ServiceReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassOutcome {
    Applied,
    /// The instance targets another host.
    Skipped,
    /// No installer and no instance directory: nothing to configure yet.
    Deferred,
}

/// What one reconciliation pass did for one instance.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub instance: String,
    pub host: String,
    pub outcome: PassOutcome,
    pub dry_run: bool,
    pub creation: Option<CreationOutcome>,
    pub artifacts: Vec<ArtifactReport>,
    pub service: Option<ServiceReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PassReport {
    pub(crate) fn skipped(instance: &str, host: &str, started_at: DateTime<Utc>) -> Self {
        Self::unapplied(instance, host, PassOutcome::Skipped, None, started_at)
    }

    pub(crate) fn deferred(
        instance: &str,
        host: &str,
        dry_run: bool,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            dry_run,
            ..Self::unapplied(
                instance,
                host,
                PassOutcome::Deferred,
                Some(CreationOutcome::InstallerMissing),
                started_at,
            )
        }
    }

    fn unapplied(
        instance: &str,
        host: &str,
        outcome: PassOutcome,
        creation: Option<CreationOutcome>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            instance: instance.to_string(),
            host: host.to_string(),
            outcome,
            dry_run: false,
            creation,
            artifacts: Vec::new(),
            service: None,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn config_changed(&self) -> bool {
        self.artifacts.iter().any(|a| a.changed)
    }

    pub fn restarted(&self) -> bool {
        self.service.as_ref().is_some_and(ServiceReport::restarted)
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            PassOutcome::Skipped => {
                return write!(f, "{}: skipped (not targeted at {})", self.instance, self.host)
            }
            PassOutcome::Deferred => {
                return write!(f, "{}: deferred (no installer, instance not created)", self.instance)
            }
            PassOutcome::Applied => {}
        }
        write!(f, "{}:", self.instance)?;
        if self.dry_run {
            write!(f, " [dry run]")?;
        }
        if let Some(creation) = self.creation {
            write!(f, " creation={creation:?}")?;
        }
        let changed: Vec<String> = self
            .artifacts
            .iter()
            .filter(|a| a.changed)
            .map(|a| a.kind.to_string())
            .collect();
        if changed.is_empty() {
            write!(f, " config unchanged")?;
        } else {
            write!(f, " changed=[{}]", changed.join(","))?;
        }
        if let Some(service) = &self.service {
            let actions: Vec<&str> = service.actions.iter().map(|a| a.verb()).collect();
            write!(f, " service {} ", service.unit)?;
            if actions.is_empty() {
                write!(f, "in sync")?;
            } else {
                write!(f, "-> {}", actions.join(","))?;
            }
        }
        Ok(())
    }
}
