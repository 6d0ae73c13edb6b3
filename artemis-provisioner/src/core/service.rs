use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use artemis_spec::{EffectiveServiceState, ServiceEnsure};
use serde::Serialize;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};
use crate::core::error::ServiceError;

/// What the service manager currently reports for a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub active: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCommand {
    Enable,
    Disable,
    Start,
    Stop,
    Restart,
}

impl ServiceCommand {
    pub fn verb(self) -> &'static str {
        match self {
            ServiceCommand::Enable => "enable",
            ServiceCommand::Disable => "disable",
            ServiceCommand::Start => "start",
            ServiceCommand::Stop => "stop",
            ServiceCommand::Restart => "restart",
        }
    }
}

/// The OS service manager, seen only through status queries and commands.
pub trait ServiceManager {
    fn status(&self, unit: &str) -> impl Future<Output = Result<ServiceStatus, ServiceError>> + Send;

    fn apply(
        &self,
        unit: &str,
        command: ServiceCommand,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceReport {
    pub unit: String,
    pub state: EffectiveServiceState,
    pub actions: Vec<ServiceCommand>,
}

impl ServiceReport {
    pub fn restarted(&self) -> bool {
        self.actions.contains(&ServiceCommand::Restart)
    }
}

/// Commands that move `status` to `state`. A changed config restarts a
/// running service; a service that is only now being started needs no
/// restart.
pub fn plan(
    status: ServiceStatus,
    state: EffectiveServiceState,
    config_changed: bool,
) -> Vec<ServiceCommand> {
    let mut actions = Vec::new();
    if state.enable != status.enabled {
        actions.push(if state.enable {
            ServiceCommand::Enable
        } else {
            ServiceCommand::Disable
        });
    }
    match state.ensure {
        ServiceEnsure::Running if !status.active => actions.push(ServiceCommand::Start),
        ServiceEnsure::Running if config_changed => actions.push(ServiceCommand::Restart),
        ServiceEnsure::Stopped if status.active => actions.push(ServiceCommand::Stop),
        _ => {}
    }
    actions
}

/// Brings `unit` to `state`. Runs only after all artifacts are committed.
pub async fn reconcile<S: ServiceManager>(
    manager: &S,
    unit: &str,
    state: EffectiveServiceState,
    config_changed: bool,
    dry_run: bool,
) -> Result<ServiceReport, ServiceError> {
    let status = manager.status(unit).await?;
    let actions = plan(status, state, config_changed);
    debug!(unit, ?status, ?state, ?actions, "service plan");

    if !dry_run {
        for command in &actions {
            info!(unit, action = command.verb(), "applying service action");
            manager.apply(unit, *command).await?;
        }
    }

    Ok(ServiceReport {
        unit: unit.to_string(),
        state,
        actions,
    })
}

/// Drives units through `systemctl`.
#[derive(Debug, Clone)]
pub struct SystemdServiceManager {
    systemctl: PathBuf,
    timeout: Duration,
}

impl Default for SystemdServiceManager {
    fn default() -> Self {
        Self {
            systemctl: PathBuf::from("systemctl"),
            timeout: Duration::from_secs(90),
        }
    }
}

impl SystemdServiceManager {
    pub fn new(systemctl: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            systemctl: systemctl.into(),
            timeout,
        }
    }

    /// Runs `systemctl <verb> <unit>`; returns whether it exited zero.
    async fn run(&self, verb: &str, unit: &str) -> Result<(bool, String), ServiceError> {
        let command = format!("systemctl {verb} {unit}");
        let mut cmd = Command::new(&self.systemctl);
        cmd.arg(verb)
            .arg(unit)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        let output = match timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(ServiceError::Spawn { command, source }),
            Err(_) => return Err(ServiceError::Timeout { command }),
        };
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Ok((output.status.success(), stderr))
    }
}

impl ServiceManager for SystemdServiceManager {
    async fn status(&self, unit: &str) -> Result<ServiceStatus, ServiceError> {
        let (active, _) = self.run("is-active", unit).await?;
        let (enabled, _) = self.run("is-enabled", unit).await?;
        Ok(ServiceStatus { active, enabled })
    }

    async fn apply(&self, unit: &str, command: ServiceCommand) -> Result<(), ServiceError> {
        let (ok, stderr) = self.run(command.verb(), unit).await?;
        if ok {
            Ok(())
        } else {
            Err(ServiceError::Failed {
                command: format!("systemctl {} {unit}", command.verb()),
                status: "non-zero exit".into(),
                stderr,
            })
        }
    }
}
