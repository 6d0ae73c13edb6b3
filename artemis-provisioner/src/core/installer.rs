use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use artemis_spec::{InstanceSpec, Role};
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use crate::core::error::ProvisionError;

/// Idempotency gate: a present instance directory means the instance was
/// created before. Checked fresh on every pass.
pub fn exists(instance_dir: &Path) -> bool {
    instance_dir.is_dir()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationOutcome {
    Created,
    AlreadyPresent,
    /// No installer on this host; the instance may be managed elsewhere.
    InstallerMissing,
    /// Dry run; the installer would have been invoked.
    Planned,
}

/// Wraps the broker's `create` command.
#[derive(Debug, Clone)]
pub struct Installer {
    path: PathBuf,
    timeout: Duration,
}

impl Installer {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_present(&self) -> bool {
        self.path.is_file()
    }

    /// What `create` would do right now, without running anything.
    pub fn plan(&self, instance_dir: &Path) -> CreationOutcome {
        if !self.is_present() {
            CreationOutcome::InstallerMissing
        } else if exists(instance_dir) {
            CreationOutcome::AlreadyPresent
        } else {
            CreationOutcome::Planned
        }
    }

    /// Runs the installer unless it is missing or the instance already
    /// exists. A non-zero exit, a timeout or a missing directory afterwards
    /// fails the pass, and whatever the failed run left behind is removed.
    pub async fn create(
        &self,
        spec: &InstanceSpec,
        instance_dir: &Path,
    ) -> Result<CreationOutcome, ProvisionError> {
        match self.plan(instance_dir) {
            CreationOutcome::InstallerMissing => {
                warn!(instance = %spec.name, installer = ?self.path, "installer not found, skipping creation");
                return Ok(CreationOutcome::InstallerMissing);
            }
            CreationOutcome::AlreadyPresent => {
                debug!(instance = %spec.name, dir = ?instance_dir, "instance already exists");
                return Ok(CreationOutcome::AlreadyPresent);
            }
            _ => {}
        }

        info!(instance = %spec.name, dir = ?instance_dir, "creating instance");
        match self.run(spec, instance_dir).await {
            Ok(()) => {
                info!(instance = %spec.name, "instance created");
                Ok(CreationOutcome::Created)
            }
            Err(reason) => {
                // The directory did not exist before this run, so whatever
                // is there now is a half-built tree.
                discard_partial(spec, instance_dir);
                Err(creation_error(spec, reason))
            }
        }
    }

    async fn run(&self, spec: &InstanceSpec, instance_dir: &Path) -> Result<(), String> {
        let mut child = Command::new(&self.path)
            .args(create_args(spec, instance_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to spawn {:?}: {e}", self.path))?;

        let waited = timeout(self.timeout, wait_capturing_stderr(&mut child)).await;
        let (status, stderr) = match waited {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => return Err(format!("waiting for installer: {e}")),
            Err(_) => {
                // Reap before the caller cleans up, or the installer could
                // still be writing into the tree.
                if let Err(e) = child.kill().await {
                    warn!(instance = %spec.name, "killing installer: {e}");
                }
                return Err(format!("installer timed out after {:?}", self.timeout));
            }
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(format!("installer exited with {status}: {}", stderr.trim()));
        }
        if !exists(instance_dir) {
            return Err(format!("installer succeeded but {instance_dir:?} does not exist"));
        }
        Ok(())
    }
}

async fn wait_capturing_stderr(child: &mut Child) -> io::Result<(ExitStatus, Vec<u8>)> {
    let mut stderr = Vec::new();
    if let Some(mut pipe) = child.stderr.take() {
        pipe.read_to_end(&mut stderr).await?;
    }
    let status = child.wait().await?;
    Ok((status, stderr))
}

fn discard_partial(spec: &InstanceSpec, instance_dir: &Path) {
    if !instance_dir.exists() {
        return;
    }
    match fs::remove_dir_all(instance_dir) {
        Ok(()) => info!(instance = %spec.name, dir = ?instance_dir, "removed partially created instance"),
        Err(e) => warn!(instance = %spec.name, dir = ?instance_dir, "cannot remove partial instance: {e}"),
    }
}

fn creation_error(spec: &InstanceSpec, reason: String) -> ProvisionError {
    ProvisionError::Creation {
        instance: spec.name.clone(),
        reason,
    }
}

/// Fixed flags followed by every spec field the installer understands. The
/// derived ones are overwritten by rendering later, but passing them makes
/// the installer reject options the installed broker release lacks.
pub fn create_args(spec: &InstanceSpec, instance_dir: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["create".into(), instance_dir.into()];
    let mut flag = |name: &str, value: Option<String>| {
        args.push(name.into());
        if let Some(value) = value {
            args.push(value.into());
        }
    };

    flag("--aio", None);
    flag("--autocreate", None);
    flag("--clustered", None);
    flag("--replicated", None);
    flag("--cluster-user", Some(spec.cluster_user.clone()));
    flag("--cluster-password", Some(spec.cluster_password.expose().to_string()));
    flag("--name", Some(spec.name.clone()));
    flag("--host", Some(spec.bind.clone()));
    flag("--require-login", None);
    flag("--user", Some(spec.admin_user.clone()));
    flag("--password", Some(spec.admin_password.expose().to_string()));

    flag("--default-port", Some(spec.port.to_string()));
    flag("--http-host", Some(spec.web_bind.clone()));
    flag("--http-port", Some(spec.web_port.to_string()));
    flag("--max-hops", Some(spec.max_hops.to_string()));
    flag(
        "--message-load-balancing",
        Some(spec.message_load_balancing.as_upper().to_string()),
    );
    if spec.failover_on_shutdown {
        flag("--failover-on-shutdown", None);
    }
    if spec.role == Role::Slave {
        flag("--slave", None);
    }
    if !spec.journal_datasync {
        flag("--no-fsync", None);
    }
    if let Some(size) = &spec.global_max_size {
        flag("--global-max-size", Some(size.clone()));
    }
    if !spec.addresses.is_empty() {
        let names: Vec<&str> = spec.addresses.keys().map(String::as_str).collect();
        flag("--addresses", Some(names.join(",")));
    }
    args
}
