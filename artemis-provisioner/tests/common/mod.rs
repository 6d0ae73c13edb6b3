#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use artemis_provisioner::core::error::{RenderError, ServiceError};
use artemis_provisioner::core::render::{ArtifactKind, BuiltinTemplates, TemplateRenderer};
use artemis_provisioner::core::service::{ServiceCommand, ServiceManager, ServiceStatus};
use artemis_provisioner::ProvisionerConfig;
use artemis_spec::InstanceSpec;
use serde_json::Value;

pub fn folder_to_use() -> PathBuf {
    tempfile::Builder::new()
        .prefix("artemis_test_")
        .tempdir()
        .expect("failed to create temp dir")
        .keep()
}

/// Installer stand-in: logs its arguments next to itself, creates the
/// instance directory and exits with `exit_code`.
pub fn fake_installer(dir: &Path, exit_code: i32) -> PathBuf {
    let script = format!(
        "#!/bin/sh\n\
         echo \"$@\" >> \"$(dirname \"$0\")/invocations.log\"\n\
         if [ {exit_code} -eq 0 ]; then mkdir -p \"$2/etc\" \"$2/bin\"; fi\n\
         exit {exit_code}\n"
    );
    write_script(dir, &script)
}

/// Installer stand-in that leaves part of the instance tree behind and
/// then fails.
pub fn partial_installer(dir: &Path) -> PathBuf {
    let script = "#!/bin/sh\n\
         echo \"$@\" >> \"$(dirname \"$0\")/invocations.log\"\n\
         mkdir -p \"$2/bin\"\n\
         exit 1\n";
    write_script(dir, script)
}

/// Installer stand-in that creates part of the tree, then never finishes
/// in time.
pub fn slow_installer(dir: &Path) -> PathBuf {
    write_script(dir, "#!/bin/sh\nmkdir -p \"$2/bin\"\nsleep 10\n")
}

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("artemis");
    fs::write(&path, body).expect("write installer script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod installer");
    path
}

pub fn installer_invocations(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("invocations.log"))
        .map(|log| log.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Config rooted in a fresh temp dir with a working fake installer.
pub fn test_config() -> (ProvisionerConfig, PathBuf) {
    let root = folder_to_use();
    let bin = root.join("bin");
    fs::create_dir_all(&bin).unwrap();
    let config = ProvisionerConfig {
        installer_path: fake_installer(&bin, 0),
        instances_base: root.join("instances"),
        manage_ownership: false,
        ..ProvisionerConfig::default()
    };
    (config, bin)
}

pub fn spec(name: &str) -> InstanceSpec {
    let mut spec = InstanceSpec::named(name);
    spec.admin_password = artemis_spec::Secret::new("admin");
    spec.cluster_password = artemis_spec::Secret::new("cluster");
    spec
}

/// In-memory service manager. Commands update the reported status.
#[derive(Debug, Default)]
pub struct RecordingServiceManager {
    status: Mutex<ServiceStatus>,
    applied: Mutex<Vec<(String, ServiceCommand)>>,
    fail_on: Option<ServiceCommand>,
}

impl RecordingServiceManager {
    pub fn failing_on(command: ServiceCommand) -> Self {
        Self {
            fail_on: Some(command),
            ..Self::default()
        }
    }

    pub fn set_status(&self, status: ServiceStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn applied(&self) -> Vec<(String, ServiceCommand)> {
        self.applied.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<ServiceCommand> {
        self.applied().into_iter().map(|(_, c)| c).collect()
    }

    pub fn clear(&self) {
        self.applied.lock().unwrap().clear();
    }
}

impl ServiceManager for RecordingServiceManager {
    async fn status(&self, _unit: &str) -> Result<ServiceStatus, ServiceError> {
        Ok(*self.status.lock().unwrap())
    }

    async fn apply(&self, unit: &str, command: ServiceCommand) -> Result<(), ServiceError> {
        if self.fail_on == Some(command) {
            return Err(ServiceError::Other(format!("{} refused", command.verb())));
        }
        self.applied
            .lock()
            .unwrap()
            .push((unit.to_string(), command));
        let mut status = self.status.lock().unwrap();
        match command {
            ServiceCommand::Enable => status.enabled = true,
            ServiceCommand::Disable => status.enabled = false,
            ServiceCommand::Start | ServiceCommand::Restart => status.active = true,
            ServiceCommand::Stop => status.active = false,
        }
        Ok(())
    }
}

/// Built-in templates plus a per-kind render counter.
#[derive(Debug, Default)]
pub struct CountingRenderer {
    renders: AtomicUsize,
    fail_on: Option<ArtifactKind>,
}

impl CountingRenderer {
    pub fn failing_on(kind: ArtifactKind) -> Self {
        Self {
            renders: AtomicUsize::new(0),
            fail_on: Some(kind),
        }
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl TemplateRenderer for CountingRenderer {
    fn render(&self, kind: ArtifactKind, data: &Value) -> Result<String, RenderError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(kind) {
            return Err(RenderError(format!("template for {kind} is broken")));
        }
        BuiltinTemplates.render(kind, data)
    }
}
