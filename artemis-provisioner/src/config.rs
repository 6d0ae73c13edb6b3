use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{bail, Context, Result};
use artemis_spec::{EffectiveServiceState, InstanceSpec, ServiceEnsure};
use serde::Deserialize;

/// Process-wide knobs every instance inherits unless it overrides them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionerConfig {
    /// The broker's `artemis` CLI used to create instances.
    pub installer_path: PathBuf,

    /// Instances live in `<instances_base>/<name>`.
    pub instances_base: PathBuf,

    /// Unit template; instance units are `<service_base>@<name>`.
    pub service_base: String,

    pub service_enable: bool,
    pub service_ensure: ServiceEnsure,

    /// Owner of rendered config files.
    pub owner: String,
    pub group: String,

    /// chown rendered files. Only honoured when running as root.
    pub manage_ownership: bool,

    /// Upper bound on one installer run.
    pub installer_timeout_secs: u64,

    pub instances: BTreeMap<String, InstanceSpec>,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            installer_path: PathBuf::from("/opt/artemis/bin/artemis"),
            instances_base: PathBuf::from("/var/lib/artemis"),
            service_base: "activemq".into(),
            service_enable: true,
            service_ensure: ServiceEnsure::Running,
            owner: "activemq".into(),
            group: "activemq".into(),
            manage_ownership: true,
            installer_timeout_secs: 300,
            instances: BTreeMap::new(),
        }
    }
}

impl ProvisionerConfig {
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => Self::read_from_file(p),
            None => Ok(Self::default()),
        }
    }

    fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading {:?}", path.as_ref()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing {:?}", path.as_ref()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let mut cfg: ProvisionerConfig =
            toml::from_str(raw).context("parsing provisioner config TOML")?;
        for (name, spec) in cfg.instances.iter_mut() {
            spec.name = name.clone();
        }
        Ok(cfg)
    }

    /// Module-wide service state, used where an instance has no override.
    pub fn service_defaults(&self) -> EffectiveServiceState {
        EffectiveServiceState {
            enable: self.service_enable,
            ensure: self.service_ensure,
        }
    }

    pub fn installer_timeout(&self) -> Duration {
        Duration::from_secs(self.installer_timeout_secs)
    }

    pub fn instance_dir(&self, name: &str) -> PathBuf {
        self.instances_base.join(name)
    }

    pub fn service_unit(&self, name: &str) -> String {
        format!("{}@{}", self.service_base, name)
    }

    /// Instances to reconcile: all of them, or only those named in `only`.
    pub fn instance_specs(&self, only: &[String]) -> Result<Vec<InstanceSpec>> {
        if only.is_empty() {
            return Ok(self.instances.values().cloned().collect());
        }
        let mut specs = Vec::with_capacity(only.len());
        for name in only {
            match self.instances.get(name) {
                Some(spec) => specs.push(spec.clone()),
                None => bail!("instance '{name}' is not declared in the config"),
            }
        }
        Ok(specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        installer_path = "/opt/artemis-2.31/bin/artemis"
        instances_base = "/srv/artemis"
        service_ensure = "stopped"

        [instances.primary]
        port = 61617

        [instances.backup]
        role = "slave"
        ha_policy = "replication"
    "#;

    #[test]
    fn instance_names_come_from_table_keys() {
        let cfg = ProvisionerConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(cfg.instances["primary"].name, "primary");
        assert_eq!(cfg.instances["primary"].port, 61617);
        assert_eq!(cfg.instances["backup"].name, "backup");
    }

    #[test]
    fn unset_fields_keep_defaults() {
        let cfg = ProvisionerConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(cfg.service_base, "activemq");
        assert!(cfg.service_enable);
        assert_eq!(cfg.service_ensure, ServiceEnsure::Stopped);
        assert_eq!(cfg.instance_dir("primary"), PathBuf::from("/srv/artemis/primary"));
        assert_eq!(cfg.service_unit("primary"), "activemq@primary");
    }

    #[test]
    fn selecting_unknown_instance_fails() {
        let cfg = ProvisionerConfig::from_toml(SAMPLE).unwrap();
        assert!(cfg.instance_specs(&["nope".to_string()]).is_err());
        assert_eq!(cfg.instance_specs(&[]).unwrap().len(), 2);
    }

    #[test]
    fn missing_path_means_defaults() {
        let cfg = ProvisionerConfig::load_or_default(None::<&Path>).unwrap();
        assert!(cfg.instances.is_empty());
        assert_eq!(cfg.installer_timeout(), Duration::from_secs(300));
    }
}
