/*
Data assembly for the three rendered artifacts.

Which normalized fields reach which artifact is decided here; turning a data
mapping into file text is the renderer's job. The mapping keys are the
contract with the templates: renaming one breaks rendering.
*/
use std::fmt;
use std::path::{Path, PathBuf};
use artemis_spec::{AcceptorMap, InstanceSpec, PluginMap};
use serde::Serialize;
use serde_json::{json, Map, Value};
use crate::core::error::RenderError;

mod templates;

pub use templates::BuiltinTemplates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Broker,
    Bootstrap,
    Logging,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Broker,
        ArtifactKind::Bootstrap,
        ArtifactKind::Logging,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Broker => "broker.xml",
            ArtifactKind::Bootstrap => "bootstrap.xml",
            ArtifactKind::Logging => "logging.properties",
        }
    }

    /// broker.xml carries the cluster password.
    pub fn mode(self) -> u32 {
        match self {
            ArtifactKind::Broker => 0o640,
            ArtifactKind::Bootstrap | ArtifactKind::Logging => 0o644,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Turns an assembled data mapping into file text.
pub trait TemplateRenderer {
    fn render(&self, kind: ArtifactKind, data: &Value) -> Result<String, RenderError>;
}

/// On-disk layout of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceLayout {
    instance_dir: PathBuf,
}

impl InstanceLayout {
    pub fn new(instance_dir: impl Into<PathBuf>) -> Self {
        Self {
            instance_dir: instance_dir.into(),
        }
    }

    pub fn instance_dir(&self) -> &Path {
        &self.instance_dir
    }

    pub fn etc_dir(&self) -> PathBuf {
        self.instance_dir.join("etc")
    }

    pub fn artifact_path(&self, kind: ArtifactKind) -> PathBuf {
        self.etc_dir().join(kind.file_name())
    }

    pub fn restart_marker(&self) -> PathBuf {
        self.etc_dir().join(".restart-pending")
    }
}

/// Normalized inputs for one pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderInputs<'a> {
    pub spec: &'a InstanceSpec,
    pub acceptors: &'a AcceptorMap,
    pub plugins: &'a PluginMap,
    pub layout: &'a InstanceLayout,
}

pub fn assemble(kind: ArtifactKind, inputs: RenderInputs<'_>) -> Value {
    match kind {
        ArtifactKind::Broker => broker_data(inputs.spec, inputs.acceptors, inputs.plugins),
        ArtifactKind::Bootstrap => bootstrap_data(inputs.spec, inputs.layout),
        ArtifactKind::Logging => logging_data(inputs.spec),
    }
}

pub fn broker_data(spec: &InstanceSpec, acceptors: &AcceptorMap, plugins: &PluginMap) -> Value {
    json!({
        "name": spec.name,
        "bind": spec.bind,
        "acceptors": acceptors.to_value(),
        "connectors": spec.connectors,
        "addresses": spec.addresses,
        "address_settings": spec.address_settings,
        "broadcast_groups": spec.broadcast_groups,
        "discovery_groups": spec.discovery_groups,
        "plugins": plugins.to_value(),
        "ha_policy": spec.ha_policy,
        "role": spec.role,
        "failover_on_shutdown": spec.failover_on_shutdown,
        "allow_failback": spec.allow_failback,
        "check_for_live_server": spec.check_for_live_server,
        "replication_timeout": spec.replication_timeout,
        "journal_type": spec.journal_type.as_upper(),
        "journal_buffer_timeout": spec.journal_buffer_timeout,
        "journal_datasync": spec.journal_datasync,
        "journal_max_io": spec.journal_max_io,
        "cluster_name": spec.cluster_name,
        "cluster_user": spec.cluster_user,
        "cluster_password": spec.cluster_password.expose(),
        "cluster_connector": spec.effective_cluster_connector(),
        "max_hops": spec.max_hops,
        "message_load_balancing": spec.message_load_balancing.as_upper(),
        "max_disk_usage": spec.max_disk_usage,
        "global_max_size": spec.global_max_size,
    })
}

pub fn bootstrap_data(spec: &InstanceSpec, layout: &InstanceLayout) -> Value {
    json!({
        "broker_config": layout.artifact_path(ArtifactKind::Broker).display().to_string(),
        "web_bind": spec.web_bind,
        "web_port": spec.web_port,
    })
}

pub fn logging_data(spec: &InstanceSpec) -> Value {
    let levels: Map<String, Value> = spec
        .log_levels
        .iter()
        .map(|(logger, level)| (logger.clone(), Value::from(level.to_uppercase())))
        .collect();
    json!({ "log_levels": levels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use artemis_spec::{normalize_acceptors, normalize_plugins};

    #[test]
    fn artifacts_live_under_etc() {
        let layout = InstanceLayout::new("/var/lib/artemis/primary");
        assert_eq!(
            layout.artifact_path(ArtifactKind::Logging),
            PathBuf::from("/var/lib/artemis/primary/etc/logging.properties")
        );
    }

    #[test]
    fn broker_data_upper_cases_enums() {
        let spec = InstanceSpec::named("primary");
        let acceptors = normalize_acceptors(&spec.acceptors).unwrap();
        let plugins = normalize_plugins(&spec.plugins).unwrap();
        let data = broker_data(&spec, &acceptors, &plugins);

        assert_eq!(data["journal_type"], "ASYNCIO");
        assert_eq!(data["message_load_balancing"], "ON_DEMAND");
        assert_eq!(data["ha_policy"], "live-only");
        assert_eq!(
            data["acceptors"]["artemis"]["protocols_list"],
            "CORE,AMQP,STOMP,HORNETQ,MQTT,OPENWIRE"
        );
        assert_eq!(data["cluster_connector"], Value::Null);
    }

    #[test]
    fn bootstrap_data_points_at_broker_config() {
        let spec = InstanceSpec::named("primary");
        let layout = InstanceLayout::new("/srv/primary");
        let data = bootstrap_data(&spec, &layout);
        assert_eq!(data["broker_config"], "/srv/primary/etc/broker.xml");
        assert_eq!(data["web_port"], 8161);
        assert_eq!(data.as_object().unwrap().len(), 3);
    }

    #[test]
    fn logging_data_carries_only_levels() {
        let mut spec = InstanceSpec::named("primary");
        spec.log_levels.insert("org.example".into(), "debug".into());
        let data = logging_data(&spec);
        assert_eq!(data["log_levels"]["org.example"], "DEBUG");
        assert_eq!(data.as_object().unwrap().len(), 1);
    }
}
