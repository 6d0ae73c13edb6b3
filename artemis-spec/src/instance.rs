use crate::service_state::{ServiceEnsure, ServiceOverride};
use crate::RawMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HaPolicy {
    #[default]
    LiveOnly,
    Replication,
    SharedStorage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Master,
    Slave,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalType {
    #[default]
    Asyncio,
    Mapped,
    Nio,
}

impl JournalType {
    /// Spelling the broker config expects.
    pub fn as_upper(&self) -> &'static str {
        match self {
            JournalType::Asyncio => "ASYNCIO",
            JournalType::Mapped => "MAPPED",
            JournalType::Nio => "NIO",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLoadBalancing {
    Off,
    Strict,
    #[default]
    OnDemand,
}

impl MessageLoadBalancing {
    pub fn as_upper(&self) -> &'static str {
        match self {
            MessageLoadBalancing::Off => "OFF",
            MessageLoadBalancing::Strict => "STRICT",
            MessageLoadBalancing::OnDemand => "ON_DEMAND",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingType {
    #[default]
    Anycast,
    Multicast,
}

/// Passthrough credential. Never printed by `Debug`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Connector {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BroadcastGroup {
    pub group_address: String,
    pub group_port: u16,
    #[serde(default = "default_broadcast_period")]
    pub broadcast_period: u64,
    #[serde(default)]
    pub connectors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryGroup {
    pub group_address: String,
    pub group_port: u16,
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Address {
    #[serde(default)]
    pub routing: RoutingType,
    /// Queues bound to the address; empty means one queue named after it.
    #[serde(default)]
    pub queues: Vec<String>,
}

fn default_broadcast_period() -> u64 {
    2000
}

fn default_refresh_timeout() -> u64 {
    10000
}

/// Declarative description of one broker instance. Immutable for the
/// duration of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstanceSpec {
    /// Filled from the key the instance is declared under.
    #[serde(skip)]
    pub name: String,

    pub bind: String,
    pub port: u16,
    pub web_bind: String,
    pub web_port: u16,

    pub ha_policy: HaPolicy,
    pub role: Role,
    pub failover_on_shutdown: bool,
    pub allow_failback: bool,
    pub check_for_live_server: bool,
    /// Initial replication sync timeout, milliseconds.
    pub replication_timeout: u64,

    pub journal_type: JournalType,
    /// Nanoseconds.
    pub journal_buffer_timeout: u64,
    pub journal_datasync: bool,
    pub journal_max_io: u32,

    pub acceptors: RawMap,
    pub connectors: BTreeMap<String, Connector>,
    pub broadcast_groups: BTreeMap<String, BroadcastGroup>,
    pub discovery_groups: BTreeMap<String, DiscoveryGroup>,
    pub cluster_name: String,
    /// Connector the cluster connection advertises. First connector if unset.
    pub cluster_connector: Option<String>,

    pub address_settings: BTreeMap<String, BTreeMap<String, Value>>,
    pub addresses: BTreeMap<String, Address>,
    pub max_hops: u32,
    pub message_load_balancing: MessageLoadBalancing,

    /// Percent of disk usage at which the broker blocks producers.
    pub max_disk_usage: u8,
    pub global_max_size: Option<String>,

    pub plugins: RawMap,
    pub log_levels: BTreeMap<String, String>,

    pub cluster_user: String,
    pub cluster_password: Secret,
    pub admin_user: String,
    pub admin_password: Secret,

    pub service_enable: Option<bool>,
    pub service_ensure: Option<ServiceEnsure>,

    /// Only provision on the host whose FQDN matches.
    pub target_host: Option<String>,
}

impl Default for InstanceSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            bind: "0.0.0.0".into(),
            port: 61616,
            web_bind: "localhost".into(),
            web_port: 8161,
            ha_policy: HaPolicy::default(),
            role: Role::default(),
            failover_on_shutdown: false,
            allow_failback: true,
            check_for_live_server: true,
            replication_timeout: 30000,
            journal_type: JournalType::default(),
            journal_buffer_timeout: 500000,
            journal_datasync: true,
            journal_max_io: 4096,
            acceptors: default_acceptors(),
            connectors: BTreeMap::new(),
            broadcast_groups: BTreeMap::new(),
            discovery_groups: BTreeMap::new(),
            cluster_name: "artemis-cluster".into(),
            cluster_connector: None,
            address_settings: default_address_settings(),
            addresses: default_addresses(),
            max_hops: 1,
            message_load_balancing: MessageLoadBalancing::default(),
            max_disk_usage: 90,
            global_max_size: None,
            plugins: RawMap::new(),
            log_levels: default_log_levels(),
            cluster_user: "artemis-cluster".into(),
            cluster_password: Secret::default(),
            admin_user: "admin".into(),
            admin_password: Secret::default(),
            service_enable: None,
            service_ensure: None,
            target_host: None,
        }
    }
}

impl InstanceSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// `None` when the instance overrides neither service field.
    pub fn service_override(&self) -> Option<ServiceOverride> {
        if self.service_enable.is_none() && self.service_ensure.is_none() {
            return None;
        }
        Some(ServiceOverride {
            enable: self.service_enable,
            ensure: self.service_ensure,
        })
    }

    /// The connector referenced by the cluster connection, if any.
    pub fn effective_cluster_connector(&self) -> Option<&str> {
        self.cluster_connector
            .as_deref()
            .or_else(|| self.connectors.keys().next().map(String::as_str))
    }
}

fn default_acceptors() -> RawMap {
    let mut acceptors = RawMap::new();
    acceptors.insert(
        "artemis".into(),
        json!({
            "port": 61616,
            "protocols": ["core", "amqp", "stomp", "hornetq", "mqtt", "openwire"],
        }),
    );
    acceptors
}

fn default_address_settings() -> BTreeMap<String, BTreeMap<String, Value>> {
    let catch_all = [
        ("dead-letter-address", json!("DLQ")),
        ("expiry-address", json!("ExpiryQueue")),
        ("redelivery-delay", json!(0)),
        ("max-size-bytes", json!(-1)),
        ("address-full-policy", json!("PAGE")),
        ("auto-create-queues", json!(true)),
        ("auto-create-addresses", json!(true)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    BTreeMap::from([("#".to_string(), catch_all)])
}

fn default_addresses() -> BTreeMap<String, Address> {
    BTreeMap::from([
        ("DLQ".to_string(), Address::default()),
        ("ExpiryQueue".to_string(), Address::default()),
    ])
}

fn default_log_levels() -> BTreeMap<String, String> {
    [
        ("root", "INFO"),
        ("org.apache.activemq.artemis.core.server", "INFO"),
        ("org.apache.activemq.artemis.journal", "INFO"),
        ("org.apache.activemq.artemis.utils", "INFO"),
        ("org.eclipse.jetty", "WARN"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
