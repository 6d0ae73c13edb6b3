pub mod acceptor;
pub mod errors;
pub mod instance;
pub mod plugin;
pub mod service_state;
mod utils;

// Public re-exports for easy access
pub use acceptor::{normalize_acceptors, AcceptorEntry, AcceptorMap};
pub use errors::ConfigError;
pub use instance::{
    Address, BroadcastGroup, Connector, DiscoveryGroup, HaPolicy, InstanceSpec, JournalType,
    MessageLoadBalancing, Role, RoutingType, Secret,
};
pub use plugin::{normalize_plugins, PluginEntry, PluginMap};
pub use service_state::{effective_state, EffectiveServiceState, ServiceEnsure, ServiceOverride};

/// Raw, user-supplied nested mapping (acceptors, plugins) as it arrives from
/// the configuration file. Key order is preserved.
pub type RawMap = serde_json::Map<String, serde_json::Value>;
