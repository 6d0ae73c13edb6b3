pub mod core;
mod config;
pub mod runtime;

pub use config::ProvisionerConfig;
