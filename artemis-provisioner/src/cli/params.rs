use std::path::PathBuf;
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "artemis-provisioner", about = "Creates and reconfigures broker instances on this host")]
pub struct Params {
    /// Provisioner config (TOML). Built-in defaults without it.
    #[arg(long, env = "ARTEMIS_PROVISIONER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only reconcile these instances.
    #[arg(long = "instance", env = "ARTEMIS_INSTANCES", value_delimiter = ',')]
    pub instances: Vec<String>,

    /// Host identity matched against `target_host`; discovered when unset.
    #[arg(long, env = "ARTEMIS_HOST_FQDN")]
    pub host_fqdn: Option<String>,

    #[arg(long, env = "ARTEMIS_DRY_RUN")]
    pub dry_run: bool,

    #[arg(long, env = "ARTEMIS_LOG_LEVEL", default_value = "info")]
    pub log_level: tracing::Level,

    #[arg(long, env = "ARTEMIS_REPORT", value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,
}
