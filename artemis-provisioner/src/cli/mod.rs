use std::sync::Arc;
use anyhow::Context;
use artemis_provisioner::core::host::HostFacts;
use artemis_provisioner::core::orchestrator::Provisioner;
use artemis_provisioner::core::render::BuiltinTemplates;
use artemis_provisioner::core::service::SystemdServiceManager;
use artemis_provisioner::runtime;
use artemis_provisioner::ProvisionerConfig;
use tracing::info;

pub(crate) mod params;

use params::{Params, ReportFormat};

/// Runs one pass over the selected instances. Returns how many failed.
pub async fn start(params: Params) -> anyhow::Result<usize> {
    tracing_subscriber::fmt()
        .with_max_level(params.log_level)
        .with_target(false)
        .with_thread_ids(true)
        .compact()
        .init();

    info!("artemis-provisioner starting with params: {:?}", params);
    let config = ProvisionerConfig::load_or_default(params.config.as_ref())?;
    let specs = config.instance_specs(&params.instances)?;

    let host = match params.host_fqdn {
        Some(fqdn) => HostFacts::new(fqdn),
        None => HostFacts::discover().await.context("discovering host identity")?,
    };
    info!(host = %host.fqdn, instances = specs.len(), "reconciling");

    let provisioner = Provisioner::new(config, BuiltinTemplates, SystemdServiceManager::default())
        .dry_run(params.dry_run);
    let results = runtime::run_all(Arc::new(provisioner), specs, Arc::new(host)).await;

    let failures = results.iter().filter(|(_, r)| r.is_err()).count();
    match params.report {
        ReportFormat::Text => {
            for (_, result) in &results {
                match result {
                    Ok(report) => println!("{report}"),
                    Err(e) => println!("{e}"),
                }
            }
        }
        ReportFormat::Json => {
            let entries: Vec<serde_json::Value> = results
                .iter()
                .map(|(name, result)| match result {
                    Ok(report) => serde_json::json!({ "instance": name, "report": report }),
                    Err(e) => serde_json::json!({ "instance": name, "error": e.to_string() }),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }
    Ok(failures)
}
