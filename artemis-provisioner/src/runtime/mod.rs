/*
Runs one reconciliation pass per instance.

Instances share no mutable state and write to private directories, so every
pass gets its own task. A failing or panicking instance never aborts the
others and is still reported under its own name.
*/
use std::sync::Arc;
use artemis_spec::InstanceSpec;
use tracing::{error, info};
use crate::core::error::ProvisionError;
use crate::core::host::HostFacts;
use crate::core::orchestrator::Provisioner;
use crate::core::render::TemplateRenderer;
use crate::core::report::PassReport;
use crate::core::service::ServiceManager;

pub type PassResult = (String, Result<PassReport, ProvisionError>);

/// Reconciles `specs` concurrently. Results come back sorted by instance.
pub async fn run_all<R, S>(
    provisioner: Arc<Provisioner<R, S>>,
    specs: Vec<InstanceSpec>,
    host: Arc<HostFacts>,
) -> Vec<PassResult>
where
    R: TemplateRenderer + Send + Sync + 'static,
    S: ServiceManager + Send + Sync + 'static,
{
    let mut tasks = Vec::with_capacity(specs.len());
    for spec in specs {
        let provisioner = Arc::clone(&provisioner);
        let host = Arc::clone(&host);
        let name = spec.name.clone();
        let handle = tokio::spawn(async move { provisioner.reconcile(&spec, &host).await });
        tasks.push((name, handle));
    }

    let mut results = Vec::with_capacity(tasks.len());
    for (name, handle) in tasks {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(ProvisionError::Aborted {
                instance: name.clone(),
                reason: e.to_string(),
            }),
        };
        match &result {
            Ok(report) => info!(instance = %name, "{report}"),
            Err(e) => error!(instance = %name, "reconciliation failed: {e}"),
        }
        results.push((name, result));
    }
    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}
