use std::path::{Path, PathBuf};
use artemis_spec::{effective_state, normalize_acceptors, normalize_plugins, InstanceSpec};
use chrono::Utc;
use tracing::{debug, info, warn};
use crate::core::applicability::applies;
use crate::core::artifact::{self, Ownership};
use crate::core::error::ProvisionError;
use crate::core::host::HostFacts;
use crate::core::installer::{exists, CreationOutcome, Installer};
use crate::core::render::{self, ArtifactKind, InstanceLayout, RenderInputs, TemplateRenderer};
use crate::core::report::{PassOutcome, PassReport};
use crate::core::service::{self, ServiceManager};
use crate::ProvisionerConfig;

/// Runs reconciliation passes. One pass is a fixed sequence:
/// applicability, creation, normalization, rendering, service state.
/// A pass that fails after committing changed configs leaves a restart
/// marker behind, so the retry still restarts the service.
pub struct Provisioner<R, S> {
    config: ProvisionerConfig,
    installer: Installer,
    renderer: R,
    services: S,
    dry_run: bool,
}

impl<R: TemplateRenderer, S: ServiceManager> Provisioner<R, S> {
    pub fn new(config: ProvisionerConfig, renderer: R, services: S) -> Self {
        let installer = Installer::new(&config.installer_path, config.installer_timeout());
        Self {
            config,
            installer,
            renderer,
            services,
            dry_run: false,
        }
    }

    /// Use a custom installer, e.g. with a shorter timeout.
    pub fn with_installer(mut self, installer: Installer) -> Self {
        self.installer = installer;
        self
    }

    /// Plan and diff only: no installer run, no writes, no service commands.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn services(&self) -> &S {
        &self.services
    }

    pub fn instance_dir(&self, name: &str) -> PathBuf {
        self.config.instance_dir(name)
    }

    pub async fn reconcile(
        &self,
        spec: &InstanceSpec,
        host: &HostFacts,
    ) -> Result<PassReport, ProvisionError> {
        let started_at = Utc::now();
        let instance = spec.name.as_str();

        if !applies(spec.target_host.as_deref(), &host.fqdn) {
            info!(instance, target = ?spec.target_host, host = %host.fqdn, "instance targets another host, skipping");
            return Ok(PassReport::skipped(instance, &host.fqdn, started_at));
        }

        let layout = InstanceLayout::new(self.instance_dir(instance));

        let creation = if self.dry_run {
            self.installer.plan(layout.instance_dir())
        } else {
            self.installer.create(spec, layout.instance_dir()).await?
        };
        debug!(instance, ?creation, "creation step done");
        if creation == CreationOutcome::InstallerMissing && !exists(layout.instance_dir()) {
            // Writing configs here would fake an instance the installer
            // never created and hide it from the existence check for good.
            warn!(instance, "instance not created and no installer available, deferring");
            return Ok(PassReport::deferred(instance, &host.fqdn, self.dry_run, started_at));
        }

        let validation = |source| ProvisionError::Validation {
            instance: instance.to_string(),
            source,
        };
        let acceptors = normalize_acceptors(&spec.acceptors).map_err(validation)?;
        let plugins = normalize_plugins(&spec.plugins).map_err(validation)?;
        debug!(instance, acceptors = ?acceptors.names(), plugins = ?plugins.names(), "configuration normalized");

        // Render everything before touching disk so a failing template
        // leaves the previous artifacts in place.
        let inputs = RenderInputs {
            spec,
            acceptors: &acceptors,
            plugins: &plugins,
            layout: &layout,
        };
        let mut rendered = Vec::with_capacity(ArtifactKind::ALL.len());
        for kind in ArtifactKind::ALL {
            let data = render::assemble(kind, inputs);
            let text = self
                .renderer
                .render(kind, &data)
                .map_err(|e| ProvisionError::Render {
                    instance: instance.to_string(),
                    artifact: kind,
                    reason: e.to_string(),
                })?;
            rendered.push((kind, text));
        }

        let owner = if self.config.manage_ownership && !self.dry_run {
            Ownership::resolve(&self.config.owner, &self.config.group).map_err(|reason| {
                ProvisionError::Ownership {
                    instance: instance.to_string(),
                    reason,
                }
            })?
        } else {
            None
        };

        let artifact_error = |path: &Path, source| ProvisionError::Artifact {
            instance: instance.to_string(),
            path: path.to_path_buf(),
            source,
        };
        let mut artifacts = Vec::with_capacity(rendered.len());
        for (kind, text) in &rendered {
            let path = layout.artifact_path(*kind);
            let report = artifact::diff(*kind, &path, text.as_bytes())
                .map_err(|source| artifact_error(&path, source))?;
            artifacts.push(report);
        }

        let marker = layout.restart_marker();
        let restart_owed = artifact::restart_pending(&marker);
        let config_changed = artifacts.iter().any(|a| a.changed);
        if config_changed {
            info!(instance, "configuration changed");
        } else if restart_owed {
            info!(instance, "restart still pending from an earlier pass");
        }

        if !self.dry_run {
            if config_changed {
                artifact::mark_restart_pending(&marker)
                    .map_err(|source| artifact_error(&marker, source))?;
            }
            for (report, (_, text)) in artifacts.iter().zip(&rendered) {
                artifact::commit(report, text.as_bytes(), owner)
                    .map_err(|source| artifact_error(&report.path, source))?;
            }
        }

        let state = effective_state(spec.service_override(), self.config.service_defaults());
        let unit = self.config.service_unit(instance);
        let service = service::reconcile(
            &self.services,
            &unit,
            state,
            config_changed || restart_owed,
            self.dry_run,
        )
        .await
        .map_err(|source| {
            warn!(instance, unit = %unit, "service reconciliation failed; configs stay written");
            ProvisionError::Service {
                instance: instance.to_string(),
                unit: unit.clone(),
                source,
            }
        })?;
        if !self.dry_run {
            artifact::clear_restart_pending(&marker)
                .map_err(|source| artifact_error(&marker, source))?;
        }

        Ok(PassReport {
            instance: instance.to_string(),
            host: host.fqdn.clone(),
            outcome: PassOutcome::Applied,
            dry_run: self.dry_run,
            creation: Some(creation),
            artifacts,
            service: Some(service),
            started_at,
            finished_at: Utc::now(),
        })
    }
}
