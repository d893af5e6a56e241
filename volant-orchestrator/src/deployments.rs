//! Deployments: named desired-state records asking for N identical
//! replica VMs, named `{deployment}-{index}` with dense index packing so a
//! scale-down-then-up never leaves a gap. Reconciliation is triggered
//! synchronously after every mutation and once per deployment at engine
//! startup (`Engine::start`) rather than run as a perpetual per-deployment
//! loop — a deployment with no pending mutation has nothing to reconcile.

use std::time::Duration;

use tracing::{error, warn};

use volant_core::config::VmConfigOverride;
use volant_core::deployment::{CreateDeploymentRequest, Deployment, ListDeploymentsResponse, ScaleDeploymentRequest};
use volant_core::manifest::Plugin;
use volant_core::{Error, Result};

use crate::engine::{validate_vm_name, Engine};
use crate::merge;

/// Base retry delay for a failed replica create; doubled per attempt and
/// capped at `RETRY_CAP`. Retries indefinitely — reconciliation is a
/// background loop with no caller waiting on a result, so a plugin that's
/// actually broken just logs a warning every 30s instead of abandoning the
/// deployment under-replicated.
const RETRY_BASE: Duration = Duration::from_millis(250);
const RETRY_CAP: Duration = Duration::from_secs(30);

impl Engine {
    pub async fn create_deployment(&self, req: CreateDeploymentRequest) -> Result<Deployment> {
        validate_vm_name(&req.name)?;

        let plugin = self
            .registry
            .get(&req.plugin)
            .await
            .ok_or_else(|| Error::not_found(format!("plugin {}", req.plugin)))?;
        if !plugin.enabled {
            return Err(Error::validation(format!("plugin {} is disabled", req.plugin)));
        }
        // Validate the base config resolves against the manifest before
        // persisting anything — a bad base config should fail the request,
        // not surface later as a silently under-replicated deployment.
        merge::resolve(&plugin.manifest, &req.base_config)?;

        {
            let _guard = self.deployment_locks.lock(&req.name).await;
            volant_store::deployments::create(self.store.pool(), &req.name, &req.plugin, &req.base_config, req.replicas)
                .await?;
        }

        self.reconcile(req.name.clone()).await;
        self.get_deployment(&req.name).await
    }

    pub async fn get_deployment(&self, name: &str) -> Result<Deployment> {
        volant_store::deployments::get_by_name(self.store.pool(), name)
            .await?
            .ok_or_else(|| Error::not_found(format!("deployment {name}")))
    }

    pub async fn list_deployments(&self) -> Result<ListDeploymentsResponse> {
        let deployments = volant_store::deployments::list(self.store.pool()).await?;
        let total = deployments.len() as i64;
        Ok(ListDeploymentsResponse { deployments, total })
    }

    pub async fn scale_deployment(&self, name: &str, req: ScaleDeploymentRequest) -> Result<Deployment> {
        {
            let _guard = self.deployment_locks.lock(name).await;
            volant_store::deployments::update_replicas(self.store.pool(), name, req.replicas).await?;
        }

        self.reconcile(name.to_string()).await;
        self.get_deployment(name).await
    }

    /// Destroys every replica (best-effort, one failure doesn't block the
    /// rest) then removes the deployment record itself.
    pub async fn delete_deployment(&self, name: &str) -> Result<()> {
        let _guard = self.deployment_locks.lock(name).await;
        let deployment = match volant_store::deployments::get_by_name(self.store.pool(), name).await? {
            Some(d) => d,
            None => return Ok(()),
        };

        let replicas = volant_store::vms::list_by_deployment(self.store.pool(), deployment.id).await?;
        for vm in replicas {
            if let Err(e) = self.destroy_vm(&vm.name).await {
                warn!(deployment = %name, vm = %vm.name, error = %e, "failed to destroy replica during deployment delete");
            }
        }

        volant_store::deployments::delete(self.store.pool(), name).await?;
        Ok(())
    }

    pub(crate) fn spawn_reconcile(&self, name: String) {
        let engine = self.clone();
        tokio::spawn(async move {
            engine.reconcile(name).await;
        });
    }

    /// Brings the replica count in line with `desired_replicas`, packing
    /// indices densely: a scale-down frees the highest indices, a later
    /// scale-up reuses the lowest free ones first rather than growing the
    /// suffix without bound.
    pub(crate) async fn reconcile(&self, name: String) {
        let _guard = self.deployment_locks.lock(&name).await;

        let deployment = match volant_store::deployments::get_by_name(self.store.pool(), &name).await {
            Ok(Some(d)) => d,
            Ok(None) => return,
            Err(e) => {
                error!(deployment = %name, error = %e, "reconcile: failed to load deployment");
                return;
            }
        };

        let plugin = match self.registry.get(&deployment.plugin).await {
            Some(p) => p,
            None => {
                error!(deployment = %name, plugin = %deployment.plugin, "reconcile: plugin not found, skipping");
                return;
            }
        };

        let current = match volant_store::vms::list_by_deployment(self.store.pool(), deployment.id).await {
            Ok(vms) => vms,
            Err(e) => {
                error!(deployment = %name, error = %e, "reconcile: failed to list replicas");
                return;
            }
        };

        let prefix = format!("{name}-");
        let mut indices: Vec<u32> = current
            .iter()
            .filter_map(|vm| vm.name.strip_prefix(prefix.as_str()))
            .filter_map(|suffix| suffix.parse::<u32>().ok())
            .collect();
        indices.sort_unstable();

        let desired = deployment.desired_replicas;
        let actual = indices.len() as u32;

        if actual < desired {
            self.grow_replicas(&name, &plugin, &deployment.base_config, deployment.id, &indices, desired - actual)
                .await;
        } else if actual > desired {
            self.shrink_replicas(&name, &indices, actual - desired).await;
        }
    }

    async fn grow_replicas(
        &self,
        deployment_name: &str,
        plugin: &Plugin,
        base_config: &VmConfigOverride,
        deployment_id: i64,
        existing_indices: &[u32],
        count: u32,
    ) {
        let mut used = existing_indices.iter().copied();
        let mut next_used = used.next();
        let mut candidate = 1u32;
        let mut remaining = count;

        while remaining > 0 {
            while next_used == Some(candidate) {
                candidate += 1;
                next_used = used.next();
            }

            let replica_name = format!("{deployment_name}-{candidate}");
            self.create_replica_with_backoff(&replica_name, plugin, base_config, deployment_id).await;

            candidate += 1;
            remaining -= 1;
        }
    }

    async fn shrink_replicas(&self, deployment_name: &str, existing_indices: &[u32], count: u32) {
        let mut doomed: Vec<u32> = existing_indices.to_vec();
        doomed.sort_unstable_by(|a, b| b.cmp(a));

        for index in doomed.into_iter().take(count as usize) {
            let replica_name = format!("{deployment_name}-{index}");
            if let Err(e) = self.destroy_vm(&replica_name).await {
                warn!(deployment = %deployment_name, vm = %replica_name, error = %e, "reconcile: failed to destroy excess replica");
            }
        }
    }

    async fn create_replica_with_backoff(
        &self,
        replica_name: &str,
        plugin: &Plugin,
        base_config: &VmConfigOverride,
        deployment_id: i64,
    ) {
        let mut delay = RETRY_BASE;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let outcome = {
                let _guard = self.vm_locks.lock(replica_name).await;
                self.create_vm_locked(replica_name, plugin, base_config.clone(), Some(deployment_id)).await
            };

            match outcome {
                Ok(_) => return,
                Err(e) => {
                    warn!(vm = %replica_name, attempt, error = %e, "reconcile: replica create failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(RETRY_CAP);
                }
            }
        }
    }
}
