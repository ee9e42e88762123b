//! In-process backend serving every manager contract from a JSON fixture.
//!
//! Mutations are applied to the local pod list and then published on the
//! pod event channel, the same way a region pushes notifications to a
//! connected client.

use std::{
    collections::HashSet,
    fs,
    path::Path,
    sync::{Arc, RwLock as StdRwLock},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{
        ComposedMachine, Domain, MachineId, Pod, PodId, PowerType, ResourcePool, Zone,
        CAPABILITY_COMPOSABLE,
    },
    protocol::{ComposeParams, PodEvent},
};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use crate::{
    DomainsManager, GeneralManager, ManagerError, ManagerKind, ManagerLoader, PodsManager,
    ResourcePoolsManager, UsersManager, ZonesManager,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub super_user: bool,
    pub power_types: Vec<PowerType>,
    pub domains: Vec<Domain>,
    pub zones: Vec<Zone>,
    pub pools: Vec<ResourcePool>,
    pub pods: Vec<Pod>,
}

impl Fixture {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture '{}'", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse fixture '{}'", path.display()))
    }
}

struct FixtureState {
    pods: Vec<Pod>,
    active: Option<PodId>,
    machines: Vec<ComposedMachine>,
}

pub struct FixtureBackend {
    super_user: bool,
    domains: Vec<Domain>,
    zones: Vec<Zone>,
    pools: Vec<ResourcePool>,
    power_types: StdRwLock<Vec<PowerType>>,
    loaded: StdRwLock<HashSet<ManagerKind>>,
    inner: RwLock<FixtureState>,
    events: broadcast::Sender<PodEvent>,
}

impl FixtureBackend {
    pub fn new(fixture: Fixture) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            super_user: fixture.super_user,
            domains: fixture.domains,
            zones: fixture.zones,
            pools: fixture.pools,
            power_types: StdRwLock::new(fixture.power_types),
            loaded: StdRwLock::new(HashSet::new()),
            inner: RwLock::new(FixtureState {
                pods: fixture.pods,
                active: None,
                machines: Vec::new(),
            }),
            events,
        })
    }

    pub async fn machines(&self) -> Vec<ComposedMachine> {
        self.inner.read().await.machines.clone()
    }

    pub async fn pods(&self) -> Vec<Pod> {
        self.inner.read().await.pods.clone()
    }

    /// Replaces the power types reported by the rack controllers. An empty
    /// list reads as "no rack controller connected".
    pub fn set_power_types(&self, power_types: Vec<PowerType>) {
        if let Ok(mut guard) = self.power_types.write() {
            info!(count = power_types.len(), "rack controller power types changed");
            *guard = power_types;
        }
    }

    fn is_loaded(&self, kind: ManagerKind) -> bool {
        self.loaded
            .read()
            .map(|loaded| loaded.contains(&kind))
            .unwrap_or(false)
    }

    fn ensure_pods_loaded(&self) -> Result<()> {
        if self.is_loaded(ManagerKind::Pods) {
            Ok(())
        } else {
            Err(ManagerError::NotLoaded {
                kind: ManagerKind::Pods.name(),
            }
            .into())
        }
    }

    fn publish(&self, event: PodEvent) {
        // No subscribers is fine; nobody is viewing.
        let _ = self.events.send(event);
    }
}

fn find_pod(state: &FixtureState, id: PodId) -> Result<&Pod> {
    state
        .pods
        .iter()
        .find(|pod| pod.id == id)
        .ok_or_else(|| ManagerError::PodNotFound(id.0).into())
}

#[async_trait]
impl ManagerLoader for FixtureBackend {
    async fn load_managers(&self, managers: &[ManagerKind]) -> Result<()> {
        let mut loaded = self
            .loaded
            .write()
            .map_err(|_| anyhow::anyhow!("fixture manager registry is poisoned"))?;
        for kind in managers {
            if loaded.insert(*kind) {
                debug!(manager = kind.name(), "loaded fixture manager");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PodsManager for FixtureBackend {
    async fn active_item(&self) -> Option<Pod> {
        let guard = self.inner.read().await;
        let id = guard.active?;
        guard.pods.iter().find(|pod| pod.id == id).cloned()
    }

    async fn set_active_item(&self, id: PodId) -> Result<Pod> {
        let mut guard = self.inner.write().await;
        self.ensure_pods_loaded()?;
        let pod = find_pod(&guard, id)?.clone();
        guard.active = Some(id);
        Ok(pod)
    }

    async fn update_item(&self, pod: Pod) -> Result<Pod> {
        let updated = {
            let mut guard = self.inner.write().await;
            self.ensure_pods_loaded()?;
            let slot = guard
                .pods
                .iter_mut()
                .find(|existing| existing.id == pod.id)
                .ok_or(ManagerError::PodNotFound(pod.id.0))?;
            *slot = pod;
            slot.clone()
        };
        info!(pod = updated.id.0, name = %updated.name, "pod updated");
        self.publish(PodEvent::Updated(updated.clone()));
        Ok(updated)
    }

    async fn delete_item(&self, pod: &Pod) -> Result<()> {
        {
            let mut guard = self.inner.write().await;
            self.ensure_pods_loaded()?;
            let before = guard.pods.len();
            guard.pods.retain(|existing| existing.id != pod.id);
            if guard.pods.len() == before {
                return Err(ManagerError::PodNotFound(pod.id.0).into());
            }
            if guard.active == Some(pod.id) {
                guard.active = None;
            }
        }
        info!(pod = pod.id.0, "pod deleted");
        self.publish(PodEvent::Deleted(pod.id));
        Ok(())
    }

    async fn refresh(&self, pod: &Pod) -> Result<Pod> {
        let current = {
            let guard = self.inner.read().await;
            self.ensure_pods_loaded()?;
            find_pod(&guard, pod.id)?.clone()
        };
        self.publish(PodEvent::Updated(current.clone()));
        Ok(current)
    }

    async fn compose(&self, params: ComposeParams) -> Result<ComposedMachine> {
        if params.storage.is_empty() {
            return Err(ManagerError::InvalidCompose("at least one disk is required".into()).into());
        }

        let (machine, pod) = {
            let mut guard = self.inner.write().await;
            self.ensure_pods_loaded()?;
            let pod = find_pod(&guard, params.id)?.clone();
            if !pod.has_capability(CAPABILITY_COMPOSABLE) {
                return Err(ManagerError::NotComposable { pod_id: pod.id.0 }.into());
            }

            let machine_id = MachineId(guard.machines.len() as i64 + 1);
            let hostname = params
                .hostname
                .clone()
                .unwrap_or_else(|| format!("{}-{}", pod.name, machine_id.0));
            let machine = ComposedMachine {
                system_id: format!("fx{:04}", machine_id.0),
                machine_id,
                pod_id: pod.id,
                hostname,
            };
            guard.machines.push(machine.clone());
            (machine, pod)
        };

        info!(
            pod = pod.id.0,
            machine = %machine.system_id,
            storage = %params.storage,
            "machine composed"
        );
        self.publish(PodEvent::Updated(pod));
        Ok(machine)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<PodEvent> {
        self.events.subscribe()
    }
}

impl DomainsManager for FixtureBackend {
    fn items(&self) -> Vec<Domain> {
        if !self.is_loaded(ManagerKind::Domains) {
            return Vec::new();
        }
        self.domains.clone()
    }

    fn default_domain(&self) -> Option<Domain> {
        if !self.is_loaded(ManagerKind::Domains) {
            return None;
        }
        self.domains
            .iter()
            .find(|domain| domain.is_default)
            .or_else(|| self.domains.first())
            .cloned()
    }
}

impl ZonesManager for FixtureBackend {
    fn items(&self) -> Vec<Zone> {
        if !self.is_loaded(ManagerKind::Zones) {
            return Vec::new();
        }
        self.zones.clone()
    }

    fn default_zone(&self) -> Option<Zone> {
        if !self.is_loaded(ManagerKind::Zones) {
            return None;
        }
        self.zones
            .iter()
            .find(|zone| zone.name == "default")
            .or_else(|| self.zones.first())
            .cloned()
    }
}

impl ResourcePoolsManager for FixtureBackend {
    fn items(&self) -> Vec<ResourcePool> {
        if !self.is_loaded(ManagerKind::ResourcePools) {
            return Vec::new();
        }
        self.pools.clone()
    }
}

impl GeneralManager for FixtureBackend {
    fn power_types(&self) -> Vec<PowerType> {
        if !self.is_loaded(ManagerKind::General) {
            return Vec::new();
        }
        self.power_types
            .read()
            .map(|power_types| power_types.clone())
            .unwrap_or_default()
    }
}

impl UsersManager for FixtureBackend {
    fn is_super_user(&self) -> bool {
        self.super_user
    }
}

#[cfg(test)]
#[path = "tests/fixture_tests.rs"]
mod tests;
