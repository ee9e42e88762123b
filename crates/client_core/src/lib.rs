use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{ComposedMachine, Domain, Pod, PodId, PowerType, ResourcePool, Zone},
    protocol::{ComposeParams, PodEvent},
};
use thiserror::Error;
use tokio::sync::broadcast;

pub mod fixture;
mod reporting;
pub mod validation;

pub use fixture::{Fixture, FixtureBackend};
pub use reporting::ReportingErrorService;
pub use validation::HostnameValidator;

/// Managers whose baseline data a view waits on before it renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerKind {
    Pods,
    General,
    Users,
    Domains,
    Zones,
    Machines,
    ResourcePools,
}

impl ManagerKind {
    pub fn name(self) -> &'static str {
        match self {
            ManagerKind::Pods => "pods",
            ManagerKind::General => "general",
            ManagerKind::Users => "users",
            ManagerKind::Domains => "domains",
            ManagerKind::Zones => "zones",
            ManagerKind::Machines => "machines",
            ManagerKind::ResourcePools => "resource_pools",
        }
    }
}

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{kind} manager has not loaded its items")]
    NotLoaded { kind: &'static str },
    #[error("pod {0} does not exist")]
    PodNotFound(i64),
    #[error("pod {pod_id} is not composable")]
    NotComposable { pod_id: i64 },
    #[error("invalid compose request: {0}")]
    InvalidCompose(String),
}

#[async_trait]
pub trait ManagerLoader: Send + Sync {
    async fn load_managers(&self, managers: &[ManagerKind]) -> Result<()>;
}

#[async_trait]
pub trait PodsManager: Send + Sync {
    async fn active_item(&self) -> Option<Pod>;
    async fn set_active_item(&self, id: PodId) -> Result<Pod>;
    async fn update_item(&self, pod: Pod) -> Result<Pod>;
    async fn delete_item(&self, pod: &Pod) -> Result<()>;
    async fn refresh(&self, pod: &Pod) -> Result<Pod>;
    async fn compose(&self, params: ComposeParams) -> Result<ComposedMachine>;
    fn subscribe_events(&self) -> broadcast::Receiver<PodEvent>;
}

/// Catalog managers answer from their local item caches, so reads are
/// synchronous and always reflect the latest pushed state.
pub trait DomainsManager: Send + Sync {
    fn items(&self) -> Vec<Domain>;
    fn default_domain(&self) -> Option<Domain>;
}

pub trait ZonesManager: Send + Sync {
    fn items(&self) -> Vec<Zone>;
    fn default_zone(&self) -> Option<Zone>;
}

pub trait ResourcePoolsManager: Send + Sync {
    fn items(&self) -> Vec<ResourcePool>;
}

/// Power types are only reported while a rack controller is connected.
pub trait GeneralManager: Send + Sync {
    fn power_types(&self) -> Vec<PowerType>;
}

pub trait UsersManager: Send + Sync {
    fn is_super_user(&self) -> bool;
}

pub trait ValidationService: Send + Sync {
    fn validate_hostname(&self, hostname: &str) -> bool;
}

pub trait ErrorService: Send + Sync {
    fn raise_error(&self, error: &anyhow::Error);
}
