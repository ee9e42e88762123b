//! View-state controller for a single pod detail view.
//!
//! Owns the edit buffers and the action menu and forwards user commands to
//! the pods manager. Upstream changes arrive as [`PodEvent`]s and are folded
//! in by the watchers, which never overwrite a name the user is still typing.

use std::sync::Arc;

use anyhow::Result;
use client_core::{
    DomainsManager, ErrorService, GeneralManager, ManagerKind, ManagerLoader, PodsManager,
    ResourcePoolsManager, UsersManager, ValidationService, ZonesManager,
};
use crossbeam_channel::{Sender, TrySendError};
use shared::{
    domain::{
        Domain, Pod, PodId, PowerType, ResourcePool, Zone, CAPABILITY_COMPOSABLE,
        CAPABILITY_ISCSI_STORAGE,
    },
    protocol::{ComposeParams, ComposeRequest, PodEvent, StorageKind, StorageSpec},
};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::controller::{
    actions::{ActionDescriptor, ActionKind, ActionSelection},
    compose::ComposeState,
    events::{ActionError, ControllerError, ShellEvent, PODS_PAGE, PODS_ROUTE},
};

pub const LOADING_TITLE: &str = "Loading...";

const REQUIRED_MANAGERS: [ManagerKind; 7] = [
    ManagerKind::Pods,
    ManagerKind::General,
    ManagerKind::Users,
    ManagerKind::Domains,
    ManagerKind::Zones,
    ManagerKind::Machines,
    ManagerKind::ResourcePools,
];

/// Collaborators the controller is wired with.
#[derive(Clone)]
pub struct PodDetailsServices {
    pub loader: Arc<dyn ManagerLoader>,
    pub pods: Arc<dyn PodsManager>,
    pub general: Arc<dyn GeneralManager>,
    pub users: Arc<dyn UsersManager>,
    pub domains: Arc<dyn DomainsManager>,
    pub zones: Arc<dyn ZonesManager>,
    pub pools: Arc<dyn ResourcePoolsManager>,
    pub validation: Arc<dyn ValidationService>,
    pub errors: Arc<dyn ErrorService>,
}

impl PodDetailsServices {
    /// Wires every manager slot to one backend.
    pub fn from_backend<B>(
        backend: Arc<B>,
        validation: Arc<dyn ValidationService>,
        errors: Arc<dyn ErrorService>,
    ) -> Self
    where
        B: ManagerLoader
            + PodsManager
            + GeneralManager
            + UsersManager
            + DomainsManager
            + ZonesManager
            + ResourcePoolsManager
            + 'static,
    {
        Self {
            loader: backend.clone(),
            pods: backend.clone(),
            general: backend.clone(),
            users: backend.clone(),
            domains: backend.clone(),
            zones: backend.clone(),
            pools: backend,
            validation,
            errors,
        }
    }
}

/// Point-in-time view of the catalog managers.
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub power_types: Vec<PowerType>,
    pub domains: Vec<Domain>,
    pub zones: Vec<Zone>,
    pub pools: Vec<ResourcePool>,
    pub default_domain: Option<Domain>,
    pub default_zone: Option<Zone>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameEdit {
    pub editing: bool,
    pub value: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SectionArea {
    #[default]
    Summary,
    Configuration,
}

pub struct PodDetailsController {
    services: PodDetailsServices,
    shell: Sender<ShellEvent>,
    loaded: bool,
    pod: Option<Pod>,
    action: ActionSelection,
    compose: ComposeState,
    section: SectionArea,
    machines_search: String,
    editing: bool,
    name: NameEdit,
    pod_events: Option<broadcast::Receiver<PodEvent>>,
}

impl PodDetailsController {
    pub fn new(services: PodDetailsServices, shell: Sender<ShellEvent>) -> Self {
        let controller = Self {
            services,
            shell,
            loaded: false,
            pod: None,
            action: ActionSelection::default(),
            compose: ComposeState::default(),
            section: SectionArea::default(),
            machines_search: "pod-id:=invalid".to_string(),
            editing: false,
            name: NameEdit::default(),
            pod_events: None,
        };
        controller.emit(ShellEvent::TitleChanged(LOADING_TITLE.to_string()));
        controller.emit(ShellEvent::PageChanged(PODS_PAGE));
        controller
    }

    fn emit(&self, event: ShellEvent) {
        match self.shell.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "shell event queue is full; dropping event");
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("shell event receiver dropped");
            }
        }
    }

    /// Loads the managers, resolves the pod named by the route and starts
    /// watching it. Failures go to the error service; the view stays
    /// unloaded.
    pub async fn activate(&mut self, route_id: &str) {
        if let Err(err) = self.services.loader.load_managers(&REQUIRED_MANAGERS).await {
            let err = err.context("failed to load pod details managers");
            self.services.errors.raise_error(&err);
            return;
        }

        let id = match parse_route_id(route_id) {
            Ok(id) => id,
            Err(err) => {
                self.services.errors.raise_error(&anyhow::Error::from(err));
                return;
            }
        };

        let pod = match self.services.pods.active_item().await {
            Some(active) if active.id == id => active,
            _ => match self.services.pods.set_active_item(id).await {
                Ok(pod) => pod,
                Err(err) => {
                    self.services.errors.raise_error(&err);
                    return;
                }
            },
        };

        info!(pod = pod.id.0, name = %pod.name, "pod details loaded");
        self.machines_search = format!("pod-id:={}", pod.id.0);
        self.pod = Some(pod);
        self.loaded = true;
        self.start_watching();
    }

    fn start_watching(&mut self) {
        self.pod_events = Some(self.services.pods.subscribe_events());
        self.on_name_changed();
        self.on_capabilities_changed();
    }

    /// Applies every pending upstream pod event. Returns how many applied.
    pub fn pump_events(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let Some(events) = self.pod_events.as_mut() else {
                break;
            };
            match events.try_recv() {
                Ok(event) => {
                    self.apply_pod_event(event);
                    applied += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "pod event stream lagged");
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => {
                    self.pod_events = None;
                    break;
                }
            }
        }
        applied
    }

    pub fn apply_pod_event(&mut self, event: PodEvent) {
        match event {
            PodEvent::Updated(pod) => self.adopt_pod(pod),
            PodEvent::Deleted(id) => {
                if self.pod.as_ref().is_some_and(|pod| pod.id == id) {
                    debug!(pod = id.0, "viewed pod was deleted upstream");
                }
            }
        }
    }

    fn adopt_pod(&mut self, pod: Pod) {
        let Some(current) = self.pod.as_mut() else {
            return;
        };
        if current.id != pod.id {
            return;
        }

        let name_changed = current.name != pod.name;
        let capabilities_changed = current.capabilities != pod.capabilities;
        *current = pod;

        if name_changed {
            self.on_name_changed();
        }
        if capabilities_changed {
            self.on_capabilities_changed();
        }
    }

    fn on_name_changed(&mut self) {
        if let Some(pod) = &self.pod {
            self.emit(ShellEvent::TitleChanged(format!("Pod {}", pod.name)));
        }
        self.update_name();
    }

    fn on_capabilities_changed(&mut self) {
        if self.can_compose() {
            self.action.offer_first(ActionDescriptor::compose());
        } else {
            self.action.withdraw(ActionKind::Compose);
        }
    }

    fn on_option_changed(&mut self, previous: Option<ActionKind>) {
        if self.action.option != Some(ActionKind::Compose)
            || previous == Some(ActionKind::Compose)
        {
            return;
        }
        let Some(pod) = &self.pod else {
            return;
        };

        let request = &mut self.compose.request;
        request.domain = self.services.domains.default_domain().map(|d| d.id);
        request.zone = self.services.zones.default_zone().map(|z| z.id);
        request.pool = Some(pod.default_pool);
    }

    fn set_option(&mut self, option: Option<ActionKind>) {
        let previous = std::mem::replace(&mut self.action.option, option);
        self.on_option_changed(previous);
    }

    fn update_name(&mut self) {
        // An in-progress edit wins over upstream renames.
        if self.name.editing {
            return;
        }
        if let Some(pod) = &self.pod {
            self.name.value = pod.name.clone();
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn pod(&self) -> Option<&Pod> {
        self.pod.as_ref()
    }

    pub fn action(&self) -> &ActionSelection {
        &self.action
    }

    pub fn catalogs(&self) -> Catalogs {
        Catalogs {
            power_types: self.services.general.power_types(),
            domains: self.services.domains.items(),
            zones: self.services.zones.items(),
            pools: self.services.pools.items(),
            default_domain: self.services.domains.default_domain(),
            default_zone: self.services.zones.default_zone(),
        }
    }

    pub fn machines_search(&self) -> &str {
        &self.machines_search
    }

    pub fn section(&self) -> SectionArea {
        self.section
    }

    pub fn select_section(&mut self, area: SectionArea) {
        self.section = area;
    }

    pub fn is_super_user(&self) -> bool {
        self.services.users.is_super_user()
    }

    /// Power types are only reported by connected rack controllers, so an
    /// empty catalog stands in for "no rack controller".
    pub fn is_rack_controller_connected(&self) -> bool {
        !self.services.general.power_types().is_empty()
    }

    pub fn can_edit(&self) -> bool {
        self.is_rack_controller_connected() && self.is_super_user()
    }

    pub fn can_compose(&self) -> bool {
        match &self.pod {
            Some(pod) => self.is_super_user() && pod.has_capability(CAPABILITY_COMPOSABLE),
            None => false,
        }
    }

    /// Description of the pod's power type, or the raw type when unknown.
    pub fn pod_type_title(&self) -> Option<String> {
        let pod = self.pod.as_ref()?;
        let title = self
            .services
            .general
            .power_types()
            .into_iter()
            .find(|power_type| power_type.name == pod.pod_type)
            .map(|power_type| power_type.description)
            .unwrap_or_else(|| pod.pod_type.clone());
        Some(title)
    }

    pub fn is_editing_configuration(&self) -> bool {
        self.editing
    }

    pub fn edit_pod_configuration(&mut self) {
        if !self.can_edit() {
            return;
        }
        self.editing = true;
    }

    pub fn exit_edit_pod_configuration(&mut self) {
        self.editing = false;
    }

    pub fn name(&self) -> &NameEdit {
        &self.name
    }

    pub fn set_name_value(&mut self, value: impl Into<String>) {
        self.name.value = value.into();
    }

    pub fn edit_name(&mut self) {
        if !self.can_edit() || self.name.editing {
            return;
        }
        let Some(pod) = &self.pod else {
            return;
        };
        self.name.editing = true;
        self.name.value = pod.name.clone();
    }

    pub fn edit_name_invalid(&self) -> bool {
        if !self.name.editing {
            return false;
        }
        let value = &self.name.value;
        value.is_empty() || !self.services.validation.validate_hostname(value)
    }

    pub fn cancel_edit_name(&mut self) {
        self.name.editing = false;
        self.update_name();
    }

    pub async fn save_edit_name(&mut self) {
        if self.edit_name_invalid() {
            return;
        }
        self.name.editing = false;

        let Some(mut pod) = self.pod.clone() else {
            return;
        };
        pod.name = self.name.value.clone();
        self.update_pod(pod).await;
    }

    /// Submits `pod` to the pods manager. Failures are logged only; the name
    /// buffer is resynced either way.
    pub async fn update_pod(&mut self, pod: Pod) {
        match self.services.pods.update_item(pod).await {
            Ok(updated) => self.adopt_pod(updated),
            Err(err) => warn!("failed to update pod: {err:#}"),
        }
        self.update_name();
    }

    pub fn is_action_error(&self) -> bool {
        self.action.error.is_some()
    }

    pub fn action_option_changed(&mut self) {
        self.action.error = None;
    }

    /// Selects one of the offered actions. Returns false if `kind` is not
    /// on the menu.
    pub fn select_action(&mut self, kind: ActionKind) -> bool {
        if !self.action.offers(kind) {
            return false;
        }
        self.set_option(Some(kind));
        self.action_option_changed();
        true
    }

    pub fn action_cancel(&mut self) {
        self.action.option = None;
        self.action.error = None;
    }

    pub async fn action_go(&mut self) {
        let Some(kind) = self.action.option else {
            return;
        };
        let Some(pod) = self.pod.clone() else {
            return;
        };

        self.action.in_progress = true;
        self.emit(ShellEvent::ActionStarted(kind));
        debug!(action = kind.name(), pod = pod.id.0, "running pod action");

        let result = self.run_action(kind, &pod).await;
        self.action.in_progress = false;
        self.emit(ShellEvent::ActionFinished(kind));

        match result {
            Ok(()) => {
                if kind == ActionKind::Delete {
                    self.emit(ShellEvent::Navigate(PODS_ROUTE.to_string()));
                }
                if kind == ActionKind::Compose {
                    self.compose.reset();
                }
                self.action.option = None;
                self.action.error = None;
            }
            Err(err) => {
                warn!(action = kind.name(), "pod action failed: {err:#}");
                self.action.error = Some(ActionError::from_error(kind.error_context(), &err));
            }
        }
    }

    async fn run_action(&mut self, kind: ActionKind, pod: &Pod) -> Result<()> {
        let pods = Arc::clone(&self.services.pods);
        match kind {
            ActionKind::Refresh => {
                let refreshed = pods.refresh(pod).await?;
                self.adopt_pod(refreshed);
            }
            ActionKind::Delete => pods.delete_item(pod).await?,
            ActionKind::Compose => {
                let params = ComposeParams::from_request(pod.id, &self.compose.request);
                let machine = pods.compose(params).await?;
                info!(
                    pod = pod.id.0,
                    machine = %machine.system_id,
                    hostname = %machine.hostname,
                    "composed machine"
                );
            }
        }
        Ok(())
    }

    pub fn compose_state(&self) -> &ComposeState {
        &self.compose
    }

    pub fn compose_request_mut(&mut self) -> &mut ComposeRequest {
        &mut self.compose.request
    }

    pub fn compose_machine(&mut self) {
        self.set_option(Some(ActionKind::Compose));
    }

    /// Parameters a compose call would send right now. `None` until a pod
    /// is loaded.
    pub fn compose_pre_process(&self) -> Option<ComposeParams> {
        let pod = self.pod.as_ref()?;
        Some(self.compose.params(pod.id))
    }

    pub fn cancel_compose(&mut self) {
        self.compose.reset();
        self.action.option = None;
    }

    pub fn compose_add_storage(&mut self) {
        let kind = match &self.pod {
            Some(pod) if pod.has_capability(CAPABILITY_ISCSI_STORAGE) => StorageKind::Iscsi,
            _ => StorageKind::Local,
        };
        self.compose.add_storage(kind);
    }

    pub fn compose_set_boot_disk(&mut self, index: usize) -> bool {
        self.compose.set_boot_disk(index)
    }

    pub fn compose_remove_disk(&mut self, index: usize) -> Option<StorageSpec> {
        self.compose.remove_disk(index)
    }
}

/// Whole-string integer parse. Trailing garbage such as `12abc` or `1.5`
/// is rejected rather than truncated to a leading number.
fn parse_route_id(raw: &str) -> std::result::Result<PodId, ControllerError> {
    raw.trim()
        .parse::<i64>()
        .map(PodId)
        .map_err(|_| ControllerError::InvalidRouteId(raw.to_string()))
}

#[cfg(test)]
#[path = "tests/pod_details_tests.rs"]
mod tests;
