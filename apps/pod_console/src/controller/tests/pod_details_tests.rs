use super::*;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex as StdMutex,
};

use anyhow::anyhow;
use async_trait::async_trait;
use client_core::{Fixture, FixtureBackend, HostnameValidator, ReportingErrorService};
use crossbeam_channel::{unbounded, Receiver};
use shared::domain::{ComposedMachine, DomainId, PoolId, ZoneId};

use crate::controller::events::{ActionErrorCategory, ActionErrorContext};

#[derive(Default)]
struct CallCounts {
    set_active_item: AtomicUsize,
    update_item: AtomicUsize,
    delete_item: AtomicUsize,
    refresh: AtomicUsize,
    compose: AtomicUsize,
}

/// Delegates to the fixture backend unless told to fail.
struct ScriptedPods {
    inner: Arc<FixtureBackend>,
    calls: CallCounts,
    fail_update: StdMutex<Option<String>>,
    fail_actions: StdMutex<Option<String>>,
    composed: StdMutex<Vec<ComposeParams>>,
}

impl ScriptedPods {
    fn new(inner: Arc<FixtureBackend>) -> Self {
        Self {
            inner,
            calls: CallCounts::default(),
            fail_update: StdMutex::new(None),
            fail_actions: StdMutex::new(None),
            composed: StdMutex::new(Vec::new()),
        }
    }

    fn fail_update(&self, message: &str) {
        *self.fail_update.lock().expect("lock") = Some(message.to_string());
    }

    fn fail_actions(&self, message: &str) {
        *self.fail_actions.lock().expect("lock") = Some(message.to_string());
    }

    fn action_failure(&self) -> Option<anyhow::Error> {
        self.fail_actions
            .lock()
            .expect("lock")
            .clone()
            .map(|message| anyhow!(message))
    }

    fn operations_run(&self) -> usize {
        self.calls.delete_item.load(Ordering::SeqCst)
            + self.calls.refresh.load(Ordering::SeqCst)
            + self.calls.compose.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PodsManager for ScriptedPods {
    async fn active_item(&self) -> Option<Pod> {
        self.inner.active_item().await
    }

    async fn set_active_item(&self, id: PodId) -> Result<Pod> {
        self.calls.set_active_item.fetch_add(1, Ordering::SeqCst);
        self.inner.set_active_item(id).await
    }

    async fn update_item(&self, pod: Pod) -> Result<Pod> {
        self.calls.update_item.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_update.lock().expect("lock").clone() {
            return Err(anyhow!(message));
        }
        self.inner.update_item(pod).await
    }

    async fn delete_item(&self, pod: &Pod) -> Result<()> {
        self.calls.delete_item.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.action_failure() {
            return Err(err);
        }
        self.inner.delete_item(pod).await
    }

    async fn refresh(&self, pod: &Pod) -> Result<Pod> {
        self.calls.refresh.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.action_failure() {
            return Err(err);
        }
        self.inner.refresh(pod).await
    }

    async fn compose(&self, params: ComposeParams) -> Result<ComposedMachine> {
        self.calls.compose.fetch_add(1, Ordering::SeqCst);
        self.composed.lock().expect("lock").push(params.clone());
        if let Some(err) = self.action_failure() {
            return Err(err);
        }
        self.inner.compose(params).await
    }

    fn subscribe_events(&self) -> broadcast::Receiver<PodEvent> {
        self.inner.subscribe_events()
    }
}

/// Domain catalog whose default can be switched while a view is open.
struct SwitchableDomains {
    domains: StdMutex<Vec<Domain>>,
}

impl SwitchableDomains {
    fn new(domains: Vec<Domain>) -> Self {
        Self {
            domains: StdMutex::new(domains),
        }
    }

    fn make_default(&self, id: DomainId) {
        for domain in self.domains.lock().expect("lock").iter_mut() {
            domain.is_default = domain.id == id;
        }
    }
}

impl DomainsManager for SwitchableDomains {
    fn items(&self) -> Vec<Domain> {
        self.domains.lock().expect("lock").clone()
    }

    fn default_domain(&self) -> Option<Domain> {
        self.items().into_iter().find(|domain| domain.is_default)
    }
}

struct FailingLoader;

#[async_trait]
impl ManagerLoader for FailingLoader {
    async fn load_managers(&self, _managers: &[ManagerKind]) -> Result<()> {
        Err(anyhow!("websocket connection refused"))
    }
}

struct Harness {
    controller: PodDetailsController,
    backend: Arc<FixtureBackend>,
    pods: Arc<ScriptedPods>,
    errors: Arc<ReportingErrorService>,
    shell: Receiver<ShellEvent>,
}

impl Harness {
    fn new(fixture: Fixture) -> Self {
        Self::with_loader(fixture, None)
    }

    fn with_loader(fixture: Fixture, loader: Option<Arc<dyn ManagerLoader>>) -> Self {
        Self::with_services(fixture, |services| {
            if let Some(loader) = loader {
                services.loader = loader;
            }
        })
    }

    fn with_services(fixture: Fixture, configure: impl FnOnce(&mut PodDetailsServices)) -> Self {
        let backend = FixtureBackend::new(fixture);
        let pods = Arc::new(ScriptedPods::new(backend.clone()));
        let errors = Arc::new(ReportingErrorService::new());
        let mut services = PodDetailsServices::from_backend(
            backend.clone(),
            Arc::new(HostnameValidator),
            errors.clone(),
        );
        services.pods = pods.clone();
        configure(&mut services);
        let (shell_tx, shell) = unbounded();

        Self {
            controller: PodDetailsController::new(services, shell_tx),
            backend,
            pods,
            errors,
            shell,
        }
    }

    async fn activated(fixture: Fixture, route_id: &str) -> Self {
        let mut harness = Self::new(fixture);
        harness.controller.activate(route_id).await;
        harness
    }

    fn drain_shell(&self) -> Vec<ShellEvent> {
        self.shell.try_iter().collect()
    }
}

fn pod(id: i64, name: &str, capabilities: &[&str]) -> Pod {
    Pod {
        id: PodId(id),
        name: name.to_string(),
        pod_type: "virsh".to_string(),
        capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        default_pool: PoolId(5),
        architectures: Vec::new(),
    }
}

fn fixture(super_user: bool) -> Fixture {
    Fixture {
        super_user,
        power_types: vec![PowerType {
            name: "virsh".to_string(),
            description: "Virsh (virtual systems)".to_string(),
        }],
        domains: vec![Domain {
            id: DomainId(0),
            name: "maas".to_string(),
            is_default: true,
        }],
        zones: vec![Zone {
            id: ZoneId(1),
            name: "default".to_string(),
        }],
        pools: vec![ResourcePool {
            id: PoolId(5),
            name: "lab".to_string(),
        }],
        pods: vec![
            pod(1, "alpha", &["composable", "iscsi_storage"]),
            pod(2, "beta", &[]),
        ],
    }
}

fn offered(controller: &PodDetailsController) -> Vec<&'static str> {
    controller
        .action()
        .options
        .iter()
        .map(|option| option.name())
        .collect()
}

async fn push_update(harness: &mut Harness, pod: Pod) {
    harness.backend.update_item(pod).await.expect("upstream update");
    harness.controller.pump_events();
}

#[test]
fn new_controller_reports_loading_state() {
    let harness = Harness::new(fixture(true));

    assert_eq!(
        harness.drain_shell(),
        vec![
            ShellEvent::TitleChanged(LOADING_TITLE.to_string()),
            ShellEvent::PageChanged("pods"),
        ]
    );
    assert!(!harness.controller.is_loaded());
    assert!(harness.controller.pod().is_none());
    assert_eq!(harness.controller.machines_search(), "pod-id:=invalid");
    assert_eq!(harness.controller.section(), SectionArea::Summary);
    assert_eq!(offered(&harness.controller), vec!["refresh", "delete"]);
    assert!(!harness.controller.can_compose());
}

#[tokio::test]
async fn activate_loads_pod_and_starts_watching() {
    let harness = Harness::activated(fixture(true), "1").await;
    let controller = &harness.controller;

    assert!(controller.is_loaded());
    assert_eq!(controller.pod().map(|p| p.name.as_str()), Some("alpha"));
    assert_eq!(controller.machines_search(), "pod-id:=1");
    assert_eq!(controller.name().value, "alpha");
    assert_eq!(offered(controller), vec!["compose", "refresh", "delete"]);
    assert_eq!(controller.catalogs().pools.len(), 1);
    assert!(harness
        .drain_shell()
        .contains(&ShellEvent::TitleChanged("Pod alpha".to_string())));
    assert_eq!(harness.pods.calls.set_active_item.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn activate_reuses_matching_active_item() {
    let mut harness = Harness::new(fixture(true));
    harness
        .backend
        .load_managers(&[ManagerKind::Pods])
        .await
        .expect("load");
    harness.backend.set_active_item(PodId(2)).await.expect("active");

    harness.controller.activate("2").await;

    assert!(harness.controller.is_loaded());
    assert_eq!(harness.controller.pod().map(|p| p.id), Some(PodId(2)));
    assert_eq!(harness.pods.calls.set_active_item.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn activate_resolves_route_when_active_item_differs() {
    let mut harness = Harness::new(fixture(true));
    harness
        .backend
        .load_managers(&[ManagerKind::Pods])
        .await
        .expect("load");
    harness.backend.set_active_item(PodId(2)).await.expect("active");

    harness.controller.activate("1").await;

    assert_eq!(harness.controller.pod().map(|p| p.id), Some(PodId(1)));
    assert_eq!(harness.pods.calls.set_active_item.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn activate_reports_unknown_pod_to_error_service() {
    let harness = Harness::activated(fixture(true), "42").await;

    assert!(!harness.controller.is_loaded());
    assert_eq!(
        harness.errors.last_error().as_deref(),
        Some("pod 42 does not exist")
    );
    assert_eq!(harness.controller.machines_search(), "pod-id:=invalid");
}

#[tokio::test]
async fn activate_rejects_non_numeric_route() {
    let harness = Harness::activated(fixture(true), "abc").await;

    assert!(!harness.controller.is_loaded());
    let message = harness.errors.last_error().expect("error raised");
    assert!(message.contains("invalid pod id"), "{message}");
    assert_eq!(harness.pods.calls.set_active_item.load(Ordering::SeqCst), 0);
}

#[test]
fn route_ids_must_be_whole_integers() {
    assert_eq!(parse_route_id(" 12 ").expect("id"), PodId(12));
    for raw in ["12abc", "1.5", ""] {
        assert!(parse_route_id(raw).is_err(), "{raw:?}");
    }
}

#[tokio::test]
async fn activate_reports_loader_failure() {
    let mut harness = Harness::with_loader(fixture(true), Some(Arc::new(FailingLoader)));

    harness.controller.activate("1").await;

    assert!(!harness.controller.is_loaded());
    assert_eq!(
        harness.errors.last_error().as_deref(),
        Some("failed to load pod details managers: websocket connection refused")
    );
}

#[tokio::test]
async fn compose_requires_composable_capability_and_super_user() {
    let harness = Harness::activated(fixture(true), "2").await;
    assert!(!harness.controller.can_compose());
    assert_eq!(offered(&harness.controller), vec!["refresh", "delete"]);

    let harness = Harness::activated(fixture(false), "1").await;
    assert!(!harness.controller.can_compose());
    assert_eq!(offered(&harness.controller), vec!["refresh", "delete"]);
}

#[tokio::test]
async fn editing_requires_rack_controller_and_super_user() {
    let harness = Harness::activated(fixture(true), "1").await;
    assert!(harness.controller.is_rack_controller_connected());
    assert!(harness.controller.can_edit());

    let mut no_racks = fixture(true);
    no_racks.power_types.clear();
    let mut harness = Harness::activated(no_racks, "1").await;
    assert!(!harness.controller.is_rack_controller_connected());
    assert!(!harness.controller.can_edit());
    harness.controller.edit_name();
    harness.controller.edit_pod_configuration();
    assert!(!harness.controller.name().editing);
    assert!(!harness.controller.is_editing_configuration());

    let harness = Harness::activated(fixture(false), "1").await;
    assert!(!harness.controller.can_edit());
}

#[tokio::test]
async fn rack_controller_connecting_after_activation_enables_editing() {
    let mut no_racks = fixture(true);
    no_racks.power_types.clear();
    let mut harness = Harness::activated(no_racks, "1").await;
    assert!(!harness.controller.can_edit());
    assert_eq!(harness.controller.pod_type_title().as_deref(), Some("virsh"));

    harness.backend.set_power_types(vec![PowerType {
        name: "virsh".to_string(),
        description: "Virsh (virtual systems)".to_string(),
    }]);
    harness.controller.pump_events();

    assert!(harness.controller.is_rack_controller_connected());
    assert!(harness.controller.can_edit());
    assert_eq!(harness.controller.catalogs().power_types.len(), 1);
    assert_eq!(
        harness.controller.pod_type_title().as_deref(),
        Some("Virsh (virtual systems)")
    );
    harness.controller.edit_name();
    assert!(harness.controller.name().editing);

    harness.backend.set_power_types(Vec::new());
    assert!(!harness.controller.can_edit());
}

#[tokio::test]
async fn compose_seeds_the_current_default_domain() {
    let domains = Arc::new(SwitchableDomains::new(vec![
        Domain {
            id: DomainId(0),
            name: "maas".to_string(),
            is_default: true,
        },
        Domain {
            id: DomainId(7),
            name: "edge".to_string(),
            is_default: false,
        },
    ]));
    let live = domains.clone();
    let mut harness = Harness::with_services(fixture(true), |services| {
        services.domains = live;
    });
    harness.controller.activate("1").await;

    domains.make_default(DomainId(7));
    harness.controller.compose_machine();

    assert_eq!(
        harness.controller.compose_state().request.domain,
        Some(DomainId(7))
    );
}

#[tokio::test]
async fn configuration_editing_toggles() {
    let mut harness = Harness::activated(fixture(true), "1").await;

    harness.controller.edit_pod_configuration();
    assert!(harness.controller.is_editing_configuration());
    harness.controller.exit_edit_pod_configuration();
    assert!(!harness.controller.is_editing_configuration());
}

#[tokio::test]
async fn edit_name_keeps_value_when_already_editing() {
    let mut harness = Harness::activated(fixture(true), "1").await;

    harness.controller.edit_name();
    harness.controller.set_name_value("alpha-new");
    harness.controller.edit_name();

    assert!(harness.controller.name().editing);
    assert_eq!(harness.controller.name().value, "alpha-new");
}

#[tokio::test]
async fn upstream_rename_does_not_clobber_edit_in_progress() {
    let mut harness = Harness::activated(fixture(true), "1").await;
    harness.controller.edit_name();
    harness.controller.set_name_value("typed");
    harness.drain_shell();

    push_update(&mut harness, pod(1, "renamed", &["composable"])).await;

    assert_eq!(harness.controller.name().value, "typed");
    assert_eq!(
        harness.drain_shell(),
        vec![ShellEvent::TitleChanged("Pod renamed".to_string())]
    );

    harness.controller.cancel_edit_name();
    assert!(!harness.controller.name().editing);
    assert_eq!(harness.controller.name().value, "renamed");
}

#[tokio::test]
async fn upstream_rename_resyncs_name_when_not_editing() {
    let mut harness = Harness::activated(fixture(true), "1").await;

    push_update(&mut harness, pod(1, "renamed", &["composable"])).await;

    assert_eq!(harness.controller.name().value, "renamed");
}

#[tokio::test]
async fn edit_name_invalid_rules() {
    let mut harness = Harness::activated(fixture(true), "1").await;
    harness.controller.set_name_value("");
    assert!(!harness.controller.edit_name_invalid());

    harness.controller.edit_name();
    harness.controller.set_name_value("");
    assert!(harness.controller.edit_name_invalid());
    harness.controller.set_name_value("bad_name!");
    assert!(harness.controller.edit_name_invalid());
    harness.controller.set_name_value("good-name");
    assert!(!harness.controller.edit_name_invalid());
}

#[tokio::test]
async fn save_edit_name_submits_copy_with_new_name() {
    let mut harness = Harness::activated(fixture(true), "1").await;
    harness.controller.edit_name();
    harness.controller.set_name_value("gamma");
    harness.drain_shell();

    harness.controller.save_edit_name().await;

    assert!(!harness.controller.name().editing);
    assert_eq!(harness.controller.name().value, "gamma");
    assert_eq!(harness.controller.pod().map(|p| p.name.as_str()), Some("gamma"));
    assert_eq!(
        harness.drain_shell(),
        vec![ShellEvent::TitleChanged("Pod gamma".to_string())]
    );
    let stored = harness.backend.pods().await;
    assert_eq!(stored[0].name, "gamma");
    assert_eq!(stored[0].capabilities, vec!["composable", "iscsi_storage"]);
}

#[tokio::test]
async fn save_edit_name_does_nothing_when_invalid() {
    let mut harness = Harness::activated(fixture(true), "1").await;
    harness.controller.edit_name();
    harness.controller.set_name_value("-bad");

    harness.controller.save_edit_name().await;

    assert!(harness.controller.name().editing);
    assert_eq!(harness.pods.calls.update_item.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_save_resyncs_to_current_name() {
    let mut harness = Harness::activated(fixture(true), "1").await;
    harness.pods.fail_update("permission denied");
    harness.controller.edit_name();
    harness.controller.set_name_value("gamma");

    harness.controller.save_edit_name().await;

    assert!(!harness.controller.name().editing);
    assert_eq!(harness.controller.name().value, "alpha");
    assert!(!harness.controller.is_action_error());
    assert!(harness.errors.last_error().is_none());
}

#[tokio::test]
async fn select_action_only_accepts_offered_kinds() {
    let mut harness = Harness::activated(fixture(true), "2").await;

    assert!(!harness.controller.select_action(ActionKind::Compose));
    assert_eq!(harness.controller.action().option, None);
    assert!(harness.controller.select_action(ActionKind::Refresh));
    assert_eq!(
        harness.controller.action().selected().map(|d| d.title),
        Some("Refresh")
    );
}

#[tokio::test]
async fn cancelling_an_action_never_runs_it() {
    let mut harness = Harness::activated(fixture(true), "1").await;

    for kind in [ActionKind::Refresh, ActionKind::Delete, ActionKind::Compose] {
        assert!(harness.controller.select_action(kind));
        harness.controller.action_cancel();
        assert_eq!(harness.controller.action().option, None);
        harness.controller.action_go().await;
    }

    assert_eq!(harness.pods.operations_run(), 0);
    assert_eq!(harness.backend.pods().await.len(), 2);
}

#[tokio::test]
async fn successful_delete_navigates_to_listing() {
    let mut harness = Harness::activated(fixture(true), "2").await;
    harness.drain_shell();

    harness.controller.select_action(ActionKind::Delete);
    harness.controller.action_go().await;

    assert_eq!(
        harness.drain_shell(),
        vec![
            ShellEvent::ActionStarted(ActionKind::Delete),
            ShellEvent::ActionFinished(ActionKind::Delete),
            ShellEvent::Navigate("/pods".to_string()),
        ]
    );
    let action = harness.controller.action();
    assert_eq!(action.option, None);
    assert!(!action.in_progress);
    assert!(action.error.is_none());
    assert_eq!(harness.backend.pods().await.len(), 1);
}

#[tokio::test]
async fn successful_refresh_does_not_navigate() {
    let mut harness = Harness::activated(fixture(true), "1").await;
    harness.drain_shell();

    harness.controller.select_action(ActionKind::Refresh);
    harness.controller.action_go().await;

    assert_eq!(
        harness.drain_shell(),
        vec![
            ShellEvent::ActionStarted(ActionKind::Refresh),
            ShellEvent::ActionFinished(ActionKind::Refresh),
        ]
    );
    assert_eq!(harness.controller.action().option, None);
    assert_eq!(harness.pods.calls.refresh.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_action_keeps_selection_and_error() {
    let mut harness = Harness::activated(fixture(true), "1").await;
    harness.pods.fail_actions("pod 1 does not exist");
    harness.drain_shell();

    harness.controller.select_action(ActionKind::Delete);
    harness.controller.action_go().await;

    let action = harness.controller.action();
    assert_eq!(action.option, Some(ActionKind::Delete));
    assert!(!action.in_progress);
    let error = action.error.as_ref().expect("error");
    assert_eq!(error.message(), "pod 1 does not exist");
    assert_eq!(error.context(), ActionErrorContext::Delete);
    assert_eq!(error.category(), ActionErrorCategory::NotFound);
    assert!(harness.controller.is_action_error());
    assert_eq!(
        harness.drain_shell(),
        vec![
            ShellEvent::ActionStarted(ActionKind::Delete),
            ShellEvent::ActionFinished(ActionKind::Delete),
        ]
    );

    harness.controller.select_action(ActionKind::Refresh);
    assert!(!harness.controller.is_action_error());
}

#[tokio::test]
async fn capability_changes_toggle_compose_action() {
    let mut harness = Harness::activated(fixture(true), "1").await;
    assert_eq!(offered(&harness.controller), vec!["compose", "refresh", "delete"]);

    push_update(&mut harness, pod(1, "alpha", &[])).await;
    assert_eq!(offered(&harness.controller), vec!["refresh", "delete"]);

    push_update(&mut harness, pod(1, "alpha", &["composable"])).await;
    assert_eq!(offered(&harness.controller), vec!["compose", "refresh", "delete"]);
}

#[tokio::test]
async fn events_for_other_pods_are_ignored() {
    let mut harness = Harness::activated(fixture(true), "1").await;
    harness.drain_shell();

    push_update(&mut harness, pod(2, "other", &["composable"])).await;

    assert_eq!(harness.controller.pod().map(|p| p.name.as_str()), Some("alpha"));
    assert!(harness.drain_shell().is_empty());
}

#[tokio::test]
async fn choosing_compose_seeds_defaults_once() {
    let mut harness = Harness::activated(fixture(true), "1").await;

    harness.controller.compose_machine();
    let request = harness.controller.compose_state().request.clone();
    assert_eq!(request.domain, Some(DomainId(0)));
    assert_eq!(request.zone, Some(ZoneId(1)));
    assert_eq!(request.pool, Some(PoolId(5)));

    harness.controller.compose_request_mut().zone = Some(ZoneId(9));
    harness.controller.select_action(ActionKind::Compose);
    assert_eq!(harness.controller.compose_state().request.zone, Some(ZoneId(9)));
}

#[tokio::test]
async fn compose_pre_process_puts_boot_disk_first() {
    let mut harness = Harness::activated(fixture(true), "1").await;
    {
        let request = harness.controller.compose_request_mut();
        request.storage = vec![
            StorageSpec::new(StorageKind::Local, 8, false),
            StorageSpec::new(StorageKind::Local, 20, true),
        ];
    }

    let params = harness.controller.compose_pre_process().expect("params");

    assert_eq!(params.id, PodId(1));
    assert_eq!(params.storage, "0:20(local),1:8(local)");
    assert!(harness.controller.compose_state().storage()[1].boot);
}

#[test]
fn compose_pre_process_needs_a_pod() {
    let harness = Harness::new(fixture(true));

    assert!(harness.controller.compose_pre_process().is_none());
}

#[tokio::test]
async fn compose_go_sends_params_and_resets_buffer() {
    let mut harness = Harness::activated(fixture(true), "1").await;
    harness.controller.compose_machine();
    harness.controller.compose_add_storage();
    harness.controller.compose_set_boot_disk(1);

    harness.controller.action_go().await;

    let sent = harness.pods.composed.lock().expect("lock").clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].storage, "0:8(iscsi),1:8(local)");
    assert_eq!(sent[0].domain, Some(DomainId(0)));
    assert_eq!(harness.controller.action().option, None);
    assert_eq!(harness.controller.compose_state(), &ComposeState::default());
    assert_eq!(harness.backend.machines().await.len(), 1);
}

#[tokio::test]
async fn compose_add_storage_follows_pod_capabilities() {
    let mut harness = Harness::activated(fixture(true), "2").await;
    harness.controller.compose_add_storage();
    assert_eq!(
        harness.controller.compose_state().storage()[1].kind,
        StorageKind::Local
    );

    let mut harness = Harness::activated(fixture(true), "1").await;
    harness.controller.compose_add_storage();
    let added = &harness.controller.compose_state().storage()[1];
    assert_eq!(added.kind, StorageKind::Iscsi);
    assert_eq!(added.size, 8);
    assert!(!added.boot);
}

#[tokio::test]
async fn boot_disk_reassignment_leaves_one_boot_disk() {
    let mut harness = Harness::activated(fixture(true), "1").await;
    harness.controller.compose_add_storage();
    harness.controller.compose_add_storage();

    assert!(harness.controller.compose_set_boot_disk(2));
    let boots: Vec<bool> = harness
        .controller
        .compose_state()
        .storage()
        .iter()
        .map(|disk| disk.boot)
        .collect();
    assert_eq!(boots, vec![false, false, true]);

    let removed = harness.controller.compose_remove_disk(0).expect("removed");
    assert!(!removed.boot);
    assert_eq!(harness.controller.compose_state().storage().len(), 2);
}

#[tokio::test]
async fn cancel_compose_resets_buffer_and_selection() {
    let mut harness = Harness::activated(fixture(true), "1").await;
    harness.controller.compose_machine();
    harness.controller.compose_add_storage();

    harness.controller.cancel_compose();

    assert_eq!(harness.controller.action().option, None);
    assert_eq!(harness.controller.compose_state(), &ComposeState::default());
}

#[tokio::test]
async fn pod_type_title_prefers_power_type_description() {
    let harness = Harness::activated(fixture(true), "1").await;
    assert_eq!(
        harness.controller.pod_type_title().as_deref(),
        Some("Virsh (virtual systems)")
    );

    let mut unknown = fixture(true);
    unknown.pods[0].pod_type = "lxd".to_string();
    let harness = Harness::activated(unknown, "1").await;
    assert_eq!(harness.controller.pod_type_title().as_deref(), Some("lxd"));
}

#[tokio::test]
async fn section_selection_is_tracked() {
    let mut harness = Harness::activated(fixture(true), "1").await;

    harness.controller.select_section(SectionArea::Configuration);

    assert_eq!(harness.controller.section(), SectionArea::Configuration);
}
