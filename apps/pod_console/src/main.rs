use std::{fmt::Write as _, path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{Fixture, FixtureBackend, HostnameValidator, ReportingErrorService};
use crossbeam_channel::bounded;
use shared::{
    domain::{DomainId, PoolId, ZoneId},
    protocol::{StorageKind, StorageSpec},
};
use tracing_subscriber::EnvFilter;

use pod_console::{
    config::load_settings,
    controller::{actions::ActionKind, PodDetailsController, PodDetailsServices},
    shell::ShellState,
};

const SHELL_QUEUE_CAPACITY: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "pod-console", about = "Inspect and manage a pod")]
struct Cli {
    /// Settings file; defaults to ./pod_console.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Fixture backing the managers; overrides settings.
    #[arg(long)]
    fixture: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the pod details view.
    Show { pod: String },
    /// Rename the pod.
    Rename { pod: String, name: String },
    /// Ask the pod to refresh its resources.
    Refresh { pod: String },
    /// Delete the pod.
    Delete { pod: String },
    /// Compose a machine from the pod's capacity.
    Compose(ComposeArgs),
}

impl Command {
    fn pod(&self) -> &str {
        match self {
            Command::Show { pod }
            | Command::Rename { pod, .. }
            | Command::Refresh { pod }
            | Command::Delete { pod } => pod,
            Command::Compose(args) => &args.pod,
        }
    }
}

#[derive(Args, Debug)]
struct ComposeArgs {
    pod: String,
    /// Disk as SIZE[:TYPE[:TAG,...]], repeatable. Replaces the default disk.
    #[arg(long = "disk", value_parser = parse_disk)]
    disks: Vec<StorageSpec>,
    /// Index of the boot disk.
    #[arg(long)]
    boot: Option<usize>,
    #[arg(long)]
    domain: Option<i64>,
    #[arg(long)]
    zone: Option<i64>,
    #[arg(long)]
    pool: Option<i64>,
    #[arg(long)]
    hostname: Option<String>,
    #[arg(long)]
    cores: Option<u32>,
    /// Memory in MiB.
    #[arg(long)]
    memory: Option<u64>,
    /// Print the compose parameters instead of sending them.
    #[arg(long)]
    dry_run: bool,
}

fn parse_disk(raw: &str) -> Result<StorageSpec, String> {
    let mut parts = raw.splitn(3, ':');
    let size = parts
        .next()
        .unwrap_or_default()
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("invalid disk size in {raw:?}"))?;
    let kind = match parts.next().map(str::trim) {
        None | Some("") | Some("local") => StorageKind::Local,
        Some("iscsi") => StorageKind::Iscsi,
        Some(other) => return Err(format!("unknown storage type {other:?}")),
    };
    let tags = parts
        .next()
        .map(|tags| {
            tags.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Ok(StorageSpec::new(kind, size, false).with_tags(tags))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(fixture) = cli.fixture.clone() {
        settings.fixture_path = fixture;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .init();

    let backend = FixtureBackend::new(Fixture::from_path(&settings.fixture_path)?);
    let errors = Arc::new(ReportingErrorService::new());
    let services = PodDetailsServices::from_backend(
        backend.clone(),
        Arc::new(HostnameValidator),
        errors.clone(),
    );
    let (shell_tx, shell_rx) = bounded(SHELL_QUEUE_CAPACITY);
    let mut controller = PodDetailsController::new(services, shell_tx);
    let mut shell = ShellState::default();

    controller.activate(cli.command.pod()).await;
    shell.absorb(&shell_rx);
    if !controller.is_loaded() {
        let reason = errors
            .last_error()
            .unwrap_or_else(|| "pod details did not load".to_string());
        bail!(reason);
    }

    match cli.command {
        Command::Show { .. } => {}
        Command::Rename { name, .. } => rename(&mut controller, name).await?,
        Command::Refresh { .. } => run_action(&mut controller, ActionKind::Refresh).await?,
        Command::Delete { .. } => run_action(&mut controller, ActionKind::Delete).await?,
        Command::Compose(args) => {
            let dry_run = args.dry_run;
            prepare_compose(&mut controller, args)?;
            if dry_run {
                let params = controller
                    .compose_pre_process()
                    .ok_or_else(|| anyhow!("no pod loaded"))?;
                println!("{}", serde_json::to_string_pretty(&params)?);
                return Ok(());
            }
            run_action(&mut controller, ActionKind::Compose).await?;
            for machine in backend.machines().await {
                println!(
                    "composed {} ({}) on pod {}",
                    machine.hostname, machine.system_id, machine.pod_id.0
                );
            }
        }
    }

    controller.pump_events();
    shell.absorb(&shell_rx);
    print!("{}", render_view(&controller, &shell));
    Ok(())
}

async fn rename(controller: &mut PodDetailsController, name: String) -> Result<()> {
    controller.edit_name();
    if !controller.name().editing {
        bail!("pod cannot be edited: requires a super user and a connected rack controller");
    }
    controller.set_name_value(name.clone());
    if controller.edit_name_invalid() {
        controller.cancel_edit_name();
        bail!("invalid pod name {name:?}");
    }
    controller.save_edit_name().await;
    if controller.pod().map(|pod| pod.name.as_str()) != Some(name.as_str()) {
        bail!("rename to {name:?} was not applied");
    }
    Ok(())
}

async fn run_action(controller: &mut PodDetailsController, kind: ActionKind) -> Result<()> {
    let selected = match kind {
        ActionKind::Compose => {
            controller.compose_machine();
            true
        }
        _ => controller.select_action(kind),
    };
    if !selected {
        bail!("action {} is not available for this pod", kind.name());
    }

    controller.action_go().await;
    if let Some(error) = &controller.action().error {
        bail!("{} failed: {}", kind.name(), error.message());
    }
    Ok(())
}

fn prepare_compose(controller: &mut PodDetailsController, args: ComposeArgs) -> Result<()> {
    if !controller.can_compose() {
        bail!("pod is not composable by this user");
    }
    controller.compose_machine();

    let request = controller.compose_request_mut();
    if !args.disks.is_empty() {
        request.storage = args.disks;
    }
    if let Some(id) = args.domain {
        request.domain = Some(DomainId(id));
    }
    if let Some(id) = args.zone {
        request.zone = Some(ZoneId(id));
    }
    if let Some(id) = args.pool {
        request.pool = Some(PoolId(id));
    }
    request.hostname = args.hostname;
    request.cores = args.cores;
    request.memory = args.memory;

    let has_boot = request.storage.iter().any(|disk| disk.boot);
    let boot = match args.boot {
        Some(index) => Some(index),
        None if !has_boot => Some(0),
        None => None,
    };
    if let Some(index) = boot {
        if !controller.compose_set_boot_disk(index) {
            bail!("boot disk index {index} is out of range");
        }
    }
    Ok(())
}

fn render_view(controller: &PodDetailsController, shell: &ShellState) -> String {
    let mut out = String::new();
    if let Some(location) = &shell.location {
        let _ = writeln!(out, "{} -> {location}", shell.title);
        return out;
    }

    let _ = writeln!(out, "{}", shell.title);
    let Some(pod) = controller.pod() else {
        return out;
    };
    let _ = writeln!(out, "  id:            {}", pod.id.0);
    let _ = writeln!(
        out,
        "  type:          {}",
        controller.pod_type_title().unwrap_or_default()
    );
    let _ = writeln!(out, "  capabilities:  {}", pod.capabilities.join(", "));
    let _ = writeln!(out, "  architectures: {}", pod.architectures.join(", "));
    if let Some(pool) = controller
        .catalogs()
        .pools
        .into_iter()
        .find(|pool| pool.id == pod.default_pool)
    {
        let _ = writeln!(out, "  default pool:  {}", pool.name);
    }
    let _ = writeln!(out, "  machines:      {}", controller.machines_search());
    let actions: Vec<&str> = controller
        .action()
        .options
        .iter()
        .map(|option| option.title)
        .collect();
    let _ = writeln!(out, "  actions:       {}", actions.join(", "));
    let _ = writeln!(out, "  editable:      {}", controller.can_edit());
    out
}
