use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::disks;
use crate::logging::{self, LogFormat};
use crate::ui;

use migwatch_client::RpcClient;
use migwatch_core::config;
use migwatch_core::migration::{MigrationOverrides, MigrationParams};
use migwatch_monitor::{DisplayMode, FinalOutcome, WatchConfig, WatchError, Watcher, settled_outcome};

#[derive(Parser)]
#[command(
    name = "migwatch",
    version,
    about = "Live-migrate virtual machines and watch the migration progress"
)]
struct Cli {
    /// Path to the daemon RPC socket (default: $MIGWATCH_SOCKET or /run/kvmrun/rpc.sock)
    #[arg(long, global = true, value_name = "PATH")]
    socket: Option<String>,

    /// Print machine-readable JSON instead of progress bars
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate the virtual machine to another host
    Migrate(MigrateArgs),
    /// Check a migration's progress or its final result
    MigrateStatus {
        /// Virtual machine name
        vm_name: String,
        /// Report the current state once instead of watching
        #[arg(long)]
        once: bool,
    },
    /// Cancel a running migration
    MigrateCancel {
        /// Virtual machine name
        vm_name: String,
    },
    /// Copy the virtual machine configuration to another host
    CopyConfig {
        /// Virtual machine name
        vm_name: String,
        /// Destination host
        dst_server: String,
        /// Override a disk path on the destination host. Repeatable.
        #[arg(long = "override-disk", value_name = "SRC:DST", value_parser = parse_override)]
        override_disk: Vec<(String, String)>,
    },
}

#[derive(Args)]
struct MigrateArgs {
    /// Virtual machine name
    vm_name: String,
    /// Destination host
    dst_server: String,
    /// Watch the migration until it ends
    #[arg(long, short = 'w')]
    watch: bool,
    /// Live-migrate every local disk
    #[arg(long, conflicts_with = "with_disk")]
    with_local_disks: bool,
    /// Live-migrate this disk. Repeatable.
    #[arg(long = "with-disk", value_name = "PATH")]
    with_disk: Vec<String>,
    /// Override a disk path on the destination host. Repeatable.
    #[arg(long = "override-disk", value_name = "SRC:DST", value_parser = parse_override)]
    override_disk: Vec<(String, String)>,
    /// Create logical volumes of the same size on the destination host
    #[arg(long)]
    create_lv: bool,
}

/// Parse `SRC:DST`. Both sides must be non-empty.
fn parse_override(s: &str) -> Result<(String, String), String> {
    match s.split_once(':') {
        Some((src, dst)) if !src.is_empty() && !dst.is_empty() => {
            Ok((src.to_string(), dst.to_string()))
        }
        _ => Err(format!("expected SRC:DST, got '{s}'")),
    }
}

// ============================================================================
// Command dispatch
// ============================================================================

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init(LogFormat::for_json_output(cli.json));

    let client = RpcClient::with_socket(&config::socket_path(cli.socket.as_deref()));
    let json = cli.json;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .with_context(|| "Failed to create tokio runtime")?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Migrate(args) => cmd_migrate(&client, args, json).await,
            Commands::MigrateStatus { vm_name, once } => {
                cmd_migrate_status(&client, &vm_name, once, json).await
            }
            Commands::MigrateCancel { vm_name } => cmd_migrate_cancel(&client, &vm_name).await,
            Commands::CopyConfig {
                vm_name,
                dst_server,
                override_disk,
            } => cmd_copy_config(&client, &vm_name, &dst_server, override_disk).await,
        }
    })
}

// ============================================================================
// Handlers
// ============================================================================

async fn cmd_migrate(client: &RpcClient, args: MigrateArgs, json: bool) -> Result<()> {
    let vm_name = args.vm_name.clone();
    let watch = args.watch;

    start_migration(client, args, disks::probe_logical_volume).await?;

    if watch {
        return cmd_migrate_status(client, &vm_name, false, json).await;
    }

    ui::success("Migration started");
    ui::info("Note: command 'migrate-status' shows the migration progress");
    Ok(())
}

/// Every request `migrate` issues before watching: `GetInstanceJson`, then
/// `PrepareDstDisks` if volumes are to be created, then
/// `StartMigrationProcess`. `probe` sizes logical volumes.
async fn start_migration<P>(client: &RpcClient, args: MigrateArgs, probe: P) -> Result<()>
where
    P: Fn(&str) -> Result<Option<u64>>,
{
    let MigrateArgs {
        vm_name,
        dst_server,
        watch: _,
        with_local_disks,
        with_disk,
        override_disk,
        create_lv,
    } = args;

    let instance = client
        .instance_json(&vm_name)
        .await
        .with_context(|| format!("Failed to get instance {vm_name}"))?;
    let attached = disks::attached_disks(&vm_name, &instance)?;
    let selected = disks::select_disks(&attached, &with_disk, with_local_disks)?;
    if with_local_disks && selected.is_empty() {
        ui::warn("No local disks attached, migrating memory state only");
    }
    let overrides: BTreeMap<String, String> = override_disk.into_iter().collect();

    if create_lv {
        let volumes = disks::destination_volumes(&selected, &overrides, probe)?;
        if !volumes.is_empty() {
            client
                .prepare_dst_disks(&dst_server, volumes)
                .await
                .with_context(|| format!("Failed to prepare disks on {dst_server}"))?;
        }
    }

    info!(vm = %vm_name, dst = %dst_server, disks = selected.len(), "Starting migration");
    let params = MigrationParams {
        dst_server,
        disks: selected,
        overrides: MigrationOverrides { disks: overrides },
    };
    client
        .start_migration(&vm_name, params)
        .await
        .with_context(|| format!("Failed to start migration of {vm_name}"))
}

async fn cmd_migrate_status(client: &RpcClient, vm_name: &str, once: bool, json: bool) -> Result<()> {
    if json {
        // Printed as the daemon sent it.
        let stat = client
            .migration_stat_json(vm_name)
            .await
            .with_context(|| format!("Failed to get migration status of {vm_name}"))?;
        println!("{}", serde_json::to_string_pretty(&stat)?);
        return Ok(());
    }

    let watch_config = WatchConfig {
        poll_interval: config::poll_interval(),
        display: DisplayMode::Terminal,
    };
    let watcher = Watcher::new(client.clone(), vm_name, watch_config);

    if once {
        let stat = watcher.check().await?;
        return match settled_outcome(&stat) {
            Some(result) => report_outcome(result),
            None => {
                ui::progress_snapshot(vm_name, &stat);
                Ok(())
            }
        };
    }

    report_outcome(watcher.watch().await)
}

fn report_outcome(result: Result<FinalOutcome, WatchError>) -> Result<()> {
    let outcome = result?;
    ui::success(&format!("Successfully migrated to {}", outcome.dst_server));
    Ok(())
}

async fn cmd_migrate_cancel(client: &RpcClient, vm_name: &str) -> Result<()> {
    client
        .cancel_migration(vm_name)
        .await
        .with_context(|| format!("Failed to cancel migration of {vm_name}"))?;
    ui::success("OK, cancelled");
    Ok(())
}

async fn cmd_copy_config(
    client: &RpcClient,
    vm_name: &str,
    dst_server: &str,
    override_disk: Vec<(String, String)>,
) -> Result<()> {
    let params = MigrationParams {
        dst_server: dst_server.to_string(),
        disks: Vec::new(),
        overrides: MigrationOverrides {
            disks: override_disk.into_iter().collect(),
        },
    };
    client
        .copy_config(vm_name, params)
        .await
        .with_context(|| format!("Failed to copy configuration of {vm_name} to {dst_server}"))?;
    ui::success(&format!("Configuration of {vm_name} copied to {dst_server}"));
    Ok(())
}
