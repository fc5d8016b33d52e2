//! fwdeploy - deployment hooks invoked by the firmware build orchestrator.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fwdeploy_common::{BuildTarget, HookPoint};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fwdeploy_hooks::output::{gate_line, plan_line, print_one, report_lines, run_line};
use fwdeploy_hooks::{AssetCompressor, Config, HookRunner, ReadinessGate, TargetPlan, UPLOAD_ALL};

#[derive(Parser, Debug)]
#[command(name = "fwdeploy", version, about = "Firmware deployment hooks")]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "FWDEPLOY_CONFIG",
        help = "Configuration file (default: fwdeploy.toml if present)"
    )]
    config: Option<String>,
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Wait for an OTA-updated device to accept connections again
    WaitReady {
        #[arg(long, help = "Upload protocol (overrides upload.protocol)")]
        protocol: Option<String>,
        #[arg(long, help = "Device host (overrides upload.host)")]
        host: Option<String>,
    },
    /// Gzip text assets under the asset root
    GzipAssets {
        #[arg(long, help = "Asset root (overrides assets.data_dir)")]
        root: Option<PathBuf>,
    },
    /// Run every action registered at a hook point
    Hook { point: HookPoint },
    /// Run the hooks attached to an orchestrator target
    PreAction { target: BuildTarget },
    /// Print the execution order for a target or alias
    Plan {
        #[arg(default_value = UPLOAD_ALL)]
        name: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())
        .map_err(|e| format!("Failed to load configuration: {}", e))?;

    // Initialize tracing; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::WaitReady { protocol, host } => {
            if let Some(protocol) = protocol {
                config.upload.protocol = protocol;
            }
            if host.is_some() {
                config.upload.host = host;
            }
            let ctx = config.resolve()?;
            let report = ReadinessGate::new().wait(&ctx.target).await;
            print_one(cli.json, &report, gate_line)?;
        }
        Commands::GzipAssets { root } => {
            if root.is_some() {
                config.assets.data_dir = root;
            }
            let ctx = config.resolve()?;
            let run = AssetCompressor::from_context(&ctx).run();
            print_one(cli.json, &run, run_line)?;
        }
        Commands::Hook { point } => {
            let ctx = config.resolve()?;
            let report = HookRunner::standard().dispatch(point, &ctx).await;
            print_one(cli.json, &report, report_lines)?;
        }
        Commands::PreAction { target } => match TargetPlan::hook_point_for(target) {
            Some(point) => {
                let ctx = config.resolve()?;
                let report = HookRunner::standard().dispatch(point, &ctx).await;
                print_one(cli.json, &report, report_lines)?;
            }
            None => {
                tracing::debug!(build_target = %target, "No hooks attached");
                print_one(cli.json, &Vec::<String>::new(), |_| {
                    format!("no hooks for {}", target)
                })?;
            }
        },
        Commands::Plan { name } => {
            let plan = TargetPlan::standard().execution_order(&name)?;
            print_one(cli.json, &plan, plan_line)?;
        }
    }

    Ok(())
}
