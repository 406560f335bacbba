mod adapters;
mod application;
mod config;
mod domain;
mod interface;
mod ports;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adapters::{LsblkEnumerator, ProcfsAdapter, SmartctlProbe, TokioCommandRunner};
use application::{project, select_columns, SnapshotOptions, SnapshotService};
use config::Config;
use domain::{DeviceRow, SamplerCache};
use interface::cli::Args;
use interface::render;
use ports::CommandRunner;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging (stdout carries the report)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("statblk={}", args.log_level(&config.log_level)).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("Configuration: {:?}", config);

    let columns = select_columns(&args.output, args.excluded(&config.exclude));
    if columns.is_empty() {
        eprintln!("statblk: no columns left to display after --output/--exclude");
        return Ok(ExitCode::from(1));
    }
    let options = args.snapshot_options(columns)?;

    // Initialize adapters
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.command_timeout());
    let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner::new(config.max_concurrency));
    let procfs = ProcfsAdapter::new(config.procfs_config());
    let mut probe = SmartctlProbe::new(Arc::clone(&runner), timeout).with_sudo(args.sudo);
    if let Some(path) = &config.smartctl_path {
        probe = probe.with_smartctl_path(Some(path.clone()));
    }

    let service = SnapshotService::new(
        Arc::new(procfs.topology()),
        Arc::new(procfs.mount_source()),
        Arc::new(procfs.usage_source()),
        Arc::new(procfs.identity_source()),
        Arc::new(LsblkEnumerator::new(runner, timeout)),
        Arc::new(probe),
    );

    let mut samplers = SamplerCache::new();
    let width = render::terminal_width();

    let Some(interval) = args.interval else {
        let rows = service.collect(&options, &mut samplers).await;
        print_report(&rows, &options, args.json, width)?;
        return Ok(ExitCode::SUCCESS);
    };

    service
        .watch(
            options,
            &mut samplers,
            Duration::from_secs(interval),
            tokio::signal::ctrl_c(),
            |rows, options| {
                println!("{}", Local::now().format("%Y-%m-%d %H:%M:%S"));
                print_report(rows, options, args.json, width)
            },
        )
        .await?;

    info!("Interrupted, exiting");
    Ok(ExitCode::SUCCESS)
}

fn print_report(
    rows: &[DeviceRow],
    options: &SnapshotOptions,
    json: bool,
    width: Option<usize>,
) -> Result<(), serde_json::Error> {
    let projection = project(rows, &options.columns, &options.sizes);
    if json {
        println!("{}", serde_json::to_string_pretty(&render::to_json(&projection))?);
    } else {
        print!("{}", render::render_table(&projection, width));
    }
    Ok(())
}
