use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use procpulse::config::{self, Config, load_config, load_config_from_path};
use procpulse::logging::{self, LogFormat};
use procpulse::monitor::Monitor;
use procpulse::report;
use procpulse::system::collector::Collector;
use procpulse::system::process::SortOrder;

#[derive(Parser)]
#[command(
    name = "procpulse",
    about = "Sample procfs and sysfs and report CPU, memory, process, battery and thermal metrics"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Polling interval in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Root of the proc filesystem
    #[arg(long)]
    proc_root: Option<PathBuf>,

    /// Root of the sys filesystem
    #[arg(long)]
    sys_root: Option<PathBuf>,

    /// Process order: cpu, memory, name
    #[arg(long)]
    sort: Option<String>,

    /// Number of processes per report
    #[arg(long)]
    top: Option<usize>,

    /// Exit after this many published cycles.
    #[arg(long)]
    cycles: Option<u64>,

    /// Print each snapshot as one JSON line instead of a text report.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);

    logging::init(
        &config.logging.level,
        LogFormat::from_str_config(&config.logging.format),
    )
    .map_err(|e| eyre!("failed to install log subscriber: {e}"))?;

    let config_location = cli.config.clone().or_else(config::config_path);
    if let Some(path) = &config_location {
        tracing::debug!(path = %path.display(), "config location");
    }

    if cli.cycles == Some(0) {
        return Err(eyre!("--cycles must be greater than 0"));
    }

    run(&cli, config).await
}

async fn run(cli: &Cli, config: Config) -> Result<()> {
    let order = SortOrder::from_str_config(&config.process.default_sort);
    let top = config.process.top;

    let collector = Collector::new(config.collector_settings());
    let (monitor, _) = Monitor::spawn(
        collector,
        config.general.interval_secs,
        config.general.start_paused,
    );
    let mut snapshots = monitor.subscribe();

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if cli.json {
                    println!("{}", serde_json::to_string(&*snapshot)?);
                } else {
                    println!("{}", report::render(&snapshot, order, top));
                }
                if cli.cycles.is_some_and(|n| snapshot.cycle >= n) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                break;
            }
        }
    }

    if !monitor.shutdown().await {
        tracing::warn!("exiting with the sampling worker still running");
    }
    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(interval) = cli.interval {
        config.general.interval_secs = interval;
    }
    if let Some(ref root) = cli.proc_root {
        config.sources.proc_root = root.clone();
    }
    if let Some(ref root) = cli.sys_root {
        config.sources.sys_root = root.clone();
    }
    if let Some(ref sort) = cli.sort {
        config.process.default_sort = sort.clone();
    }
    if let Some(top) = cli.top {
        config.process.top = top;
    }

    config
}
