//! clinv CLI
//!
//! Command-line asset inventory of cloud resources and the services, projects
//! and information assets that use them.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use clinv_aws::AwsCli;
use clinv_inventory::{Inventory, InventoryError, Kind, MonitorStatus, RegenerateSummary, Store};
use clinv_report::{Printout, Sheet};
use color_eyre::Result;
use eyre::{WrapErr, bail};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "clinv")]
#[command(
    about = "Command line inventory of cloud assets and the services using them",
    long_about = None
)]
struct Cli {
    /// Directory holding the inventory data files
    #[arg(long, global = true)]
    data_path: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch provider data and refresh the inventory
    Generate {
        /// Only refresh this kind
        kind: Option<Kind>,
    },
    /// List entities
    List {
        kind: Option<Kind>,
        /// Include terminated services
        #[arg(short, long)]
        all: bool,
    },
    /// List entities in the active state
    Active { kind: Option<Kind> },
    /// Search entities matching a regular expression
    Search {
        pattern: String,
        #[arg(short, long)]
        kind: Option<Kind>,
    },
    /// Print every field of the entities whose id matches a regular expression
    Print {
        pattern: String,
        #[arg(short, long)]
        kind: Option<Kind>,
    },
    /// List live resources nothing owns
    Unassigned { kind: Option<Kind> },
    /// List live cloud resources by monitor status
    Monitor {
        #[arg(default_value = "false")]
        status: MonitorStatus,
    },
    /// Export the inventory as one CSV file per kind
    Export {
        /// Destination directory, defaults to `export` inside the data path
        path: Option<PathBuf>,
    },
    /// List security groups nothing uses
    Unused,
    /// Show the risk, protection and security scores of services
    Score { service: Option<String> },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let (config, config_path) = Config::discover(cli.config.as_deref())?;
    init_tracing(cli.verbose, &config);
    match &config_path {
        Some(path) => debug!(path = %path.display(), "configuration loaded"),
        None => warn!("no config file found, using defaults"),
    }

    let data_path = cli.data_path.clone().unwrap_or_else(|| config.data_path());
    let store = Store::new(&data_path);
    let mut inventory = Inventory::open(&store)
        .wrap_err_with(|| format!("failed to load inventory from {}", data_path.display()))?;

    match cli.command {
        Commands::Generate { kind } => {
            let aws = Arc::new(AwsCli::local(&config.aws));
            let sources = clinv_aws::registry(aws, &config.aws.regions);
            let summary = inventory.regenerate(&store, &sources, kind).await?;
            print_summary(&summary);
        }
        Commands::List { kind, all } => show(&clinv_report::list(&inventory, kind, all)),
        Commands::Active { kind } => show(&clinv_report::active(&inventory, kind)),
        Commands::Search { pattern, kind } => {
            show(&clinv_report::search(&inventory, &pattern, kind)?);
        }
        Commands::Print { pattern, kind } => {
            match clinv_report::print(&inventory, &pattern, kind)? {
                Printout::Found(sheets) => sheets.iter().for_each(|sheet| println!("{sheet}")),
                Printout::NothingFound => println!("Nothing found matching {pattern}"),
            }
        }
        Commands::Unassigned { kind } => show(&clinv_report::unassigned(&inventory, kind)),
        Commands::Monitor { status } => show(&clinv_report::monitor(&inventory, status)),
        Commands::Export { path } => {
            let path = path.unwrap_or_else(|| data_path.join("export"));
            let written = clinv_report::write_book(&clinv_report::book(&inventory), &path)?;
            println!("Exported {} sheets to {}", written.len(), path.display());
        }
        Commands::Unused => show(&clinv_report::unused(&inventory)),
        Commands::Score { service } => {
            show(&clinv_report::score(&inventory, &config.scoring, service.as_deref())?);
        }
    }

    check_integrity(inventory.failures())
}

/// Level from `RUST_LOG`, else `--verbose`, else the configured level
fn init_tracing(verbose: u8, config: &Config) {
    let level = match verbose {
        0 => config.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn show(sheet: &Sheet) {
    if sheet.is_empty() {
        println!("No entities found");
    } else {
        println!("{sheet}");
    }
}

fn print_summary(summary: &RegenerateSummary) {
    for (kind, count) in &summary.fetched {
        println!("{}: {count} resources", kind.title());
    }
    for kind in &summary.skipped {
        println!("{}: skipped, no source available", kind.title());
    }
    for (kind, error) in &summary.failed {
        println!("{}: failed, previous data kept ({error})", kind.title());
    }
    info!(
        seeded = summary.seeded,
        gone = summary.gone,
        finished_at = %summary.finished_at,
        "generate finished"
    );
}

/// Fail the run when a kind couldn't be loaded; the other kinds were served
fn check_integrity(failures: &[InventoryError]) -> Result<()> {
    let broken: Vec<&InventoryError> = failures.iter().filter(|e| e.is_data_integrity()).collect();
    if broken.is_empty() {
        return Ok(());
    }
    for error in &broken {
        eprintln!("{error}");
    }
    bail!("{} kind(s) have invalid data", broken.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_kind_aliases() {
        let cli = Cli::try_parse_from(["clinv", "unassigned", "ec2"]).unwrap();
        assert!(matches!(cli.command, Commands::Unassigned { kind: Some(Kind::Ec2) }));

        let cli = Cli::try_parse_from(["clinv", "list", "sg", "--all"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::List { kind: Some(Kind::SecurityGroups), all: true }
        ));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(Cli::try_parse_from(["clinv", "list", "lambda"]).is_err());
    }

    #[test]
    fn test_monitor_defaults_to_unmonitored() {
        let cli = Cli::try_parse_from(["clinv", "monitor"]).unwrap();
        assert!(matches!(cli.command, Commands::Monitor { status: MonitorStatus::Unmonitored }));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "clinv",
            "search",
            "web",
            "--data-path",
            "/tmp/inv",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.data_path, Some(PathBuf::from("/tmp/inv")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_check_integrity() {
        assert!(check_integrity(&[]).is_ok());
        let failures = [InventoryError::DataIntegrity {
            kind: Kind::Ec2,
            id: "i-0001".to_string(),
            message: "missing required field `region`".to_string(),
        }];
        assert!(check_integrity(&failures).is_err());
    }
}
