// # caddns - Cloudflare A-record updater
//
// Thin operator layer over caddns-core. All DNS, scheduling and config
// logic lives in the library; this binary parses arguments, wires the
// concrete provider, IP source and scheduler together and maps results to
// exit codes.
//
// ## Typical Setup
//
// ```bash
// caddns init --api-key "$CF_TOKEN"
// caddns discover --zone example.com
// caddns enable home.example.com vpn.example.com
// ```
//
// `enable` writes `~/caddns-agent.sh` and installs a daily trigger that runs
// `caddns --config ~/.ca-ddns.json run`.
//
// ## Environment
//
// - `CADDNS_CONFIG`: Path of the config document (default `~/.ca-ddns.json`)
// - `CADDNS_LOG_LEVEL`: trace|debug|info|warn|error (default info)
// - `CADDNS_API_BASE`: Cloudflare API root (default public API)
// - `CADDNS_IP_URL`: Public IP echo service

use anyhow::{Context, Result};
use caddns_core::config::default_config_path;
use caddns_core::discovery::{addable_candidates, discover_records, resolve_zone};
use caddns_core::traits::{ConfigStore, IpSource};
use caddns_core::{
    AgentLauncher, Config, ConfigPatch, DomainOutcome, DomainSetReconciler, FileConfigStore,
    ProvisionOutcome, ReconcileAgent, SaveMode, Schedule, scheduler,
};
use caddns_ip_http::{DEFAULT_IP_URL, HttpIpSource};
use caddns_provider_cloudflare::{CLOUDFLARE_API_BASE, CloudflareProvider};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Success
/// - 1: Configuration or startup error
/// - 2: Runtime error (including any domain failing in `run`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaddnsExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<CaddnsExitCode> for ExitCode {
    fn from(code: CaddnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Parser)]
#[command(name = "caddns", version, about = "Keep Cloudflare A records pointed at this machine")]
struct Cli {
    /// Config document path
    #[arg(long, env = "CADDNS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CADDNS_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Cloudflare API root
    #[arg(long, env = "CADDNS_API_BASE", default_value = CLOUDFLARE_API_BASE, global = true, hide = true)]
    api_base: String,

    /// Public IP echo service
    #[arg(long, env = "CADDNS_IP_URL", default_value = DEFAULT_IP_URL, global = true, hide = true)]
    ip_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Save the Cloudflare API token
    Init {
        #[arg(long)]
        api_key: String,
    },
    /// Resolve the zone and list its A records
    Discover {
        /// Zone name, e.g. example.com
        #[arg(long)]
        zone: String,
    },
    /// Manage exactly these domains and install the daily agent
    Enable(DomainArgs),
    /// Add domains to the managed set
    Add(DomainArgs),
    /// Remove domains from the managed set (uninstalls when empty)
    Remove(DomainArgs),
    /// Show the managed set and discovered candidates
    Status,
    /// Print the current public IPv4 address
    Ip,
    /// Remove the daily agent and delete the config document
    Teardown,
    /// Run one reconciliation cycle (invoked by the OS trigger)
    Run,
}

#[derive(Debug, Args)]
struct DomainArgs {
    /// Fully-qualified domain names
    #[arg(required = true)]
    domains: Vec<String>,

    /// Daily trigger time
    #[arg(long, value_name = "HH:MM", default_value = "00:00")]
    at: Schedule,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CaddnsExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CaddnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(execute(cli));
    match result {
        Ok(()) => CaddnsExitCode::Success.into(),
        Err(e) => {
            error!("{:#}", e);
            exit_code_for(&e).into()
        }
    }
}

/// Configuration problems exit 1, everything else 2
fn exit_code_for(err: &anyhow::Error) -> CaddnsExitCode {
    match err.downcast_ref::<caddns_core::Error>() {
        Some(caddns_core::Error::Config(_)) | Some(caddns_core::Error::InvalidInput(_)) => {
            CaddnsExitCode::ConfigError
        }
        _ => CaddnsExitCode::RuntimeError,
    }
}

/// Handles shared by the subcommands
struct App {
    config_path: PathBuf,
    store: Arc<FileConfigStore>,
    api_base: String,
    ip_url: String,
}

impl App {
    fn provider(&self, config: &Config) -> Result<CloudflareProvider> {
        let api_key = config.require_api_key()?;
        Ok(CloudflareProvider::with_base_url(api_key, &self.api_base)?)
    }

    fn ip_source(&self) -> Result<HttpIpSource> {
        Ok(HttpIpSource::new(&self.ip_url)?)
    }

    fn reconciler(&self, schedule: Schedule) -> Result<DomainSetReconciler> {
        let launcher = AgentLauncher::for_current_exe(&self.config_path)?;
        let scheduler = scheduler::for_host(launcher.path());
        Ok(DomainSetReconciler::new(self.store.clone(), scheduler, launcher).with_schedule(schedule))
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let store = FileConfigStore::new(&config_path)
        .await
        .with_context(|| format!("Cannot open config document {}", config_path.display()))?;

    let ctx = App {
        config_path,
        store: Arc::new(store),
        api_base: cli.api_base,
        ip_url: cli.ip_url,
    };

    match cli.command {
        Command::Init { api_key } => init(&ctx, api_key).await,
        Command::Discover { zone } => discover(&ctx, &zone).await,
        Command::Enable(args) => {
            let outcome = ctx.reconciler(args.at)?.replace_domains(&args.domains).await?;
            print_provision(&outcome);
            Ok(())
        }
        Command::Add(args) => {
            let outcome = ctx.reconciler(args.at)?.add_domains(&args.domains).await?;
            print_provision(&outcome);
            Ok(())
        }
        Command::Remove(args) => {
            let outcome = ctx.reconciler(args.at)?.remove_domains(&args.domains).await?;
            print_provision(&outcome);
            Ok(())
        }
        Command::Status => status(&ctx).await,
        Command::Ip => {
            let ip = ctx.ip_source()?.current().await?;
            println!("{}", ip);
            Ok(())
        }
        Command::Teardown => {
            ctx.reconciler(Schedule::default())?.teardown().await?;
            println!("Agent removed and configuration deleted.");
            Ok(())
        }
        Command::Run => run_agent(&ctx).await,
    }
}

async fn init(ctx: &App, api_key: String) -> Result<()> {
    if api_key.trim().is_empty() {
        return Err(caddns_core::Error::invalid_input("API key cannot be empty").into());
    }
    ctx.store
        .save(ConfigPatch::api_key(api_key.trim()), SaveMode::MergeFields)
        .await?;
    println!("API key saved to {}", ctx.config_path.display());
    Ok(())
}

async fn discover(ctx: &App, zone: &str) -> Result<()> {
    let config = ctx.store.load().await?;
    let provider = ctx.provider(&config)?;

    let zone_id = resolve_zone(ctx.store.as_ref(), &provider, zone).await?;
    println!("Zone id: {}", zone_id);

    discover_records(ctx.store.as_ref(), &provider).await?;
    let config = ctx.store.load().await?;
    print_list("Managed", &config.domains);
    print_list("Available to add", &addable_candidates(&config));
    Ok(())
}

async fn status(ctx: &App) -> Result<()> {
    let config = ctx.store.load().await?;
    println!("Config:  {}", ctx.config_path.display());
    println!(
        "API key: {}",
        if config.api_key.is_some() { "set" } else { "not set" }
    );
    println!("Zone id: {}", config.zone_id.as_deref().unwrap_or("not set"));
    print_list("Managed", &config.domains);
    print_list("Available to add", &addable_candidates(&config));
    Ok(())
}

async fn run_agent(ctx: &App) -> Result<()> {
    let config = ctx.store.load().await?;
    if config.domains.is_empty() {
        info!("No managed domains, nothing to do");
        return Ok(());
    }

    let agent = ReconcileAgent::from_config(
        &config,
        Box::new(ctx.provider(&config)?),
        Box::new(ctx.ip_source()?),
    )?;
    let report = agent.run_cycle().await;

    for entry in &report.domains {
        match &entry.outcome {
            DomainOutcome::Unchanged { ip } => println!("{}: unchanged ({})", entry.domain, ip),
            DomainOutcome::Updated { previous, new } => {
                println!("{}: updated {} -> {}", entry.domain, previous, new)
            }
            DomainOutcome::Missing => println!("{}: no A record", entry.domain),
            DomainOutcome::Failed { error } => println!("{}: failed: {}", entry.domain, error),
        }
    }

    if report.has_failures() {
        anyhow::bail!(
            "{} of {} domain(s) failed",
            report.failed_count(),
            report.domains.len()
        );
    }
    Ok(())
}

fn print_provision(outcome: &ProvisionOutcome) {
    match outcome {
        ProvisionOutcome::Provisioned { domains } => print_list("Managed", domains),
        ProvisionOutcome::TornDown => {
            println!("No domains left; agent removed and configuration deleted.")
        }
        ProvisionOutcome::NothingManaged => println!("No managed domains; nothing removed."),
    }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        println!("{}: none", title);
        return;
    }
    println!("{}:", title);
    for item in items {
        println!("  {}", item);
    }
}
