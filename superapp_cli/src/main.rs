use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use superapp_core::bridge::{pump, GuestTransport};
use superapp_core::config::ConfigError;
use superapp_core::host::HeadlessUi;
use superapp_core::installer::{FsPackageStore, InstallOutcome, JsonCatalog, SyncReport};
use superapp_core::token::{self, SessionCredentials};
use superapp_core::{
    AppRegistry, BridgeRouter, CapabilityRegistry, HostServices, InstallQueue, Liveness, Outbound,
    SuperAppConfig, SyncController, TokenBroker, TokenExchanger,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "superapp", version)]
struct Cli {
    /// Path to SuperApp.toml; searched for upwards from the current directory by default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reconcile installed apps against a catalog and an entitlement list
    Sync {
        /// JSON array of catalog entries
        #[arg(long)]
        catalog: PathBuf,
        /// JSON array of `{"appId": ..}` entitlements
        #[arg(long)]
        entitlements: PathBuf,
    },
    /// Download the latest version of one app
    Install {
        #[arg(long)]
        app_id: String,
    },
    /// Run one guest message through the bridge and print the injected scripts
    Bridge {
        #[arg(long)]
        app_id: String,
        /// Raw message, e.g. '{"topic":"token","requestId":"r1"}'
        #[arg(long)]
        message: String,
        /// Seed the session with this token instead of exchanging one
        #[arg(long)]
        token: Option<String>,
    },
    /// List known apps and their status
    List,
}

/// Prints every script the bridge would inject into the guest
struct StdoutTransport;

impl GuestTransport for StdoutTransport {
    fn inject(&self, script: &str) {
        println!("{}", script);
    }
}

/// Issues a deterministic local token; there is no auth backend offline
struct StaticExchanger;

#[async_trait]
impl TokenExchanger for StaticExchanger {
    async fn exchange(
        &self,
        client_id: &str,
        _existing_token: Option<&str>,
        app_id: &str,
    ) -> token::Result<String> {
        Ok(format!("local-{}-{}", client_id, app_id))
    }

    fn is_expiring_soon(&self, _token: &str) -> bool {
        false
    }
}

fn load_config(path: Option<PathBuf>) -> Result<SuperAppConfig, ConfigError> {
    match path {
        Some(path) => SuperAppConfig::load(path),
        None => match SuperAppConfig::from_project_root() {
            Err(ConfigError::NotFound(name)) => {
                info!("No {} found, using defaults", name);
                Ok(SuperAppConfig::default())
            }
            other => other,
        },
    }
}

fn print_report(report: &SyncReport) {
    println!(
        "Sync finished: {}/{} done",
        report.removed.len() + report.installed.len(),
        report.total
    );
    for app_id in &report.removed {
        println!("  removed   {}", app_id);
    }
    for app_id in &report.installed {
        println!("  installed {}", app_id);
    }
    for failure in &report.failures {
        println!("  failed    {}: {}", failure.app_id, failure.error);
    }
}

async fn sync(config: &SuperAppConfig, catalog: PathBuf, entitlements: PathBuf) -> CliResult {
    let registry = AppRegistry::load_snapshot(&config.storage.registry_snapshot)?;
    let controller = SyncController::new(
        registry.clone(),
        Arc::new(FsPackageStore::new(&config.storage.micro_app_dir)),
        Arc::new(HeadlessUi),
        Liveness::new(),
    );

    let report = controller
        .sync_from_remote(&JsonCatalog::new(catalog, entitlements))
        .await?;
    registry.save_snapshot(&config.storage.registry_snapshot)?;
    print_report(&report);
    Ok(())
}

async fn install(config: &SuperAppConfig, app_id: String) -> CliResult {
    let registry = AppRegistry::load_snapshot(&config.storage.registry_snapshot)?;
    let download_url = registry
        .read_app(&app_id, |app| {
            app.latest_version().map(|version| version.download_url.clone())
        })
        .ok_or_else(|| format!("Unknown app: {}", app_id))?
        .ok_or_else(|| format!("No version published for {}", app_id))?;

    let queue = InstallQueue::new(
        registry.clone(),
        Arc::new(FsPackageStore::new(&config.storage.micro_app_dir)),
        Arc::new(HeadlessUi),
        Liveness::new(),
    );
    info!("{:?}", queue.enqueue_download(app_id.as_str(), download_url));

    let mut failed = false;
    for outcome in queue.drain().await {
        match outcome {
            InstallOutcome::Installed { app_id } => println!("Installed {}", app_id),
            InstallOutcome::Failed { app_id, error } => {
                eprintln!("Failed to install {}: {}", app_id, error);
                failed = true;
            }
        }
    }
    registry.save_snapshot(&config.storage.registry_snapshot)?;
    if failed {
        return Err("installation failed".into());
    }
    Ok(())
}

async fn bridge(
    config: &SuperAppConfig,
    app_id: String,
    message: String,
    token: Option<String>,
) -> CliResult {
    let registry = AppRegistry::load_snapshot(&config.storage.registry_snapshot)?;
    let client_id = registry
        .read_app(&app_id, |app| app.client_id.clone())
        .flatten()
        .unwrap_or_else(|| "superapp-cli".to_string());
    if registry.get(&app_id).is_none() {
        warn!("{} is not in the registry, every topic will be denied", app_id);
    }

    let (outbound, rx) = Outbound::channel();
    let pump_task = tokio::spawn(pump(
        rx,
        Arc::new(StdoutTransport),
        config.bridge.namespace.clone(),
    ));

    let broker = TokenBroker::new(
        SessionCredentials::new(app_id.as_str(), client_id),
        Arc::new(StaticExchanger),
        registry.clone(),
        outbound.clone(),
    );
    match token {
        Some(token) => broker.set_token(token),
        None => {
            broker.start().await;
        }
    }

    let router = BridgeRouter::new(
        registry,
        Arc::new(CapabilityRegistry::with_defaults()),
        broker,
        outbound,
        HostServices::headless(),
    )
    .with_allow_list_key(config.bridge.allow_list_key.as_str());

    let dispatch = router.on_message(&message).await;
    info!("Dispatch outcome: {:?}", dispatch);

    drop(router);
    pump_task.await?;
    Ok(())
}

fn list(config: &SuperAppConfig) -> CliResult {
    let registry = AppRegistry::load_snapshot(&config.storage.registry_snapshot)?;
    let apps = registry.list();
    if apps.is_empty() {
        println!("No apps known yet.");
        return Ok(());
    }

    println!("Apps (revision {}):", registry.revision());
    for app in apps {
        let status = if app.is_downloaded() {
            "downloaded"
        } else {
            "not-downloaded"
        };
        let latest = app
            .latest_version()
            .map(|version| version.version.as_str())
            .unwrap_or("-");
        println!(
            "  {:<24} {:<16} {:<10}{}",
            app.app_id,
            status,
            latest,
            if app.is_mandatory() { " mandatory" } else { "" }
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match load_config(cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Sync {
            catalog,
            entitlements,
        } => sync(&config, catalog, entitlements).await,
        Commands::Install { app_id } => install(&config, app_id).await,
        Commands::Bridge {
            app_id,
            message,
            token,
        } => bridge(&config, app_id, message, token).await,
        Commands::List => list(&config),
    };

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
