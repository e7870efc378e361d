use anyhow::{Context, Result};
use clap::Parser;
use core_logic::{setup_logger, DatabaseManager, ProxyManager, WalletManager, WalletSource};
use dialoguer::{theme::ColorfulTheme, Password};
use dotenv::dotenv;
use sonic_odyssey::daily::SonicDailyOperations;
use sonic_odyssey::menu::Menu;
use sonic_odyssey::{
    fingerprint, BatchOrchestrator, ChainClient, JsonPolicyStore, JsonProgressStore, PolicyStore,
    ProgressTracker, Scheduler, SonicRpcClient, SonicSettings, WalletTransactionRunner,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Open the interactive settings menu instead of running the scheduler
    #[arg(short, long)]
    verbose: bool,

    /// Endpoint and file settings (TOML)
    #[arg(long, default_value = "config.toml")]
    settings: String,

    #[arg(long)]
    config_file: Option<PathBuf>,

    #[arg(long)]
    progress_file: Option<PathBuf>,

    #[arg(long)]
    keys_file: Option<PathBuf>,

    #[arg(long)]
    db_path: Option<String>,

    /// Do not record transfers in SQLite
    #[arg(long)]
    no_db: bool,

    /// Write metrics JSON to this path after every batch
    #[arg(long)]
    export_metrics: Option<String>,
}

fn wallet_password(source: &WalletSource) -> Result<Option<String>> {
    if !matches!(source, WalletSource::EncryptedDir { .. }) {
        return Ok(None);
    }
    if let Ok(password) = env::var("WALLET_PASSWORD") {
        return Ok(Some(password));
    }
    let password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Wallet password")
        .interact()?;
    Ok(Some(password))
}

async fn run(args: Args) -> Result<()> {
    let mut settings = SonicSettings::load(&args.settings)?;
    if let Some(path) = args.config_file {
        settings.config_file = path;
    }
    if let Some(path) = args.progress_file {
        settings.progress_file = path;
    }
    if let Some(path) = args.keys_file {
        settings.keys_file = path;
    }
    if let Some(path) = args.db_path {
        settings.db_path = path;
    }

    let source = WalletManager::detect_source(&settings.keys_file, &settings.wallets_dir);
    let password = wallet_password(&source)?;
    let secrets = Arc::new(
        WalletManager::load_secrets(&source, password.as_deref())
            .context("No wallets to work with")?,
    );

    let policy_store = JsonPolicyStore::new(&settings.config_file);
    let policy = policy_store.load();

    let timeout = Duration::from_secs(settings.request_timeout_secs);
    let rpc = SonicRpcClient::new(&settings.rpc_url, timeout);
    info!("RPC: {}", rpc.url());
    let chain: Arc<dyn ChainClient> = Arc::new(rpc);

    let db = if args.no_db {
        None
    } else {
        match DatabaseManager::new(&settings.db_path).await {
            Ok(db) => Some(Arc::new(db)),
            Err(e) => {
                warn!("Transfer log disabled: {:#}", e);
                None
            }
        }
    };

    let proxies = ProxyManager::load_proxies(&settings.proxies_file)?;
    let daily = Arc::new(
        SonicDailyOperations::new(
            Arc::clone(&secrets),
            Arc::clone(&chain),
            settings.api_base_url.clone(),
            timeout,
        )
        .with_proxies(proxies)
        .with_database(db.clone()),
    );

    if args.verbose {
        return Menu::new(&policy_store, policy, &secrets, chain, daily)
            .with_database(db)
            .run()
            .await;
    }

    let store = Arc::new(JsonProgressStore::new(&settings.progress_file));
    let progress = ProgressTracker::open(store, &fingerprint(&secrets))?;

    let runner = WalletTransactionRunner::new(chain).with_database(db);
    let orchestrator = BatchOrchestrator::new(runner, daily);
    let mut scheduler = Scheduler::new(orchestrator, secrets.to_vec(), policy, progress)
        .with_metrics_export(args.export_metrics);

    scheduler.run(None).await
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let args = Args::parse();
    let guard = setup_logger();

    info!("Sonic Odyssey bot starting");
    let result = run(args).await;
    if let Err(e) = &result {
        error!("Fatal: {:#}", e);
    }

    drop(guard);
    if result.is_err() {
        std::process::exit(1);
    }
}
