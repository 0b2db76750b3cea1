use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use storefront::application::config::{EngineConfig, IdStrategy, SessionPolicy};
use storefront::application::engine::StorefrontEngine;
use storefront::domain::UserId;
use storefront::domain::ports::{
    CatalogStoreBox, NotifierBox, OrderLogBox, OrderStoreBox, ReferenceGuardBox,
};
use storefront::infrastructure::in_memory::{
    InMemoryCatalogStore, InMemoryOrderLog, InMemoryOrderStore, InMemoryReferenceGuard,
};
use storefront::interfaces::catalog_file::CatalogFile;
use storefront::interfaces::csv::event_reader::EventReader;
use storefront::interfaces::csv::notification_writer::CsvNotifier;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Inbound events CSV file (`type,actor,order,target,value`)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JSON file with products and payment methods to seed the catalog with
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Admin user ids allowed to decide orders and manage the catalog
    #[arg(long = "admin", env = "STOREFRONT_ADMINS", value_delimiter = ',')]
    admins: Vec<UserId>,

    /// replace, single-active or multi-order
    #[arg(long, default_value = "replace")]
    session_policy: SessionPolicy,

    /// Issue ORD-00000001, ORD-00000002, ... instead of random order ids
    #[arg(long)]
    sequential_ids: bool,
}

type Stores = (CatalogStoreBox, OrderStoreBox, OrderLogBox, ReferenceGuardBox);

fn in_memory_stores() -> Stores {
    (
        Box::new(InMemoryCatalogStore::new()),
        Box::new(InMemoryOrderStore::new()),
        Box::new(InMemoryOrderLog::new()),
        Box::new(InMemoryReferenceGuard::new()),
    )
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<&Path>) -> Result<Stores> {
    use storefront::infrastructure::rocksdb::RocksDBStore;

    let Some(path) = db_path else {
        return Ok(in_memory_stores());
    };
    let store = RocksDBStore::open(path).into_diagnostic()?;
    info!(path = %path.display(), "Using RocksDB storage");
    Ok((
        Box::new(store.clone()),
        Box::new(store.clone()),
        Box::new(store.clone()),
        Box::new(store),
    ))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<&Path>) -> Result<Stores> {
    if let Some(path) = db_path {
        warn!(
            path = %path.display(),
            "Persistent storage requested but the 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }
    Ok(in_memory_stores())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();
    if cli.admins.is_empty() {
        warn!("No admins configured; every order will stay pending");
    }

    let (catalog, orders, log, guard) = open_stores(cli.db_path.as_deref())?;

    if let Some(path) = &cli.catalog {
        let file = File::open(path).into_diagnostic()?;
        CatalogFile::from_reader(file)
            .into_diagnostic()?
            .seed(catalog.as_ref())
            .await
            .into_diagnostic()?;
    }

    let notifier: NotifierBox = Box::new(CsvNotifier::new(io::stdout()));
    let config = EngineConfig {
        admins: cli.admins,
        session_policy: cli.session_policy,
        id_strategy: if cli.sequential_ids {
            IdStrategy::Sequential
        } else {
            IdStrategy::Random
        },
    };
    let engine = StorefrontEngine::new(catalog, orders, log, guard, notifier, config);
    engine.recover().await.into_diagnostic()?;

    // Process events
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    let (mut handled, mut failed) = (0usize, 0usize);
    for event in reader.events() {
        match event {
            Ok(event) => match engine.handle(event).await {
                Ok(()) => handled += 1,
                Err(e) => {
                    failed += 1;
                    warn!(error = %e, "Event rejected");
                }
            },
            Err(e) => {
                failed += 1;
                warn!(error = %e, "Skipping unreadable event");
            }
        }
    }
    info!(handled, failed, "Event stream processed");

    Ok(())
}
