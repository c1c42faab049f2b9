//! Run startup reconciliation against an on-disk store and print a summary.
//!
//! ```text
//! commons-reconcile [--config <path>] [--store <path>] [--json-logs]
//! ```
//!
//! `RUST_LOG` controls verbosity (default `info`).

use std::path::PathBuf;
use std::sync::Arc;

use commons_core::{CommonsError, EngineConfig, StaticReference, StorageError, SystemClock};
use commons_storage::FileMedium;
use commons_sync::CommonsEngine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const STORE_ENV_VAR: &str = "COMMONS_STORE";
const DEFAULT_STORE: &str = "commons-store.json";

#[tokio::main]
async fn main() -> Result<(), CommonsError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    init_tracing(args.iter().any(|a| a == "--json-logs"));

    let config = EngineConfig::load()?;
    let store_path = store_path(&args);
    tracing::info!(store = %store_path.display(), "opening store");

    let engine = CommonsEngine::new(
        config,
        FileMedium::open(store_path),
        Arc::new(StaticReference::empty()),
        SystemClock::shared(),
    );
    let initialized = engine.initialize().await;

    let summary = serde_json::json!({
        "has_persisted_data": initialized.has_persisted_data,
        "storage_available": engine.session().is_available(),
        "user": initialized.state.user.as_ref().map(|u| serde_json::json!({
            "id": u.id,
            "trust_points": u.trust_points,
            "warning": engine.trust().ledger().is_warning(u.trust_points),
        })),
        "threads": initialized.state.threads.len(),
        "trust_history": initialized.state.trust_history.len(),
        "issues_found": initialized.repairs.found,
        "repairs_applied": initialized.repairs.applied,
    });
    let rendered =
        serde_json::to_string_pretty(&summary).map_err(|e| StorageError::Serialization {
            key: "summary".to_string(),
            reason: e.to_string(),
        })?;
    println!("{rendered}");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialised: {e}");
    }
}

fn store_path(args: &[String]) -> PathBuf {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--store" {
            if let Some(path) = iter.next() {
                return PathBuf::from(path);
            }
        }
        if let Some(path) = arg.strip_prefix("--store=") {
            return PathBuf::from(path);
        }
    }
    std::env::var_os(STORE_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE))
}
