//! Patient records service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client request
//!     ──────────────▶ http server ──▶ auth (token → subject → decision)
//!                                          │
//!                                          ▼
//!                                     handlers ──▶ data (RecordStore)
//!                                          │
//!                                          ▼
//!                     client (typed peers → gateway → executor) ──▶ peer services
//!                                          │
//!                           resilience: breaker / retry / timeout / fallback
//!
//!     Cross-cutting: config, observability, lifecycle
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use patient_records::config::load_config;
use patient_records::data::{InMemoryRecordStore, PatientRecord, RecordStore};
use patient_records::lifecycle::{wait_for_termination, Shutdown};
use patient_records::observability::{logging, metrics};
use patient_records::HttpServer;

#[derive(Parser)]
#[command(name = "patient-records")]
#[command(about = "Patient records service", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "PATIENT_RECORDS_CONFIG")]
    config: Option<PathBuf>,

    /// JSON file with patients to load into the in-memory store
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "patient-records starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        peers = config.peers.len(),
        request_timeout_secs = config.listener.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = Arc::new(InMemoryRecordStore::new());
    if let Some(path) = &args.seed {
        let patients: Vec<PatientRecord> = serde_json::from_slice(&tokio::fs::read(path).await?)?;
        for patient in patients {
            store.save_patient(patient).await?;
        }
        tracing::info!(path = %path.display(), patients = store.patient_count(), "Seeded record store");
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, store)?;

    let shutdown = Shutdown::new();
    tokio::spawn(wait_for_termination(shutdown.clone()));

    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
