//! TaskDesk stub server.
//!
//! # Usage
//!
//! ```bash
//! # Seeded demo account on 127.0.0.1:4000
//! cargo run --bin taskdesk-stub
//!
//! # Empty store on another address
//! cargo run --bin taskdesk-stub -- --bind 127.0.0.1:8080 --empty
//! ```

use std::sync::Arc;

use clap::Parser;
use taskdesk_stub::config::{StubCliArgs, StubConfig};
use taskdesk_stub::server;
use taskdesk_stub::store::StubStore;

#[tokio::main]
async fn main() {
    let cli = StubCliArgs::parse();

    let config = match StubConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let store = if config.seed_demo {
        StubStore::seeded()
    } else {
        StubStore::new()
    };
    tracing::info!(addr = %config.bind_addr, seeded = config.seed_demo, "starting taskdesk stub");

    match server::start_server_with_state(&config.bind_addr, Arc::new(store)).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "stub server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "stub server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start stub server");
            std::process::exit(1);
        }
    }
}
