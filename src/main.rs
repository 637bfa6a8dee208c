// Main entry point for the ADT connectivity probe

use anyhow::Context;
use tracing::{error, info};

use adt_client::config::Config;
use adt_client::xml;
use adt_client::AdtClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load and validate configuration first (before any logging)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // 2. Initialize tracing subscriber with config values
    init_tracing(&config)?;

    info!(
        endpoint = %config.base_endpoint(),
        client = %config.client,
        user = %config.username,
        timeout_secs = config.request_timeout_secs,
        "Starting ADT probe"
    );

    let client = AdtClient::from_config(&config).context("failed to build ADT client")?;

    // 3. Token round trip proves logon, client and CSRF handling
    if let Err(e) = client.csrf_token().await {
        error!(kind = %e.kind(), status = ?e.status(), error = %e, "CSRF token fetch failed");
        return Err(e).context("backend did not hand out a CSRF token");
    }
    info!("CSRF token obtained");

    // 4. Discovery document lists the services the backend exposes
    let discovery = client
        .discover()
        .await
        .context("failed to read the discovery document")?;
    let workspaces = xml::find_elements(&discovery, "workspace").len();
    let collections = xml::find_elements(&discovery, "collection").len();
    info!(workspaces, collections, "Discovery document read");

    println!(
        "{}: {} workspaces, {} collections",
        client.session().base_endpoint(),
        workspaces,
        collections
    );
    Ok(())
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    // Create filter from RUST_LOG env var or config
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
