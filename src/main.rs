use std::env;

use anyhow::Result;
use terraform_provider_azurerm::AzureProvider;
use tf_provider::serve;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_ENV: &str = "TF_LOG_PROVIDER_AZURERM";

fn init_logging() {
    // The plugin server logs to `PLUGIN_LOG_FILE` itself, stdout belongs to the handshake
    if env::var_os("PLUGIN_LOG_FILE").is_some() || env::var_os(LOG_ENV).is_none() {
        return;
    }
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .with(EnvFilter::from_env(LOG_ENV))
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    serve("azurerm", AzureProvider::default()).await
}
