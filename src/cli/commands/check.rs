use anyhow::Context;
use serde_json::json;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config;
use crate::database;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();
    config.validate().map_err(anyhow::Error::msg)?;

    let store = database::connect(&config.store)
        .await
        .context("failed to open the document store")?;

    match store.health_check().await {
        Ok(()) => output_success(
            output_format,
            "Store is reachable",
            Some(json!({ "backend": store.backend_name() })),
        ),
        Err(e) => {
            output_error(output_format, &format!("Store health check failed: {}", e), Some("STORE_UNAVAILABLE"))?;
            anyhow::bail!("store health check failed")
        }
    }
}
