use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Args;
use serde_json::{json, Value};

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;

#[derive(Args, Debug)]
pub struct PingArgs {
    #[arg(long, default_value = "http://localhost:3000", help = "Base URL of the server")]
    pub url: String,

    #[arg(long, default_value_t = 5, help = "Request timeout in seconds")]
    pub timeout: u64,
}

pub async fn handle(args: PingArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let url = url::Url::parse(&args.url)
        .and_then(|base| base.join("/health"))
        .with_context(|| format!("invalid server URL {}", args.url))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .build()?;

    let started = Instant::now();
    let response = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("could not reach {}", url))?;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_success() {
        output_success(
            output_format,
            &format!("{} is healthy", args.url),
            Some(json!({
                "status": status.as_u16(),
                "elapsedMs": elapsed_ms,
                "store": body["data"]["store"],
            })),
        )
    } else {
        output_error(
            output_format,
            &format!("{} answered {}", args.url, status),
            Some("SERVER_UNHEALTHY"),
        )?;
        anyhow::bail!("server is unhealthy")
    }
}
