use anyhow::Context;
use tracing::info;

use replenish_cli::{Command, JsonFileSource};
use replenish_infra::{EngineConfig, RestockingService, RetryPolicy, RetryingSource};
use replenish_observability::{LogFormat, LogSettings};

fn main() -> anyhow::Result<()> {
    let format = std::env::var("REPLENISH_LOG_FORMAT")
        .ok()
        .and_then(|raw| raw.parse::<LogFormat>().ok())
        .unwrap_or_default();
    replenish_observability::subscriber::init(&LogSettings::default().with_format(format).with_stderr(true));

    let command = Command::parse(std::env::args().skip(1)).context("invalid command line")?;

    let data_dir = std::env::var("REPLENISH_DATA_DIR").unwrap_or_else(|_| {
        tracing::debug!("REPLENISH_DATA_DIR not set; reading ledgers from the working directory");
        ".".to_string()
    });
    let source = RetryingSource::new(JsonFileSource::in_dir(&data_dir), RetryPolicy::default());
    let config = EngineConfig::from_env();

    info!(data_dir = %data_dir, ?command, "replenish starting");

    let service = RestockingService::new(source.clone(), source, config).context("invalid engine configuration")?;
    let output = command
        .execute(&service)
        .with_context(|| format!("failed to run {command:?}"))?;

    match output {
        serde_json::Value::String(text) => println!("{text}"),
        other => println!("{}", serde_json::to_string_pretty(&other)?),
    }
    Ok(())
}
