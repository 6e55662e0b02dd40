//! Contribution proof - scoring for a decentralized data pool

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contribution_proof::{
    config::{Args, LogFormat},
    proof,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("contribution_proof={},info", args.log_level).into());
    match args.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Contribution Proof v{}", env!("CARGO_PKG_VERSION"));
    info!("======================================");
    info!("Environment: {}", args.node_env);
    info!("DLP ID: {}", args.dlp_id);
    info!("Input: {}", args.input_dir().display());
    info!("Output: {}", args.output_dir().display());
    info!(
        "Validator: {}",
        args.validator_base_api_url.as_deref().unwrap_or_default()
    );
    info!("File ID: {}", args.file_id.as_deref().unwrap_or("(unset)"));
    info!(
        "Cache: {}",
        match args.cache.redis_host.as_deref() {
            Some(host) if !host.is_empty() => format!("{}:{}", host, args.cache.redis_port),
            _ => "disabled".to_string(),
        }
    );
    info!(
        "Signature: {}",
        if args.signature.is_some() { "set" } else { "unset" }
    );
    info!("Uniqueness field policy: {}", args.field_policy);
    info!("Max concurrent downloads: {}", args.max_concurrent_downloads);

    match proof::run(&args).await {
        Ok(response) => {
            info!(score = response.score, valid = response.valid, "Proof generation complete");
            Ok(())
        }
        Err(e) => {
            error!("Error during proof generation: {}", e);
            std::process::exit(1);
        }
    }
}
