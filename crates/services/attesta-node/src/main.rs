use attesta_config::{load_node_config, CliArgs};
use attesta_node_lib::run_node;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = CliArgs::parse();
    let config = load_node_config(&args.config_path)?;

    if let Err(e) = run_node(config).await {
        tracing::error!(error = %e, "node service error");
        std::process::exit(1);
    }
    Ok(())
}
