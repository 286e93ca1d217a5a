//! Bridge one application instance into a dataspace.
//!
//! The UI speaks newline-delimited JSON on stdin/stdout; logs go to stderr.
//!
//! Run:
//!   dataspace-bridge --dataspace ds1.pisys.eu
//!   dataspace-bridge --config bridge.toml --verbose

use clap::Parser;
use dataspace_bridge::{
    BridgeController, Cli, FixedNameGenerator, NameGenerator, RandomNameGenerator, StdioUi,
};
use dataspace_client::WsDataspaceClient;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    let level = if config.verbose_logging { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("dataspace_bridge={level}").parse()?)
                .add_directive(format!("dataspace_client={level}").parse()?),
        )
        .init();

    let endpoint = config.endpoint_url();
    tracing::info!("Joining dataspace {} via {}", config.dataspace_host, endpoint);

    let mut names: Box<dyn NameGenerator> = match cli.name {
        Some(name) => Box::new(FixedNameGenerator::new(name)),
        None => Box::new(RandomNameGenerator::new()),
    };

    let client = WsDataspaceClient::connect(endpoint, config.retry_policy()).await?;
    let controller =
        BridgeController::start(config, names.as_mut(), StdioUi::stdio(), client).await?;

    controller
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
