use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout belongs to the status line; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("encore=info".parse()?))
        .init();

    info!("encore v{}", env!("CARGO_PKG_VERSION"));

    encore::runtime::run().await
}
