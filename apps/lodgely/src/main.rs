use clap::Parser;
use lodgely::cli::{Cli, run};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lodgely=info,tower_http=info"));
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::error!(error = %err, "lodgely failed");
        std::process::exit(1);
    }
}
