use clap::Parser;
use slack_threads::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "slack_threads=warn".into()),
        )
        .init();

    // Both ring and aws-lc-rs can end up linked in; pick one explicitly.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();

    if let Err(e) = slack_threads::commands::run_fetch_threads(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
