//! Binary entrypoint for the todotree tool

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr so command output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    todotree::Config::load_dotenv();

    if let Err(e) = todotree::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
