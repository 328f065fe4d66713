use clap::Parser;
use sapi_server::cli::Cli;

#[tokio::main]
async fn main() {
    if let Err(e) = sapi_server::commands::run(Cli::parse()).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
