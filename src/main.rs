//! Optima CLI entry point.

use clap::Parser;

use optima::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = optima::cli::run(cli).await;
    std::process::exit(code);
}
