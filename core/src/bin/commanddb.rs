//! CommandDB CLI
//!
//! Manages the command store and runs stored commands from a terminal, or
//! as the long-running engine daemon (`commanddb serve`).

use commanddb_core::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
