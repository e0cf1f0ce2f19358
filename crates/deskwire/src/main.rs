// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deskwire - a multichannel customer-support desk.
//!
//! This is the binary entry point for the Deskwire server.

mod serve;

use clap::{Parser, Subcommand};

/// Deskwire - a multichannel customer-support desk.
#[derive(Parser, Debug)]
#[command(name = "deskwire", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Deskwire desk server.
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match deskwire_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            deskwire_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("deskwire serve failed: {e}");
                std::process::exit(1);
            }
        }
        None => {
            println!("deskwire: use --help for available commands");
        }
    }
}
