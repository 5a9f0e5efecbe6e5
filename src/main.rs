//! msig CLI Application
//!
//! Offline tooling for preparing, signing, and checking engine transactions.

use clap::{Parser, Subcommand};
use msig::cli;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "msig")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Threshold multisignature transaction tooling", long_about = None)]
struct Cli {
    /// Transaction template to read
    #[arg(short, long, global = true, default_value = "./tx.json")]
    input: PathBuf,

    /// Where to write the transaction template
    #[arg(short, long, global = true, default_value = "./tx.json")]
    output: PathBuf,

    /// Engine deployment description (address, members, threshold)
    #[arg(short, long, global = true, default_value = "./deploy.json")]
    deploy: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write bare tx and deploy templates
    Bare,

    /// Print the domain separator, action hash, and signing hash
    Digest,

    /// Sign the transaction with a member key
    Sign {
        /// Hex private key
        #[arg(short, long, env = "MSIG_KEY", hide_env_values = true)]
        key: String,
    },

    /// Check collected signatures against the deploy member set
    Verify,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Bare => cli::cmd_bare(&cli.output, &cli.deploy),
        Commands::Digest => cli::cmd_digest(&cli.input),
        Commands::Sign { key } => cli::cmd_sign(&cli.input, &cli.output, &key),
        Commands::Verify => cli::cmd_verify(&cli.input, &cli.deploy),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}
