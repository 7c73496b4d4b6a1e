//! # Noteless CLI (`noteless`)
//!
//! ## Usage
//!
//! ```bash
//! noteless --config ./config/noteless.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `noteless init` | Create the SQLite schema and blob root |
//! | `noteless serve` | Run the HTTP server until SIGINT/SIGTERM |
//! | `noteless intake <image>` | OCR a local image and store it as a note |
//! | `noteless commands` | Print the commands found so far as JSON |
//! | `noteless rules` | Print the command rule text |
//! | `noteless audit` | Report images without records and records without images |

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use noteless::services::{self, Services};
use noteless::{audit, config, logging, server};

/// Noteless: snap notes, OCR them, and extract commands.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/noteless.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "noteless",
    about = "Noteless: snap handwritten notes, OCR them, and extract commands",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/noteless.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the record database and blob root.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Start the HTTP server.
    Serve,

    /// Run a local image through the intake pipeline.
    Intake {
        /// Path to the image file.
        image: PathBuf,
    },

    /// Print every command found across stored notes, as a JSON array.
    Commands,

    /// Print the rule text used for command extraction.
    Rules,

    /// Report orphan image blobs and note records.
    Audit {
        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            services::initialize(&cfg).await?;
            println!("Noteless initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Intake { image } => {
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("Failed to read image {}", image.display()))?;
            let services = Services::from_config(&cfg).await?;
            let outcome = services.intake().intake_image(&bytes).await?;
            println!("{}", outcome.message());
        }
        Commands::Commands => {
            let services = Services::from_config(&cfg).await?;
            let commands: Vec<String> = services
                .listing()
                .list_commands()
                .await?
                .into_iter()
                .collect();
            println!("{}", serde_json::to_string_pretty(&commands)?);
        }
        Commands::Rules => {
            print!("{}", cfg.commands.rule_set().render_text());
        }
        Commands::Audit { json } => {
            let services = Services::from_config(&cfg).await?;
            let report = audit::audit(services.blobs.as_ref(), services.records.as_ref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Notes: {}", report.notes);
                println!("Orphan images: {}", report.orphan_blobs.len());
                for key in &report.orphan_blobs {
                    println!("  {}", key);
                }
                println!("Orphan records: {}", report.orphan_records.len());
                for key in &report.orphan_records {
                    println!("  {}", key);
                }
            }
        }
    }

    Ok(())
}
