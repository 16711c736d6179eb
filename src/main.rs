use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use pagebridge::logging;
use pagebridge::store::{ConfigStore, JsonFileStore};
use pagebridge::transfer::{export_config, import_bundle, parse_bundle};

#[derive(Parser)]
#[command(name = "pagebridge", version, about = "Inspect and move page automation settings")]
struct Cli {
    /// Store directory (defaults to ~/.pagebridge)
    #[arg(long, global = true, env = "PAGEBRIDGE_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current configuration as JSON
    Show,
    /// Write saved logins and scripts to a bundle file (stdout by default)
    Export {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Merge a bundle file into the store; existing names are kept
    Import { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_from_env();

    let cli = Cli::parse();
    let root = cli.store.unwrap_or_else(JsonFileStore::default_root);
    let store = JsonFileStore::new(root);

    match cli.command {
        Command::Show => {
            let config = store.load_config().await?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Export { out } => {
            let bundle = export_config(&store.load_config().await?);
            let json = serde_json::to_string_pretty(&bundle)?;
            match out {
                Some(path) => {
                    tokio::fs::write(&path, json).await?;
                    println!("exported to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Import { file } => {
            let text = tokio::fs::read_to_string(&file).await?;
            let bundle = parse_bundle(&text)?;
            let mut config = store.load_config().await?;
            let summary = import_bundle(&mut config, &bundle);
            store.save_config(&config).await?;
            println!(
                "imported {} entries ({} scripts, {} logins), skipped {}",
                summary.added(),
                summary.added_scripts,
                summary.added_codes,
                summary.skipped
            );
        }
    }

    Ok(())
}
