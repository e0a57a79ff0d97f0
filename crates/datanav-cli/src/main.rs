//! Data Model Navigator CLI
//!
//! Sequences the pipeline phases:
//! 1. `discover`: connect to PostgreSQL/MongoDB, extract entities, counts
//!    and anonymized samples (optionally with LLM guidance)
//! 2. `curate`:   technical-field cleanup + relationship suggestions, plus
//!    manual links
//! 3. `viewer`:   render the self-contained interactive HTML explorer
//! 4. `json`:     print the model document
//!
//! With no subcommand (or `--menu`) the CLI starts an interactive menu
//! looping over the same phases.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod phases;
mod profile;
mod viewer;

#[derive(Parser)]
#[command(name = "datanav")]
#[command(
    author,
    version,
    about = "Data Model Navigator: schema discovery, curation, and an interactive E/R viewer"
)]
struct Cli {
    /// Start the interactive menu (default when no phase is given)
    #[arg(long)]
    menu: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover entities from PostgreSQL/MongoDB into the model file
    Discover,
    /// Clean technical fields and curate relationships
    Curate,
    /// Render the interactive HTML viewer
    Viewer {
        /// Open the generated viewer in the default browser
        #[arg(long)]
        open_browser: bool,
    },
    /// Print the model document as JSON
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        _ if cli.menu => phases::interactive_menu(),
        None => phases::interactive_menu(),
        Some(Commands::Discover) => phases::phase_discovery(),
        Some(Commands::Curate) => phases::phase_curation(),
        Some(Commands::Viewer { open_browser }) => phases::phase_viewer(open_browser),
        Some(Commands::Json) => phases::phase_show_json(),
    }
}
