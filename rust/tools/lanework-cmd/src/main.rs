use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod utils;

#[derive(Parser)]
#[command(name = "lanework-cmd")]
#[command(about = "Command-line utility for lane-parallel item processing")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how items are assigned to lanes
    Plan {
        /// Number of lanes
        #[arg(short, long, default_value_t = lanework::config::DEFAULT_LANE_COUNT)]
        lanes: usize,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,

        /// Items to assign, in order
        items: Vec<String>,
    },

    /// Copy source files into a directory, several at a time
    Fetch {
        /// Number of lanes (overrides the config file)
        #[arg(short, long)]
        lanes: Option<usize>,

        /// Path to a JSON executor config
        #[arg(long)]
        config: Option<String>,

        /// Give up after this many milliseconds (overrides the config file)
        #[arg(long)]
        deadline_ms: Option<u64>,

        /// Source file path or file:// URL (can be specified multiple times)
        #[arg(short, long, required = true)]
        source: Vec<String>,

        /// Output directory
        out_dir: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose);

    match cli.command {
        Commands::Plan { lanes, json, items } => commands::plan::run(lanes, json, items),
        Commands::Fetch {
            lanes,
            config,
            deadline_ms,
            source,
            out_dir,
        } => commands::fetch::run(
            commands::fetch::FetchArgs {
                lanes,
                config,
                deadline_ms,
            },
            source,
            out_dir,
        ),
    }
}
