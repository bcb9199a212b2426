mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{categorize::categorize_command, control, run::run_agent, settings::SetArgs};

#[derive(Parser)]
#[command(name = "tabwatch")]
#[command(about = "Browser tab activity agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the agent (launched by the browser as a native messaging host)
    Run,
    /// Show agent status
    Status,
    /// Resume tracking
    Enable,
    /// Pause tracking
    Disable,
    /// Show current settings
    Settings {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Change settings; only the given options are touched
    Set(SetArgs),
    /// Force a connection attempt to the server
    TestConnection,
    /// Show how a URL would be categorized (offline)
    Categorize {
        url: String,
        /// Page title, used for client keyword matching
        #[arg(short, long)]
        title: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout belongs to the browser while running as a host
    if !matches!(cli.command, Commands::Run) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .format_timestamp_secs()
            .init();
    }

    match cli.command {
        Commands::Run => run_agent().await,
        Commands::Status => control::show_status().await,
        Commands::Enable => control::set_enabled(true).await,
        Commands::Disable => control::set_enabled(false).await,
        Commands::Settings { json } => control::show_settings(json).await,
        Commands::Set(args) => control::save_settings(args.into_patch()?).await,
        Commands::TestConnection => control::test_connection().await,
        Commands::Categorize { url, title } => categorize_command(&url, title.as_deref()),
    }
}
