//! Studio session tool - drives the console's login and token lifecycle from a terminal.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use studio_config_and_utils::{init_logging, Config, Paths};

/// Studio session command-line interface.
#[derive(Parser)]
#[command(name = "studio-session")]
#[command(about = "Studio console session and token lifecycle")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Overrides `log_level` in config.json
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (config, cookies, logs). Defaults to ~/.studio
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the loading page for an entry URL
    Bootstrap {
        /// Loading-page URL, e.g. http://localhost:3000/loading?code=...
        #[arg(long)]
        url: String,
        /// Keep refresh timers running until Ctrl-C
        #[arg(short, long)]
        watch: bool,
    },
    /// Print the stored session
    Status,
    /// Run one refresh cycle now
    Refresh,
    /// Clear the stored session
    Logout,
    /// Print the authorize URL for a fresh login
    AuthorizeUrl,
    /// Confirm a signup with the emailed code
    ConfirmOtp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
    },
    /// Send a new signup code
    ResendOtp {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = Paths::resolve(cli.base_dir)?;
    let config = Config::load(&paths)?;
    init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level), &paths);

    let app = app::App::open(config, &paths)?;

    match cli.command {
        Commands::Bootstrap { url, watch } => app.bootstrap(&url, watch).await?,
        Commands::Status => app.status()?,
        Commands::Refresh => app.refresh().await?,
        Commands::Logout => app.logout(),
        Commands::AuthorizeUrl => app.authorize_url().await,
        Commands::ConfirmOtp { email, code } => app.confirm_otp(&email, &code).await?,
        Commands::ResendOtp { email } => app.resend_otp(&email).await?,
    }

    Ok(())
}
