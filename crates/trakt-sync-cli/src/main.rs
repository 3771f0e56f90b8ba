use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use commands::{auth, config, daemon, install_service, status, sync, AppContext, PreconditionFailed};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod logging;
mod output;

/// Exit status for invalid config, missing authentication or a failed token refresh.
const EXIT_PRECONDITION: u8 = 3;

#[derive(Parser)]
#[command(name = "trakt-sync")]
#[command(about = "Keep Trakt lists filled with what is trending and most watched")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.config/trakt-sync/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Compute and report changes without writing to Trakt
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize trakt-sync with your Trakt account (device flow)
    #[command(long_about = "Start the Trakt device authorization flow. Open the printed URL, enter the code, and trakt-sync stores the resulting tokens in the credentials file.")]
    Auth,

    /// Run a single sync pass
    #[command(long_about = "Fetch the configured ranked categories and reconcile every enabled managed list. The access token is refreshed first when it expires within the hour.")]
    Sync {
        /// Only sync these lists (comma-separated slugs)
        #[arg(long, value_delimiter = ',', value_name = "SLUGS")]
        lists: Vec<String>,

        /// Replace every list completely instead of syncing incrementally
        #[arg(long, action = ArgAction::SetTrue)]
        full_refresh: bool,
    },

    /// Sync on a fixed interval until stopped
    #[command(long_about = "Run a sync pass immediately and then once per interval. Ctrl-C or SIGTERM stop the daemon after the current pass finishes.")]
    Daemon {
        /// Time between passes, e.g. '6h' or '90m' (defaults to daemon.interval)
        #[arg(long, value_name = "DURATION")]
        interval: Option<String>,
    },

    /// Show configuration, authentication and refresh state
    Status,

    /// Inspect or change configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },

    /// Write a systemd unit that runs the daemon
    InstallService {
        /// Where to write the unit file
        #[arg(long, default_value = install_service::DEFAULT_UNIT_PATH)]
        path: PathBuf,

        /// Run the service as this user
        #[arg(long)]
        user: Option<String>,

        /// Sync interval for the service (defaults to daemon.interval)
        #[arg(long, value_name = "DURATION")]
        interval: Option<String>,

        /// Binary to run (defaults to the current executable)
        #[arg(long)]
        binary: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Check the configuration and report the first problem
    Validate,

    /// Show the current configuration (masks secrets)
    Show {
        /// Show secrets unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Set Trakt API credentials and authorize
    #[command(long_about = "Configure Trakt API credentials and run the device authorization flow. Create an API application at https://trakt.tv/oauth/applications first.")]
    Trakt {
        /// Trakt Client ID (prompted when omitted)
        #[arg(long)]
        client_id: Option<String>,

        /// Trakt Client Secret (prompted when omitted)
        #[arg(long)]
        client_secret: Option<String>,

        /// Trakt username owning the lists (prompted when omitted)
        #[arg(long)]
        username: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let output = output::Output::new(cli.output, cli.quiet);

    match run(cli, &output).await {
        Ok(code) => Ok(code),
        Err(report) => match report.downcast_ref::<PreconditionFailed>() {
            Some(failure) => {
                output.error(failure.to_string());
                Ok(ExitCode::from(EXIT_PRECONDITION))
            }
            None => Err(report),
        },
    }
}

async fn run(cli: Cli, output: &output::Output) -> Result<ExitCode> {
    let mut ctx = AppContext::load(cli.config.clone())?;

    logging::init_logging(cli.verbose, cli.quiet, &ctx.config.logging)
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

    match cli.command {
        Commands::Auth => auth::run_auth(&mut ctx, output).await,
        Commands::Sync { lists, full_refresh } => {
            let options = sync::PassOptions {
                lists: (!lists.is_empty()).then_some(lists),
                full_refresh,
                dry_run: cli.dry_run,
            };
            sync::run_sync(&mut ctx, &options, output).await
        }
        Commands::Daemon { interval } => daemon::run_daemon(ctx, interval, cli.dry_run, output).await,
        Commands::Status => status::run_status(&ctx, output),
        Commands::Config { cmd } => config::run_config(&mut ctx, cmd, output).await,
        Commands::InstallService {
            path,
            user,
            interval,
            binary,
        } => {
            let options = install_service::ServiceOptions {
                path,
                user,
                interval,
                binary,
                config: cli.config,
            };
            install_service::run_install(&ctx, options, output)
        }
    }
}
