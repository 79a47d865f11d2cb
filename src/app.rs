//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::config;
use crate::logging;
use crate::quality::QualityTier;
use crate::setup;
use anyhow::anyhow;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::process;

/// Checks if setup is needed (version mismatch or missing config) and runs setup if required.
///
/// This is called early in the startup sequence, before command handling.
/// It checks:
/// 1. If config file doesn't exist, runs full setup
/// 2. If config version is older than app version, runs setup again
/// 3. If config version matches app version, does nothing
async fn check_and_run_setup() -> Result<(), anyhow::Error> {
    let config_path = config::get_config_path()?;

    match setup::check_setup_needed(&config_path)? {
        setup::SetupNeed::FirstRun => {
            tracing::info!("No config found, running first-time setup");
            setup::run_setup().map_err(|e| {
                tracing::error!("Setup failed: {e}");
                anyhow!("Setup failed: {e}")
            })?;
        }
        setup::SetupNeed::Upgrade { from } => {
            tracing::info!(
                "Config stamped {from}, re-running setup for {}",
                env!("CARGO_PKG_VERSION")
            );
            setup::run_setup().map_err(|e| {
                tracing::error!("Setup failed: {e}");
                anyhow!("Setup failed: {e}")
            })?;
        }
        setup::SetupNeed::UpToDate => {
            tracing::debug!("Config version up to date ({})", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// A terminal recording booth with live level meters and studio upload
#[derive(Parser)]
#[command(name = "recbooth")]
#[command(version)]
#[command(about = "\n\n ┏┓┏┓┏┓ \n ┛ ┗┛┗┛")]
#[command(long_about = "\n\n ┏┓┏┓┏┓ \n ┛ ┗┛┗┛\n\nA terminal recording booth: capture audio with live level meters and\nupload finished takes to your studio server.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used by default.\n    The quality option (-q) can be used without explicitly saying 'record'.\n\nEXAMPLES:\n    # Record at the configured default quality\n    $ recbooth\n\n    # Record a quick low-quality note\n    $ recbooth -q low\n    $ recbooth record -q low\n\n    # Browse and play back uploaded recordings\n    $ recbooth library\n\n    # List recordings without the UI\n    $ recbooth list\n\n    # Edit configuration file\n    $ recbooth config")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/recbooth/recbooth.toml\n    Logs:               ~/.local/state/recbooth/recbooth.log.*"
)]
struct Cli {
    /// Recording quality tier for this session (record default command)
    #[arg(short, long, global = true, value_enum)]
    quality: Option<QualityTier>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a session and upload it (default)
    ///
    /// Press Space to pause/resume, Enter to finish and upload,
    /// Escape/q to cancel. SIGUSR1 finishes the session externally.
    #[command(visible_alias = "r")]
    Record {
        /// Recording quality tier for this session
        #[arg(short, long, value_enum)]
        quality: Option<QualityTier>,
    },

    /// Browse and play back uploaded recordings
    ///
    /// Arrow keys select, Enter plays or pauses, 's' stops, 'x' stops all,
    /// 'd' deletes, 'r' refreshes, Esc/q exits.
    #[command(visible_alias = "l")]
    Library,

    /// List recordings on the studio server
    ///
    /// Plain text output, one line per recording. Suitable for scripts.
    List,

    /// Open configuration file in your preferred editor
    ///
    /// Edit server and audio settings. Uses $EDITOR environment variable
    /// or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names, configurations and supported quality tiers
    /// to help configure the input device in recbooth.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    /// Useful for troubleshooting issues.
    Logs,

    /// Generate shell completion script
    ///
    /// Generate completion script for your shell. Save the output to your
    /// shell's completion directory or source it directly.
    ///
    /// Examples:
    ///   recbooth completions bash > recbooth.bash
    ///   recbooth completions zsh > _recbooth
    ///   recbooth completions fish > recbooth.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If setup fails
/// - If logging initialization fails
/// - If command execution fails (e.g., recording, upload, library viewing)
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Handle commands that don't need logging or config setup
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "recbooth", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    // Initialize logging for all other commands
    logging::init_logging()?;

    // Check if setup is needed (version check or missing config)
    check_and_run_setup().await?;

    // Route to appropriate command handler
    match cli.command {
        None | Some(Commands::Record { .. }) => {
            // Default command is record
            // Merge the global quality option with the explicit record option
            // If both are specified, the explicit record option takes precedence
            let quality = match cli.command {
                Some(Commands::Record { quality }) => quality.or(cli.quality),
                None => cli.quality,
                _ => unreachable!(),
            };
            commands::handle_record(quality).await?;
        }
        Some(Commands::Library) => {
            commands::handle_library().await?;
        }
        Some(Commands::List) => {
            commands::handle_list().await?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
