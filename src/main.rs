use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use locix::index::{stats::print_stats, LocationIndex};
use locix::output;
use locix::records::parse_file;
use locix::server::{daemon, get_socket_path, is_daemon_running, LocationClient, SearchOutcome};
use locix::utils::{get_config_path, get_daemon_log_path, init_logging, AppConfig, LogTarget};
use std::path::PathBuf;
use std::process::ExitCode;
use termcolor::ColorChoice;

#[derive(Parser)]
#[command(name = "locix")]
#[command(about = "In-memory location index for advertising platforms")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
enum Commands {
    /// Find platforms covering a location
    Search {
        /// Location such as /ru/svrd/revda
        location: String,

        /// Search a records file directly instead of the daemon's index
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the daemon's index with a records file
    Upload {
        /// Text file with one `name:loc1,loc2` record per line
        file: PathBuf,
    },
    /// Parse a records file and show the result
    Parse {
        /// Text file with one `name:loc1,loc2` record per line
        file: PathBuf,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Control the location server daemon
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// Show the config file path and effective settings
    Config {
        /// Write the effective settings to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Subcommand)]
enum DaemonAction {
    /// Start the daemon in background
    Start,
    /// Stop the running daemon
    Stop,
    /// Check daemon status
    Status,
    /// Run daemon in foreground (for debugging)
    Foreground,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    // A daemonized child sets up its own file logging after the fork
    if !matches!(cli.command, Commands::Daemon { action: DaemonAction::Start }) {
        init_logging(config.log_filter.as_deref(), cli.verbose, LogTarget::Stderr);
    }

    let color = match cli.color {
        ColorMode::Auto => ColorChoice::Auto,
        ColorMode::Always => ColorChoice::Always,
        ColorMode::Never => ColorChoice::Never,
    };

    match cli.command {
        Commands::Search {
            location,
            data,
            json,
        } => return search(&config, &location, data, json, color),
        Commands::Upload { file } => {
            let socket_path = get_socket_path(&config);
            let mut client = LocationClient::connect_required(&socket_path)?;
            let uploaded = client.upload(&file)?;

            println!("Data uploaded successfully");
            println!("  Platforms:        {}", uploaded.platforms);
            println!("  Locations:        {}", uploaded.locations);
            println!("  Skipped lines:    {}", uploaded.skipped_lines);
            println!("  Failed platforms: {}", uploaded.failed_platforms);
            match uploaded.generation {
                Some(generation) => println!("  Generation:       {}", generation),
                None => println!("  Index unchanged"),
            }
        }
        Commands::Parse { file, json } => {
            let outcome = parse_file(&file)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            if json {
                output::print_json(&outcome)?;
            } else {
                output::print_parse_outcome(&mut output::stdout(color), &outcome)?;
            }
        }
        Commands::Daemon { action } => handle_daemon_command(&config, action)?,
        Commands::Config { save } => {
            if save {
                let path = config.save()?;
                println!("Config written to {}", path.display());
            }
            println!("Config file: {}", get_config_path()?.display());
            println!("Socket:      {}", get_socket_path(&config).display());
            output::print_json(&config)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn search(
    config: &AppConfig,
    location: &str,
    data: Option<PathBuf>,
    json: bool,
    color: ColorChoice,
) -> Result<ExitCode> {
    let names = match data {
        Some(path) => {
            let outcome = parse_file(&path)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            let index = LocationIndex::with_policy(config.empty_upload);
            index.replace(outcome.platforms);

            let mut names: Vec<String> = index
                .search(location)?
                .iter()
                .map(|p| p.name().to_string())
                .collect();
            names.sort();
            names
        }
        None => {
            let socket_path = get_socket_path(config);
            let mut client = LocationClient::connect_required(&socket_path)?;
            match client.search(location)? {
                SearchOutcome::Found(found) => found.platforms,
                SearchOutcome::NotFound => Vec::new(),
            }
        }
    };

    if json {
        output::print_json(&names)?;
    } else if names.is_empty() {
        output::print_not_found(&mut output::stdout(color), location)?;
    } else {
        output::print_platforms(&mut output::stdout(color), location, &names)?;
    }

    Ok(if names.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn handle_daemon_command(config: &AppConfig, action: DaemonAction) -> Result<()> {
    let socket_path = get_socket_path(config);

    match action {
        DaemonAction::Start => {
            if is_daemon_running(&socket_path) {
                println!("Daemon is already running");
                return Ok(());
            }

            println!("Starting locixd daemon...");
            daemon::daemonize(config)?;

            // Wait a moment for daemon to start
            std::thread::sleep(std::time::Duration::from_millis(500));

            if is_daemon_running(&socket_path) {
                println!("Daemon started (socket: {})", socket_path.display());
            } else {
                println!(
                    "Daemon may have failed to start. Check {}",
                    get_daemon_log_path()?.display()
                );
            }
        }

        DaemonAction::Stop => {
            if !is_daemon_running(&socket_path) {
                println!("Daemon is not running");
                return Ok(());
            }

            println!("Stopping daemon...");

            // Try graceful shutdown via client first
            if let Some(mut client) = LocationClient::connect(&socket_path) {
                let _ = client.shutdown();
                std::thread::sleep(std::time::Duration::from_millis(500));
            }

            // Force stop if still running
            if is_daemon_running(&socket_path) {
                daemon::stop_daemon(&socket_path)?;
            }

            println!("Daemon stopped");
        }

        DaemonAction::Status => {
            if !is_daemon_running(&socket_path) {
                println!("Daemon is not running");
                return Ok(());
            }

            match LocationClient::connect(&socket_path) {
                Some(mut client) => match client.status() {
                    Ok(status) => {
                        println!("locixd daemon status:");
                        println!("  Uptime: {}s", status.uptime_secs);
                        println!("  Socket: {}", status.socket_path.display());
                        println!("  Searches served: {}", status.searches_served);
                        println!("  Uploads accepted: {}", status.uploads_accepted);
                        println!("  Empty uploads: {:?}", status.empty_upload);
                        println!();
                        print_stats(&status.index);
                    }
                    Err(e) => {
                        println!("Failed to get status: {}", e);
                    }
                },
                None => {
                    println!("Daemon is running but not accepting connections");
                }
            }
        }

        DaemonAction::Foreground => {
            println!("Running locixd in foreground (Ctrl+C to stop)...");
            daemon::run_foreground(config)?;
        }
    }

    Ok(())
}
