//! cronwatch CLI Entry Point
//!
//! Inspects the monitoring setup from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Show the status of all monitored jobs
//! cronwatch status
//!
//! # Use an explicit configuration file
//! cronwatch --config /etc/cronwatch.yaml status
//!
//! # Print the metrics that would accompany a report
//! cronwatch metrics
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use log::{debug, error};

use cronwatch::config::MonitorConfig;
use cronwatch::monitoring::MetricsCollector;
use cronwatch::status::{fetch_status, render_table};
use cronwatch::{APP_NAME, VERSION};

/// Config file picked up from the working directory when present.
const DEFAULT_CONFIG_FILE: &str = "cronwatch.yaml";

/// Subcommand selected on the command line.
#[derive(Debug, PartialEq)]
enum Command {
    Status,
    Metrics,
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Cli {
    config_path: Option<PathBuf>,
    command: Option<Command>,
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: cronwatch [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  status              Show the status of all monitored jobs");
    println!("  metrics             Print the current resource metrics as JSON");
    println!();
    println!("Options:");
    println!("  --config PATH       Configuration file (default: ./{} if present)", DEFAULT_CONFIG_FILE);
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Environment:");
    println!("  CRONWATCH_CENTRAL_LOG_URL, CRONWATCH_API_KEY, CRONWATCH_APP_NAME,");
    println!("  CRONWATCH_REPORT_TIMEOUT, CRONWATCH_SLACK_WEBHOOK override the file.");
}

/// Parses command-line arguments.
fn parse_arguments(args: &[String]) -> Result<Cli, String> {
    let mut cli = Cli {
        config_path: None,
        command: None,
        verbose: false,
    };
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                cli.verbose = true;
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    return Err("--config requires a path argument".to_string());
                }
                cli.config_path = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            "status" | "check-status" if cli.command.is_none() => cli.command = Some(Command::Status),
            "metrics" if cli.command.is_none() => cli.command = Some(Command::Metrics),
            _ => return Err(format!("Unexpected argument: {}", arg)),
        }
        i += 1;
    }

    Ok(cli)
}

/// Loads the configuration, falling back to the default file location.
fn load_config(path: Option<PathBuf>) -> Result<MonitorConfig, Box<dyn std::error::Error>> {
    let path = path.or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    });

    Ok(MonitorConfig::load(path.as_deref())?)
}

/// Queries and prints the job status table.
fn run_status(config: &MonitorConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Checking status of monitored cron jobs...");
    debug!("Status endpoint: {}", config.status_url());

    let jobs = fetch_status(config).map_err(|e| {
        error!("Failed to check cron job status: {}", e);
        e
    })?;

    if jobs.is_empty() {
        println!("{}", "No jobs reported by the monitoring server".yellow());
        return Ok(());
    }

    print!("{}", render_table(&jobs, true));
    Ok(())
}

/// Prints a metrics snapshot.
fn run_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let metrics = MetricsCollector::new().collect();
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let cli = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(cli.verbose);

    let Some(command) = cli.command else {
        print_usage();
        return Err("no command given".into());
    };

    let config = load_config(cli.config_path)?;

    match command {
        Command::Status => run_status(&config),
        Command::Metrics => run_metrics(),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
