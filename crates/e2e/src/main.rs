//! MedMeet conformance harness - command-line entry point

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::error;

use medmeet_e2e::config::{BASE_URL_ENV, DEFAULT_BASE_URL};
use medmeet_e2e::probe::{self, ProbeSpec};
use medmeet_e2e::{run_suite, ApiClient, HarnessConfig, OutputFormat, Suite, SuiteSummary};

/// Conformance and regression checks for a deployed MedMeet API
#[derive(Parser, Debug)]
#[command(name = "medmeet-e2e")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Deployment to test
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// Per-request transport timeout
    #[arg(long, default_value = "30", global = true)]
    timeout_secs: u64,

    /// Summary format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Directory for results files
    #[arg(short, long, default_value = "test-results", global = true)]
    output: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scripted suite
    Run {
        #[arg(short, long, value_enum, default_value = "full")]
        suite: Suite,

        /// Also write <output>/<suite>-results.json
        #[arg(long)]
        write_results: bool,
    },

    /// Run YAML probe specs from a file or directory
    Probe {
        path: PathBuf,

        #[arg(long)]
        write_results: bool,
    },

    /// GET raw paths and show what the deployment answers
    Paths {
        /// Paths relative to the deployment root
        paths: Vec<String>,
    },

    /// Show how known cookie headers are parsed into a session
    Cookies,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    // Checks run strictly in sequence on one thread.
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(cli)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(cli: Cli) -> anyhow::Result<bool> {
    let mut config = HarnessConfig::for_base_url(&cli.base_url)?;
    config.request_timeout = Duration::from_secs(cli.timeout_secs);
    config.output_dir = cli.output.clone();

    match cli.command {
        Commands::Run {
            suite,
            write_results,
        } => {
            let outcome = run_suite(suite, config.clone()).await?;
            finish(&outcome.summary, cli.format, write_results.then_some(&config.output_dir))?;
            Ok(outcome.passed)
        }
        Commands::Probe {
            path,
            write_results,
        } => {
            let specs = ProbeSpec::load(&path)?;
            let client = ApiClient::new(config.clone())?;
            let summary = probe::run_probes(&client, &specs).await;
            finish(&summary, cli.format, write_results.then_some(&config.output_dir))?;
            Ok(summary.all_passed())
        }
        Commands::Paths { paths } => {
            let paths = if paths.is_empty() {
                probe::DEFAULT_PATHS.iter().map(|p| p.to_string()).collect()
            } else {
                paths
            };
            let client = ApiClient::new(config)?;
            let summary = probe::probe_paths(&client, &paths).await;
            finish(&summary, cli.format, None)?;
            Ok(summary.all_passed())
        }
        Commands::Cookies => {
            let cases = probe::cookie_probe();
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&cases)?),
                _ => {
                    for case in &cases {
                        println!(
                            "{:<36} -> {}",
                            format!("{:?}", case.header),
                            case.user_id.as_deref().unwrap_or("(no session)")
                        );
                    }
                }
            }
            Ok(true)
        }
    }
}

fn finish(
    summary: &SuiteSummary,
    format: OutputFormat,
    results_dir: Option<&PathBuf>,
) -> anyhow::Result<()> {
    println!("{}", summary.render(format));
    if let Some(dir) = results_dir {
        summary.write_json(dir)?;
    }
    Ok(())
}
