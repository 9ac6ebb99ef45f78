use almatoolkit::constants;
use anyhow::Result;
use clap::{Parser, Subcommand};

// CLI Commands (cmd_ prefix)
mod cmd_cancel_requests;
mod cmd_cleanup_call_numbers;
mod cmd_conf_dump;
mod cmd_requests;
mod cmd_scan_in;

// Helper modules (no cmd_ prefix)
mod logger;
mod progress;
mod utils;

/// Format custom help template with grouped commands
fn format_help_template() -> &'static str {
    concat!(
        "{about-with-newline}\n\n",
        "{usage-heading}\n  {usage}\n\n",
        "Options:\n{options}\n\n",
        "Items:\n",
        "  items-scan-in               Scan in the members of a logical set of items\n",
        "  items-requests              List the open requests on a set's items\n",
        "  items-cancel-requests       Cancel matching requests on a set's items\n",
        "\n",
        "Bibs:\n",
        "  bibs-clean-up-call-numbers  Clean up holding call numbers of a set's bibs\n",
        "\n",
        "Configuration:\n",
        "  conf-dump                   Print libraries, departments and code tables\n",
        "\n",
        "Every flag can also be set through an environment variable, e.g.\n",
        "ALMATOOLKIT_KEY or ALMATOOLKIT_ITEMSSCANIN_SETNAME.\n\n",
        "See 'almatoolkit <COMMAND> --help' for more information on a specific command.\n"
    )
}

#[derive(Parser)]
#[command(bin_name = "almatoolkit")]
#[command(version = constants::VERSION)]
#[command(about = concat!("almatoolkit v", env!("CARGO_PKG_VERSION"), " - bulk operations on Alma sets"))]
#[command(long_about = concat!(
    "almatoolkit v", env!("CARGO_PKG_VERSION"), " - bulk operations on Alma sets\n\n",
    "Runs an operation on every member of an Alma set through the Alma REST API,\n",
    "concurrently, stopping once the daily API call budget falls to the threshold.\n",
    "Reports are written to stdout as CSV, progress and errors to stderr."
))]
#[command(propagate_version = true)]
#[command(help_template = format_help_template())]
pub struct Cli {
    /// Alma API key
    #[arg(long, global = true, env = "ALMATOOLKIT_KEY", hide_env_values = true, default_value = "")]
    key: String,

    /// Alma API server
    #[arg(long, global = true, env = "ALMATOOLKIT_SERVER", default_value = constants::DEFAULT_API_URL)]
    server: String,

    /// Stop once the server reports this many remaining API calls or fewer
    #[arg(long, global = true, env = "ALMATOOLKIT_THRESHOLD", default_value_t = constants::DEFAULT_THRESHOLD)]
    threshold: u64,

    /// Number of concurrent workers (default: one per CPU)
    #[arg(long, global = true, env = "ALMATOOLKIT_WORKERS")]
    workers: Option<usize>,

    /// Suppress progress output
    #[arg(long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn globals(&self) -> utils::GlobalOptions {
        utils::GlobalOptions {
            key: self.key.clone(),
            server: self.server.clone(),
            threshold: self.threshold,
            workers: self.workers,
            quiet: self.quiet,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "items-scan-in")]
    ItemsScanIn(cmd_scan_in::ScanInCommand),
    #[command(name = "items-requests")]
    ItemsRequests(cmd_requests::RequestsCommand),
    #[command(name = "items-cancel-requests")]
    ItemsCancelRequests(cmd_cancel_requests::CancelRequestsCommand),
    #[command(name = "bibs-clean-up-call-numbers")]
    BibsCleanUpCallNumbers(cmd_cleanup_call_numbers::CleanupCallNumbersCommand),
    #[command(name = "conf-dump")]
    ConfDump(cmd_conf_dump::ConfDumpCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger based on verbosity flags
    logger::init_logger(cli.verbose, cli.quiet);

    let globals = cli.globals();
    match cli.command {
        Commands::ItemsScanIn(cmd) => cmd_scan_in::run(cmd, globals)?,
        Commands::ItemsRequests(cmd) => cmd_requests::run(cmd, globals)?,
        Commands::ItemsCancelRequests(cmd) => cmd_cancel_requests::run(cmd, globals)?,
        Commands::BibsCleanUpCallNumbers(cmd) => cmd_cleanup_call_numbers::run(cmd, globals)?,
        Commands::ConfDump(cmd) => cmd_conf_dump::run(cmd, globals)?,
    }

    Ok(())
}
