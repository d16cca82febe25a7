use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use triplog::{load_records, Config, Error, LocatorRegistry, LogSink, Orchestrator};

#[derive(Parser)]
#[command(name = "triplog")]
#[command(about = "Batch trip-log uploader")]
#[command(version)]
struct Cli {
    /// CSV file of trip records to submit
    input: PathBuf,

    /// Engine config file (YAML)
    #[arg(short, long, default_value = "triplog.yaml")]
    config: PathBuf,

    /// Validate config and input without running
    #[arg(long)]
    check: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> triplog::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let config = Config::load(&cli.config)?;

    let user = triplog::orchestrator::os_username();
    if !config.is_authorized(&user) {
        return Err(Error::Unauthorized(user));
    }

    let records = load_records(&cli.input)?;

    if cli.check {
        println!("Config valid");
        println!("  Target: {}", config.target.url);
        println!("  WebDriver: {}", config.webdriver.url);
        println!("  Ledger: {}", config.ledger);
        println!("  Confirm policy: {:?}", config.confirm);
        println!("  Trips: {}", records.len());
        return Ok(());
    }

    println!("Running as {user}: {} trip(s)", records.len());

    let orchestrator = Orchestrator::new(config, LocatorRegistry::knack());
    let summary = orchestrator.run(&records, &LogSink).await?;

    println!();
    if summary.submitted == summary.total {
        println!("✓ Submitted {}/{} trips", summary.submitted, summary.total);
    } else {
        println!("✗ Submitted {}/{} trips", summary.submitted, summary.total);
    }
    println!("  Ledger: {}", summary.ledger_path.display());

    if summary.submitted < summary.total {
        std::process::exit(1);
    }

    Ok(())
}
