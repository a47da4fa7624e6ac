mod scheduler;
mod server;
mod trigger;

use anyhow::Context;
use autopunch_core::{Config, Params, PunchAction};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use trigger::PunchTrigger;

#[derive(Parser)]
#[command(name = "autopunch")]
#[command(about = "Twice-daily attendance punching against a web time clock")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(short, long, default_value = "configs/example.yaml")]
    config: PathBuf,

    /// Run in headless mode (overrides config)
    #[arg(long)]
    headless: bool,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Verbose output (-v for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one punch cycle now
    Run {
        /// punch-in or punch-out
        action: String,
    },
    /// Run the scheduler and the HTTP control server
    Serve,
    /// Validate the config without running
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::INFO,
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

    let params = Params::from_args(&cli.params)?;
    let mut config = Config::load_with_params(&cli.config, &params)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    if cli.headless {
        config.browser.headless = true;
    }

    match cli.command {
        Command::Check => check(&config),
        Command::Run { action } => run_once(config, &action).await,
        Command::Serve => serve(config).await,
    }
}

fn check(config: &Config) -> anyhow::Result<()> {
    println!("Config valid: {}", config.name);
    println!("  Target: {}", config.target.url);
    println!(
        "  Schedule: punch-in {} / punch-out {} ({})",
        config.schedule.punch_in, config.schedule.punch_out, config.schedule.timezone
    );
    println!("  Report dir: {}", config.report.dir);
    println!(
        "  Email: {}",
        if config.email.is_some() {
            "configured"
        } else {
            "off"
        }
    );
    if !config.params.is_empty() {
        println!("  Parameters: {}", config.params.len());
        for (name, spec) in &config.params {
            let req = if spec.required { " (required)" } else { "" };
            let desc = spec.description.as_deref().unwrap_or("");
            println!("    - {}{}: {}", name, req, desc);
        }
    }
    if let Some(ref retry) = config.retry {
        println!("  Retry attempts: {}", retry.attempts);
    }
    Ok(())
}

async fn run_once(config: Config, action: &str) -> anyhow::Result<()> {
    let action = PunchAction::parse(action)
        .with_context(|| format!("unknown action '{action}', expected punch-in or punch-out"))?;

    let trigger = PunchTrigger::new(Arc::new(config))?;
    let Ok(outcome) = trigger.trigger(action).await else {
        anyhow::bail!("a punch cycle is already running");
    };

    println!();
    if outcome.succeeded {
        println!("✓ {} at {}", action.label(), outcome.timestamp);
        if let Some(locator) = outcome.locator_used {
            println!("  Locator: {}", locator);
        }
    } else {
        println!("✗ {} failed", action.label());
        if let Some(reason) = outcome.failure_reason {
            println!("  Reason: {}", reason);
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let trigger = Arc::new(PunchTrigger::new(config.clone())?);

    // Handle must outlive the server for the jobs to fire.
    let _sched = scheduler::start(&config.schedule, trigger.clone()).await?;

    server::serve(server::AppState { config, trigger }).await
}
