use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

use dripfeed::distribution::{
    Collaborators, DistributionController, EndReason, SessionSummary, SummaryTone, plan_candidates,
};
use dripfeed::history::SessionHistory;
use dripfeed::notify::LogNotifier;
use dripfeed::sources::HttpTransferApi;

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dripfeed")
}

fn setup_logging(cli: &Cli, config: &Config) -> Result<()> {
    // Create log directory
    let log_dir = data_dir().join("logs");
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("dripfeed.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let default_level = if cli.is_verbose() {
        "debug"
    } else {
        config.log_level.as_deref().unwrap_or("info")
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_controller(config: &Config) -> Result<DistributionController> {
    let api = HttpTransferApi::new(config.api_config()?).context("Failed to create HTTP client")?;
    let collab = Collaborators::from_backend(api, Arc::new(LogNotifier));
    Ok(DistributionController::new(collab, config.distribution_config()?))
}

fn open_history() -> Result<SessionHistory> {
    SessionHistory::new(data_dir().join("history")).context("Failed to open session history")
}

fn print_summary(summary: &SessionSummary) {
    let headline = match summary.tone() {
        SummaryTone::Success => "Distribution finished:".green(),
        SummaryTone::Failure => "Distribution delivered nothing:".red(),
        SummaryTone::Silent => "Nothing to distribute:".yellow(),
    };
    println!("{} {}", headline, summary);
}

fn record_summary(history: &SessionHistory, summary: &SessionSummary) {
    if let Err(e) = history.append(summary) {
        log::warn!("Failed to record session history: {}", e);
    }
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run { now } => handle_run_command(*now, config).await,
        Commands::Once { json } => handle_once_command(*json, config).await,
        Commands::Preview => handle_preview_command(config).await,
        Commands::History { limit } => handle_history_command(*limit),
    }
}

async fn handle_run_command(now: bool, config: &Config) -> Result<()> {
    let controller = build_controller(config)?;
    let history = open_history()?;
    let mut summaries = controller.subscribe();

    let mut trigger = tokio::time::interval(config.trigger_interval());
    trigger.set_missed_tick_behavior(MissedTickBehavior::Delay);
    if !now {
        // The first tick of an interval completes immediately
        trigger.tick().await;
    }

    info!("Distribution daemon running, trigger every {}s", config.trigger.interval_secs);
    println!(
        "{} trigger every {}s, Ctrl-C to stop",
        "Running:".cyan(),
        config.trigger.interval_secs
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, stopping");
                break;
            }
            changed = summaries.changed() => {
                if changed.is_err() {
                    break;
                }
                let summary = summaries.borrow_and_update().clone();
                if let Some(summary) = summary {
                    print_summary(&summary);
                    record_summary(&history, &summary);
                }
            }
            _ = trigger.tick() => {
                let outcome = controller.start(false).await;
                if outcome.started {
                    println!("{} sent {} so far", "Session started:".green(), outcome.status.total_sent);
                } else if let Some(reason) = outcome.reason {
                    info!("Triggered session not started: {}", reason);
                }
            }
        }
    }

    if let Some(summary) = controller.stop().await {
        print_summary(&summary);
        record_summary(&history, &summary);
    }
    Ok(())
}

async fn handle_once_command(json: bool, config: &Config) -> Result<()> {
    let controller = build_controller(config)?;
    let history = open_history()?;
    let mut summaries = controller.subscribe();

    let outcome = controller.start(true).await;
    if !outcome.started {
        let reason = outcome.reason.unwrap_or_else(|| "unknown".to_string());
        println!("{} {}", "Not started:".yellow(), reason);
        return Ok(());
    }

    let summary = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, stopping session");
            controller.stop().await
        }
        finished = summaries.wait_for(|s| s.is_some()) => {
            finished.ok().and_then(|s| s.clone())
        }
    };

    let Some(summary) = summary else {
        println!("{}", "Session ended without a summary".yellow());
        return Ok(());
    };
    record_summary(&history, &summary);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?);
        return Ok(());
    }

    print_summary(&summary);
    for result in &summary.results {
        match &result.error {
            None => println!("  {} {} {}/{}", "ok".green(), result.label, result.delivered, result.requested),
            Some(error) => println!("  {} {} {}", "--".red(), result.label, error),
        }
    }
    if summary.end_reason == EndReason::Stopped {
        println!("{}", "Session was interrupted".yellow());
    }
    Ok(())
}

async fn handle_preview_command(config: &Config) -> Result<()> {
    let api = HttpTransferApi::new(config.api_config()?).context("Failed to create HTTP client")?;
    let params = config.distribution_config()?.eligibility;

    let plan = plan_candidates(&api, &api, chrono::Utc::now(), &params)
        .await
        .context("Failed to fetch pool")?;

    println!("{} {} available for {}", "Pool:".cyan(), plan.available, plan.caller_id);
    if plan.ordered.is_empty() {
        println!("{}", "No eligible recipients".yellow());
    }
    let mut remaining = plan.available;
    for (i, recipient) in plan.ordered.iter().enumerate() {
        let amount = remaining.min(recipient.capacity);
        remaining -= amount;
        println!(
            "  {:>3}. {:<24} capacity {:>6}  next {:>6}",
            i + 1,
            recipient.label,
            recipient.capacity,
            amount
        );
    }
    for (reason, count) in &plan.excluded {
        println!("  {} {} {}", "excluded".dimmed(), count, reason);
    }
    Ok(())
}

fn handle_history_command(limit: usize) -> Result<()> {
    let history = open_history()?;
    let entries = history.recent(limit)?;
    if entries.is_empty() {
        println!("{}", "No sessions recorded".yellow());
        return Ok(());
    }
    for entry in entries {
        let sent = format!("{}/{}", entry.total_sent, entry.total_requested);
        let sent = if entry.total_sent > 0 { sent.green() } else { sent.red() };
        println!(
            "{} sent {} in {} attempts over {}s ({})",
            entry.started_at.format("%Y-%m-%d %H:%M"),
            sent,
            entry.attempts,
            entry.elapsed_secs,
            entry.end_reason
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&cli, &config).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
