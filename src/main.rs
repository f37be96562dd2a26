use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use wiki_diff_notify::{
    logging, ChannelDirectory, Config, CycleReport, DryRunSink, NotificationSink, RepoOutcome,
    RepositoryTracker, SlackClient, WikiDiffNotifier,
};

const CONFIG_FILE: &str = "config.toml";

#[derive(Parser)]
#[command(name = "wiki-diff-notify")]
#[command(about = "Post markdown diffs of new wiki commits to Slack channels")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Log Slack writes instead of sending them
    #[arg(long)]
    debug: bool,

    /// Send this message and exit instead of polling
    #[arg(short, long)]
    message: Option<String>,

    /// Wiki whose channel receives --message (default: every configured channel)
    #[arg(long, requires = "message")]
    repo: Option<String>,

    /// Run a single poll cycle and exit
    #[arg(long, conflicts_with = "message")]
    once: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logger(cli.debug);

    let config_path = std::fs::canonicalize(&cli.config)
        .with_context(|| format!("Could not find config file: {}", cli.config.display()))?;

    let config = Config::load(&config_path)
        .with_context(|| format!("Could not load {}", config_path.display()))?;

    let slack = SlackClient::new(config.slack.api_token.clone())?;
    if cli.debug {
        start(&cli, &config, DryRunSink::new(slack))
    } else {
        start(&cli, &config, slack)
    }
}

fn start<S: NotificationSink>(cli: &Cli, config: &Config, sink: S) -> Result<()> {
    let channels = ChannelDirectory::load(&sink).context("Could not list Slack channels")?;
    let trackers = RepositoryTracker::discover(
        &config.wikis.root,
        &config.wikis.branch,
        &config.wikis.remote,
    )
    .with_context(|| format!("Could not open wikis in {}", config.wikis.root.display()))?;

    let notifier = WikiDiffNotifier::new(
        sink,
        channels,
        trackers,
        config.notify_to.clone(),
        &config.wikis.markdown_suffix,
    )?;

    if let Some(ref message) = cli.message {
        let sent = notifier.send_message(cli.repo.as_deref(), message)?;
        println!("{} Message sent to {} channel(s)", "✓".green(), sent);
        return Ok(());
    }

    if cli.once {
        let report = notifier.notify()?;
        print_report(&report);
        return Ok(());
    }

    println!("{}", "━".repeat(50).dimmed());
    println!(
        "  {} {}",
        "Wiki Diff Notify".bold().cyan(),
        format!("every {}s", config.wikis.poll_interval_secs).dimmed()
    );
    for tracker in notifier.trackers() {
        if let Some(channel) = config.channel_for(tracker.name()) {
            println!("  {} {} → #{}", "•".green(), tracker.name().cyan(), channel);
        }
    }
    if cli.debug {
        println!("  {}", "debug: Slack writes are only logged".yellow());
    }
    println!("{}", "━".repeat(50).dimmed());

    notifier.run(Duration::from_secs(config.wikis.poll_interval_secs))?;

    Ok(())
}

fn print_report(report: &CycleReport) {
    for (name, outcome) in &report.outcomes {
        match outcome {
            RepoOutcome::UpToDate => {
                println!("  {} {} {}", "•".dimmed(), name.cyan(), "up to date".dimmed());
            }
            RepoOutcome::Delivered {
                units,
                notifications,
            } => {
                println!(
                    "  {} {} {} notification(s) for {} change set(s)",
                    "✓".green(),
                    name.cyan(),
                    notifications,
                    units
                );
            }
            RepoOutcome::RolledBack { depth, error, .. } => {
                println!(
                    "  {} {} rolled back {} commit(s): {}",
                    "✗".red(),
                    name.cyan(),
                    depth,
                    error
                );
            }
        }
    }
}
