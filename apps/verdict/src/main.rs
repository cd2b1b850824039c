use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use verdict_aggregator::ResultAggregator;
use verdict_config::{RunOptions, parse_properties, resolve_properties};
use verdict_eventbus::EventBus;
use verdict_logging::{LogLevel, LoggingConfig};
use verdict_schema::TestEvent;

#[derive(Parser, Debug)]
#[command(name = "verdict")]
#[command(about = "Replay cucumber test case events and report the verdict.", long_about = None)]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Feed a JSONL event log for one test case through a result aggregator.
    Replay {
        /// One event per line.
        #[arg(long)]
        events: PathBuf,
        /// Treat pending and undefined steps as failures.
        /// Defaults to cucumber.execution.strict.
        #[arg(long)]
        strict: bool,
        /// YAML or JSON file of cucumber.* properties.
        #[arg(long)]
        properties: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the run options resolved from properties and the environment.
    Options {
        /// YAML or JSON file of cucumber.* properties.
        #[arg(long)]
        properties: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    verdict_logging::init(&LoggingConfig::new().with_level(level)).context("initialise logging")?;

    match cli.cmd {
        Command::Replay {
            events,
            strict,
            properties,
            format,
        } => {
            let strict = strict || resolve_options(properties.as_deref())?.strict;
            let events = read_events(&events)?;

            let bus = Arc::new(EventBus::default());
            let aggregator = ResultAggregator::new(bus.clone(), strict);
            for event in events {
                bus.emit(event);
            }
            aggregator.finish();

            let verdict = aggregator.verdict().context("render verdict")?;
            match format {
                OutputFormat::Text => println!("{verdict}"),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&verdict)?),
            }

            if verdict.is_ok() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Options { properties } => {
            let options = resolve_options(properties.as_deref())?;
            print!("{}", serde_yaml::to_string(&options)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn resolve_options(properties: Option<&Path>) -> Result<RunOptions> {
    let properties = resolve_properties(properties)?;
    Ok(parse_properties(&properties)?)
}

fn read_events(path: &Path) -> Result<Vec<TestEvent>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {path:?}"))?;
    let mut events = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event: TestEvent = serde_json::from_str(line)
            .with_context(|| format!("parse event json line {} in {:?}", i + 1, path))?;
        events.push(event);
    }
    tracing::debug!(count = events.len(), path = %path.display(), "read events");
    Ok(events)
}
