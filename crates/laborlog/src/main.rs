//! `laborlog` - CLI for the labor log
//!
//! This binary runs the record API server and gives terminal access to
//! contractions, intervals and hospital contacts.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Write as _;

use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use laborlog::cli::{
    output, Cli, Command, ConfigCommand, ContractionCommand, HospitalCommand, IntervalsCommand,
};
use laborlog::client::{ContractionLog, HospitalDirectory, HttpBackend, RecordBackend};
use laborlog::stopwatch::{format_hms, format_signed_hms, Stopwatch};
use laborlog::{api, init_logging, Config, RecordService, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;
    let remote = cli.remote;

    match cli.command {
        Command::Serve => {
            api::serve(&config).await?;
            Ok(())
        }
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        command if remote => {
            let backend = HttpBackend::new(config.client.base_url.clone());
            run_records(&config, command, backend).await
        }
        command => {
            let storage = Storage::open(config.database_path()).with_context(|| {
                format!("opening {}", config.database_path().display())
            })?;
            let backend = RecordService::new(storage, config.validation.end_before_start);
            run_records(&config, command, backend).await
        }
    }
}

async fn run_records<B: RecordBackend>(
    config: &Config,
    command: Command,
    backend: B,
) -> anyhow::Result<()> {
    match command {
        Command::Contraction(cmd) => {
            handle_contraction(config, cmd, ContractionLog::new(backend)).await
        }
        Command::Intervals(cmd) => handle_intervals(&cmd, ContractionLog::new(backend)).await,
        Command::Hospital(cmd) => handle_hospital(cmd, HospitalDirectory::new(backend)).await,
        Command::Serve | Command::Config(_) => Err(anyhow!("not a record command")),
    }
}

async fn handle_contraction<B: RecordBackend>(
    config: &Config,
    cmd: ContractionCommand,
    log: ContractionLog<B>,
) -> anyhow::Result<()> {
    match cmd {
        ContractionCommand::Start { at } => {
            let created = log.add(at.unwrap_or_else(Utc::now)).await?;
            println!("Contraction #{} started.", created.id);
        }
        ContractionCommand::Stop { id, at } => {
            let id = match id {
                Some(id) => id,
                None => {
                    log.refresh().await?;
                    log.in_progress()
                        .map(|c| c.id)
                        .ok_or_else(|| anyhow!("no contraction in progress"))?
                }
            };
            let finished = log.finish(id, at.unwrap_or_else(Utc::now)).await?;
            println!(
                "Contraction #{} finished after {}.",
                finished.id,
                format_signed_hms(finished.duration_seconds.unwrap_or(0))
            );
        }
        ContractionCommand::List(args) => {
            log.refresh().await?;
            let mut list = log.contractions();
            if let Some(limit) = args.limit {
                list.truncate(limit);
            }
            println!("{}", output::contractions(&list, args.format)?);
        }
        ContractionCommand::Delete { id } => {
            let message = log.delete(id).await?;
            println!("{}", message.message);
        }
        ContractionCommand::Time => time_contraction(config, &log).await?,
    }
    Ok(())
}

/// Run a live stopwatch until Enter is pressed, recording start and end.
async fn time_contraction<B: RecordBackend>(
    config: &Config,
    log: &ContractionLog<B>,
) -> anyhow::Result<()> {
    let mut stopwatch = Stopwatch::new(config.tick_interval());
    stopwatch.start();
    let start = stopwatch
        .start_time()
        .ok_or_else(|| anyhow!("stopwatch did not start"))?;
    let created = log.add(start).await?;
    println!("Contraction #{} started. Press Enter to stop.", created.id);

    let mut ticks = stopwatch.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();
    loop {
        tokio::select! {
            changed = ticks.changed() => {
                if changed.is_err() {
                    break;
                }
                let elapsed = *ticks.borrow_and_update();
                print!("\r{}", format_hms(elapsed));
                stdout.flush()?;
            }
            _ = lines.next_line() => break,
        }
    }

    let span = stopwatch
        .stop()
        .ok_or_else(|| anyhow!("stopwatch was not running"))?;
    let finished = log.finish(created.id, span.end).await?;
    println!(
        "\rContraction #{} lasted {}.",
        finished.id,
        format_signed_hms(span.duration_seconds)
    );

    log.refresh().await?;
    if let Some(interval) = log.latest_interval() {
        println!("Interval since the previous one: {} min.", interval.minutes);
    }
    Ok(())
}

async fn handle_intervals<B: RecordBackend>(
    cmd: &IntervalsCommand,
    log: ContractionLog<B>,
) -> anyhow::Result<()> {
    log.refresh().await?;
    let intervals = if cmd.latest {
        log.latest_interval().into_iter().collect()
    } else {
        log.intervals()
    };
    println!("{}", output::intervals(&intervals, cmd.format)?);
    Ok(())
}

async fn handle_hospital<B: RecordBackend>(
    cmd: HospitalCommand,
    directory: HospitalDirectory<B>,
) -> anyhow::Result<()> {
    match cmd {
        HospitalCommand::List(args) => {
            directory.refresh().await?;
            let mut list = directory.hospitals();
            if let Some(limit) = args.limit {
                list.truncate(limit);
            }
            println!("{}", output::hospitals(&list, args.format)?);
        }
        HospitalCommand::Add(args) => {
            let created = directory.add(args.into()).await?;
            println!("Hospital #{} added.", created.id);
        }
        HospitalCommand::Update(args) => {
            let (id, patch) = args.into_patch();
            let updated = directory.update(id, patch).await?;
            println!("Hospital #{} updated.", updated.id);
        }
        HospitalCommand::Delete { id } => {
            let message = directory.delete(id).await?;
            println!("{}", message.message);
        }
        HospitalCommand::Primary { format } => {
            directory.refresh().await?;
            match directory.primary_hospital() {
                Some(hospital) => {
                    println!("{}", output::hospitals(std::slice::from_ref(&hospital), format)?);
                }
                None => println!("No primary hospital set."),
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.bind_address());
                println!();
                println!("[Client]");
                println!("  Base URL:           {}", config.client.base_url);
                println!();
                println!("[Stopwatch]");
                println!("  Tick interval (ms): {}", config.stopwatch.tick_interval_ms);
                println!();
                println!("[Validation]");
                println!(
                    "  End before start:   {:?}",
                    config.validation.end_before_start
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)).and_then(|c| c.validate().map(|()| c)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
