//! # mdsort
//!
//! Batch-classifies markdown documents with an LLM chat-completion endpoint
//! and moves each one into a folder named after its category.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mdsort` / `mdsort run` | Sort every unsettled document, resuming from the checkpoint |
//! | `mdsort providers` | Probe every configured provider |
//! | `mdsort status` | Show the saved checkpoint |
//! | `mdsort reset` | Delete the saved checkpoint |

mod cli;
mod config;
mod console;
mod report;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sorter_engine::{
    write_report, CheckpointStore, ClassificationClient, Pipeline, ProviderRegistry,
    ProviderSelector, RunController,
};
use sorter_logging::{sorter_error, sorter_info, sorter_warn};

use crate::cli::{Cli, Command, RunArgs};
use crate::config::{load_config, Config};
use crate::report::{format_summary, ConsoleProgress};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    sorter_logging::initialize(
        cli.log.into(),
        cli.level(),
        Path::new(sorter_logging::DEFAULT_LOG_FILE),
    );

    let mut config = load_config(&cli.config)?;
    match cli.command.unwrap_or_else(|| Command::Run(RunArgs::default())) {
        Command::Run(args) => {
            config.apply_overrides(args.source, args.target, args.retry_failed);
            run(&config, args.provider.as_deref(), args.fixed.as_deref()).await
        }
        Command::Providers => list_providers(&config).await,
        Command::Status => show_status(&config),
        Command::Reset => {
            CheckpointStore::new(&config.paths.checkpoint_file).clear()?;
            println!("Checkpoint {} cleared.", config.paths.checkpoint_file.display());
            Ok(())
        }
    }
}

fn registry(config: &Config) -> Result<ProviderRegistry> {
    Ok(ProviderRegistry::new(config.provider_configs())?.with_probe_timeout(config.probe_timeout()))
}

async fn run(config: &Config, provider: Option<&str>, fixed: Option<&str>) -> Result<()> {
    let selector = Arc::new(ProviderSelector::new(registry(config)?));
    let policy = config.selection_policy(provider, fixed);
    let active = selector
        .select_best(&policy)
        .await
        .context("No classification provider is usable; check `mdsort providers`")?;
    sorter_info!("classifying with {} ({})", active.id, active.model);

    let controller = RunController::new();
    let console = console::spawn_console(controller.clone(), Arc::clone(&selector));
    let interrupts = console::spawn_interrupt_handler(controller.clone());
    println!("Commands: p = pause, r = resume, q = stop, s <provider> = switch provider");

    let classifier = ClassificationClient::new(
        Arc::clone(&selector),
        config.categories(),
        config.classify_settings(),
    );
    let pipeline = Pipeline::new(
        Arc::new(classifier),
        Arc::new(config.extractor()),
        Arc::new(config.normalizer()),
        Arc::new(CheckpointStore::new(&config.paths.checkpoint_file)),
        controller,
        config.pipeline_settings(),
    )
    .with_sink(Arc::new(ConsoleProgress::default()));

    let outcome = pipeline.run().await;
    console.abort();
    interrupts.abort();
    let report = outcome?;

    if let Err(err) = write_report(&config.paths.report_file, &report) {
        sorter_error!("could not write report {}: {}", config.paths.report_file.display(), err);
    } else {
        sorter_info!("report written to {}", config.paths.report_file.display());
    }
    print!("{}", format_summary(&report));
    Ok(())
}

async fn list_providers(config: &Config) -> Result<()> {
    let registry = registry(config)?;
    if registry.is_empty() {
        sorter_warn!("no providers configured");
        return Ok(());
    }
    for (id, status) in registry.probe_all().await {
        let model = registry.get(&id).map(|p| p.model.as_str()).unwrap_or_default();
        let mark = if status.is_reachable() { "ok " } else { "-- " };
        println!("{mark}{id:<16} {model:<24} {status}");
    }
    Ok(())
}

fn show_status(config: &Config) -> Result<()> {
    let store = CheckpointStore::new(&config.paths.checkpoint_file);
    match store.info()? {
        None => println!("No checkpoint at {}.", store.path().display()),
        Some(info) => {
            println!("Checkpoint {}", store.path().display());
            println!("  processed: {}", info.processed);
            println!("  failed:    {}", info.failed);
            match info.saved_at {
                Some(at) => println!("  saved at:  {}", at.with_timezone(&chrono::Local).to_rfc2822()),
                None => println!("  saved at:  unknown"),
            }
        }
    }
    Ok(())
}
