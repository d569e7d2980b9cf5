mod cli;
mod config;
mod ledger;
mod logging;
mod notifier;
mod runner;

use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use courier_core::parse_backup;
use courier_engine::{ChromiumLauncher, Orchestrator};
use courier_logging::{courier_error, courier_info};

use cli::{Cli, Command};
use config::{credentials_from_env, CourierConfig};
use ledger::PublishedLedger;
use logging::LogDestination;
use notifier::LogNotifier;
use runner::{run_all, RunItem, RunOptions};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(LogDestination::Both, cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            courier_error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every attempted operation succeeded.
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = CourierConfig::load(cli.config.as_deref())?;
    let credentials = credentials_from_env()?;
    let orchestrator = Orchestrator::new(
        ChromiumLauncher::new(config.browser_options(cli.headless)),
        config.strategy_book(),
        config.publish_settings(),
        credentials,
        config.backup_dir.clone(),
        config.diagnostics_dir.clone(),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;

    match cli.command {
        Command::TestLogin => Ok(runtime.block_on(orchestrator.authenticate_only())),
        Command::Post {
            files,
            image,
            price,
            interval,
            force,
        } => {
            let price = price.unwrap_or(config.publish.default_price);
            let items = files
                .iter()
                .map(|path| load_item(path, price, image.as_deref()))
                .collect::<anyhow::Result<Vec<_>>>()?;
            courier_info!("{} article(s) queued", items.len());

            let mut ledger = PublishedLedger::load(&config.ledger_path);
            courier_info!("ledger lists {} published article(s)", ledger.entries().len());
            let options = RunOptions {
                interval: Duration::from_secs(interval.unwrap_or(config.publish.interval_secs)),
                force,
            };
            let results = runtime.block_on(run_all(
                &orchestrator,
                items,
                &mut ledger,
                &LogNotifier,
                options,
            ));
            Ok(results.iter().all(|result| !result.failed()))
        }
    }
}

fn load_item(path: &Path, price: u32, image: Option<&Path>) -> anyhow::Result<RunItem> {
    let text =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let document = parse_backup(&text).with_context(|| format!("cannot parse {}", path.display()))?;
    let mut article = document.into_article(price);
    if let Some(image) = image {
        article = article.with_image(image);
    }
    Ok(RunItem {
        source: path.display().to_string(),
        article,
    })
}
