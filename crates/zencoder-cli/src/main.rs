//! Zencoder command-line client.

mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use futures::future::join_all;
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use zencoder_client::ZencoderClient;
use zencoder_models::{JobId, JobSpec};
use zencoder_watch::{WatchConfig, WatchEngine, WatchResult};

use crate::cli::{list_query, CliArgs, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Err(e) = init() {
        eprintln!("Failed to initialise: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(args.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// TLS provider, `.env` and tracing.
fn init() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();

    // JSON for log shipping, coloured text otherwise
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("zencoder=info".parse()?)
        .add_directive("zencoder_client=info".parse()?)
        .add_directive("zencoder_watch=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .try_init()?;
    }

    Ok(())
}

/// What the watch engine should wait for.
enum WatchTarget {
    /// Submit the job in this file, then watch it
    Submit(PathBuf),
    Existing(Vec<String>),
}

/// Run one subcommand. `Ok(false)` means a watched job did not finish.
async fn run(command: Command) -> Result<bool> {
    let client = ZencoderClient::from_env().context("Failed to create Zencoder client")?;

    let target = match command {
        Command::Create {
            spec,
            no_wait: false,
        } => WatchTarget::Submit(spec),
        Command::Watch { ids } => WatchTarget::Existing(ids),
        Command::Create {
            spec,
            no_wait: true,
        } => {
            let job_id = client.create_job(&read_spec(&spec)?).await?;
            println!("{}", job_id);
            return Ok(true);
        }
        Command::Progress { id } => {
            let progress = client.get_job_progress(&JobId::from(id)).await?;
            print_json(&serde_json::to_value(progress)?)?;
            return Ok(true);
        }
        Command::Details { id } => {
            let details = client.get_job_details(&JobId::from(id)).await?;
            print_json(&details.into_value())?;
            return Ok(true);
        }
        Command::List {
            page,
            per_page,
            state,
        } => {
            let jobs = client
                .list_jobs_with(&list_query(page, per_page, state))
                .await?;
            let jobs: Vec<Value> = jobs.into_iter().map(|job| job.into_value()).collect();
            print_json(&Value::Array(jobs))?;
            return Ok(true);
        }
        Command::Cancel { id } => {
            client.cancel_job(&JobId::from(id)).await?;
            return Ok(true);
        }
        Command::Resubmit { id } => {
            let body = client.resubmit_job(&JobId::from(id)).await?;
            if !body.is_null() {
                print_json(&body)?;
            }
            return Ok(true);
        }
    };

    let config = WatchConfig::from_env();
    info!("Watch config: {:?}", config);
    let engine = WatchEngine::with_client(client, config);
    engine.start();

    let outcome = run_watch(&engine, target).await;
    engine.stop().await;
    outcome
}

async fn run_watch(engine: &WatchEngine, target: WatchTarget) -> Result<bool> {
    let handles = match target {
        WatchTarget::Submit(spec) => {
            let handle = engine.create_job_handle(&read_spec(&spec)?).await?;
            info!(job_id = %handle.job_id(), "Submitted job, waiting for completion");
            vec![handle]
        }
        WatchTarget::Existing(ids) => ids
            .into_iter()
            .map(|id| engine.watch_handle(JobId::from(id)))
            .collect::<WatchResult<Vec<_>>>()?,
    };

    let ids: Vec<JobId> = handles.iter().map(|h| h.job_id().clone()).collect();
    let results = join_all(handles).await;

    let mut all_finished = true;
    for (id, result) in ids.iter().zip(results) {
        match result {
            Ok(details) => print_json(&details.into_value())?,
            Err(e) => {
                all_finished = false;
                error!(job_id = %id, "{}", e);
            }
        }
    }
    Ok(all_finished)
}

fn read_spec(path: &Path) -> Result<JobSpec> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid job spec in {}", path.display()))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
