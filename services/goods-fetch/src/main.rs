//! goods-fetch: subset ocean model output from the command line.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use grid_subset::{ModelRegistry, SubsetConfig};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use goods_fetch::commands::{self, FetchOutcome};
use goods_fetch::{Cli, Command, FetchArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let registry = ModelRegistry::load_dir(&cli.config_dir)
        .with_context(|| format!("failed to load models from {}", cli.config_dir.display()))?;
    info!(models = ?registry.ids().collect::<Vec<_>>(), "Loaded model registry");

    match cli.command {
        Command::List { parameter, bbox } => {
            for model in commands::list(&registry, parameter.as_deref(), bbox.as_ref()) {
                println!("{}", commands::format_model_line(model));
            }
        }
        Command::Bounds { model } => {
            let model = registry.get(&model)?.clone();
            let value = tokio::task::spawn_blocking(move || commands::bounds(&model)).await??;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Times { model } => {
            let model = registry.get(&model)?.clone();
            let value = tokio::task::spawn_blocking(move || commands::times(&model)).await??;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Fetch(args) => fetch(&registry, args).await?,
    }

    Ok(())
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn fetch(registry: &ModelRegistry, args: FetchArgs) -> Result<()> {
    let mut model = registry.get(&args.model)?.clone();
    model.variables = args.mapping(&model)?;
    let request = args.to_request(&model)?;
    let config = SubsetConfig::from_env();
    let limit = Duration::from_secs(args.timeout_secs);

    let destination = (!args.dry_run).then(|| args.output_path(&model, Utc::now()));
    info!(
        model = %model.id,
        destination = ?destination,
        timeout_secs = args.timeout_secs,
        "Starting subset"
    );

    let job_destination = destination.clone();
    let outcome = commands::with_timeout(limit, destination.as_deref(), move || {
        commands::run_subset(&model, &request, config, job_destination.as_deref())
    })
    .await?;

    match outcome {
        FetchOutcome::Planned(plan) => println!("{}", serde_json::to_string_pretty(&plan)?),
        FetchOutcome::Written(path) => {
            info!(path = %path.display(), "Subset complete");
            println!("{}", path.display());
        }
    }
    Ok(())
}
