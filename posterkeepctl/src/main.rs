use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use humantime::format_duration;
use posterkeep_config::{
    Config, ConfigLoader, ConfigOverrides, HttpConfig, LockConfig,
};
use posterkeep_core::{
    ConsoleReporter, HttpPosterSource, PlexCatalog, PosterPipeline,
    SyncOutcome, sync_catalog,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Parser)]
#[command(
    name = "posterkeepctl",
    version,
    about = "Keep local poster images in sync with a media server"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync posters for every item in the configured library sections
    Sync {
        #[command(flatten)]
        source: ConfigArgs,
    },
    /// Fetch one poster URL into one directory
    Fetch {
        #[arg(long)]
        url: Url,
        #[arg(long)]
        dir: PathBuf,
        #[command(flatten)]
        source: ConfigArgs,
    },
    /// Validate configuration and print the effective values
    Check {
        #[command(flatten)]
        source: ConfigArgs,
    },
}

#[derive(Args, Clone, Default)]
struct ConfigArgs {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Env file to read before the process environment
    #[arg(long)]
    env_file: Option<PathBuf>,
    /// Media server base URL, e.g. http://localhost:32400
    #[arg(long)]
    server: Option<String>,
    /// Media server access token
    #[arg(long)]
    token: Option<String>,
    /// Library section id; repeat for several sections
    #[arg(long = "section")]
    sections: Vec<String>,
}

impl From<ConfigArgs> for ConfigOverrides {
    fn from(args: ConfigArgs) -> Self {
        ConfigOverrides {
            config_path: args.config,
            env_file: args.env_file,
            server_url: args.server,
            token: args.token,
            sections: args.sections,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Sync { source } => {
            let config = load_config(source)?;
            let pipeline = build_pipeline(&config.lock, &config.http)?;
            let catalog = PlexCatalog::with_timeout(
                config.server.url.clone(),
                config.server.token.clone(),
                config.library.sections.clone(),
                config.http.catalog_timeout,
                &config.http.user_agent,
            )
            .context("failed to build catalog client")?;

            let mut reporter = ConsoleReporter::stdio();
            let summary = sync_catalog(&catalog, &pipeline, &mut reporter)
                .await
                .context("failed to fetch library")?;

            println!(
                "Done: {} saved, {} duplicate, {} locked, {} unavailable, {} skipped, {} failed",
                summary.saved,
                summary.duplicate,
                summary.lock_unavailable,
                summary.unavailable,
                summary.skipped,
                summary.failed
            );
        }
        Command::Fetch { url, dir, source } => {
            let (lock, http) = ConfigLoader::from_process_env()
                .overrides(source.into())
                .load_pipeline_settings()
                .context("invalid configuration")?;
            let pipeline = build_pipeline(&lock, &http)?;
            let outcome =
                pipeline.sync(&url, &dir).await.with_context(|| {
                    format!("failed to sync poster into {}", dir.display())
                })?;

            match outcome {
                SyncOutcome::Saved { path, digest } => {
                    println!("Saved new poster {} ({digest})", path.display())
                }
                SyncOutcome::Duplicate { existing, .. } => println!(
                    "No new poster saved for {} (same as {existing})",
                    dir.display()
                ),
                SyncOutcome::LockUnavailable => println!(
                    "No new poster saved for {} (directory locked by another writer)",
                    dir.display()
                ),
                SyncOutcome::Unavailable { status } => println!(
                    "No new poster saved for {} (server returned {status})",
                    dir.display()
                ),
            }
        }
        Command::Check { source } => {
            let config = load_config(source)?;
            print_config(&config);
        }
    }

    Ok(())
}

fn load_config(args: ConfigArgs) -> Result<Config> {
    let config = ConfigLoader::from_process_env()
        .overrides(args.into())
        .load()
        .context("invalid configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn build_pipeline(lock: &LockConfig, http: &HttpConfig) -> Result<PosterPipeline> {
    let source =
        HttpPosterSource::with_timeout(http.request_timeout, &http.user_agent)
            .context("failed to build HTTP client")?;
    Ok(PosterPipeline::new(Arc::new(source), lock.options()))
}

fn print_config(config: &Config) {
    println!("server.url        = {}", config.server.url);
    println!("server.token      = {}", config.server.redacted_token());
    println!("library.sections  = {}", config.library.sections.join(", "));
    println!(
        "lock.timeout      = {}",
        format_duration(config.lock.timeout)
    );
    println!(
        "lock.retry_delay  = {}",
        format_duration(config.lock.retry_delay)
    );
    println!(
        "http.timeout      = {}",
        format_duration(config.http.request_timeout)
    );
    println!(
        "http.catalog      = {}",
        format_duration(config.http.catalog_timeout)
    );
    println!("http.user_agent   = {}", config.http.user_agent);
    if let Some(path) = &config.metadata.config_path {
        println!("config file       = {}", path.display());
    }
    if let Some(path) = &config.metadata.env_file {
        println!("env file          = {}", path.display());
    }
}
