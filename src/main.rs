use actix_web::{web, HttpServer};
use clap::{Parser, Subcommand};
use sqlx::{Pool, Postgres};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use data_pipeline::api::{self, job::JobService, job::ServiceSettings};
use data_pipeline::config::Config;
use data_pipeline::db::{self, JobRepository, JobStore, MemoryJobStore};
use data_pipeline::extract::{ExtractionScheduler, Extractor};
use data_pipeline::fetch::Fetcher;
use data_pipeline::resources::PipelineResources;
use data_pipeline::shutdown::ShutdownCoordinator;
use data_pipeline::storage::ArtifactStore;
use data_pipeline::{deploy, logging, preflight, smoke};

#[derive(Parser)]
#[command(name = "data-pipeline", version, about = "Fetch JSON documents, store them and derive CSV")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (and the extraction scheduler, if enabled)
    Serve,
    /// Run one scheduled extraction and print its outcome
    Extract,
    /// Apply job table migrations and exit
    Migrate,
    /// Print the resource manifest for an environment
    Resources {
        #[arg(long)]
        account: String,
        #[arg(long)]
        region: String,
    },
    /// Check that deployment tooling is installed and configured
    Preflight,
    /// Preflight, install, build, provision and print the stack outputs
    Deploy {
        #[arg(long)]
        account: String,
        #[arg(long)]
        region: String,
        #[arg(long, default_value = deploy::DEFAULT_STACK_NAME)]
        stack_name: String,
        #[arg(long, default_value = "deploy/resources.json")]
        manifest_path: PathBuf,
        /// Skip `cdk bootstrap` for an already bootstrapped environment
        #[arg(long)]
        skip_bootstrap: bool,
    },
    /// Exercise every endpoint of a running deployment
    SmokeTest {
        #[arg(long)]
        base_url: String,
        #[arg(long, default_value = smoke::DEFAULT_SOURCE_URL)]
        source_url: String,
    },
}

fn load_config() -> io::Result<Config> {
    Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

fn print_json<T: serde::Serialize>(value: &T) -> io::Result<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    println!("{rendered}");
    Ok(())
}

async fn connect(database_url: &str, max_connections: u32) -> io::Result<Pool<Postgres>> {
    let pool = db::connection::get_connection(database_url, max_connections)
        .await
        .map_err(io::Error::other)?;
    info!("Database connection pool established");

    db::migrations::run_migrations(&pool)
        .await
        .map_err(io::Error::other)?;
    Ok(pool)
}

/// Pick the job table backend: PostgreSQL when configured, process memory otherwise.
async fn open_job_store(config: &Config) -> io::Result<(Arc<dyn JobStore>, Option<Pool<Postgres>>)> {
    match &config.database_url {
        Some(url) => {
            let pool = connect(url, config.max_db_connections).await?;
            Ok((Arc::new(JobRepository::new(pool.clone())), Some(pool)))
        }
        None => {
            warn!("DATABASE_URL not set, job records are kept in memory only");
            Ok((Arc::new(MemoryJobStore::new()), None))
        }
    }
}

fn open_artifacts(config: &Config) -> io::Result<ArtifactStore> {
    ArtifactStore::from_url(&config.artifact_store_url).map_err(io::Error::other)
}

async fn serve(config: Config) -> io::Result<()> {
    info!("Starting data-pipeline application");
    info!("Configuration loaded successfully:");
    info!("  - Artifact store: {}", config.artifact_store_url);
    info!("  - Max payload size: {} bytes", config.max_payload_size);
    info!("  - Max database connections: {}", config.max_db_connections);
    info!("  - Extraction interval: {:?}", config.extract_interval);

    let (jobs, pool) = open_job_store(&config).await?;
    let artifacts = open_artifacts(&config)?;
    let fetcher = Fetcher::new().map_err(io::Error::other)?;

    let service = web::Data::new(JobService::new(
        jobs,
        artifacts.clone(),
        fetcher.clone(),
        ServiceSettings {
            expose_error_details: config.expose_error_details,
            service_version: config.service_version.clone(),
        },
    ));

    // watch channel so the scheduler sees the same shutdown flag
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let scheduler_handle = config.extract_interval.map(|interval| {
        let extractor = Extractor::new(artifacts, fetcher, config.api_url.clone());
        let scheduler = ExtractionScheduler::new(extractor, interval);
        tokio::spawn(scheduler.run(shutdown_rx))
    });

    let max_payload_size = config.max_payload_size;
    let server = HttpServer::new(move || api::build_app(service.clone(), max_payload_size));

    info!("Server starting on http://{}", config.bind_addr);

    let server = server.bind(config.bind_addr.as_str())?.run();
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    let coordinator = ShutdownCoordinator::new(
        server_handle,
        server_task,
        scheduler_handle,
        shutdown_tx,
        pool,
    );

    coordinator.wait_for_shutdown().await
}

async fn extract(config: Config) -> io::Result<()> {
    let artifacts = open_artifacts(&config)?;
    let fetcher = Fetcher::new().map_err(io::Error::other)?;
    let extractor = Extractor::new(artifacts, fetcher, config.api_url);

    let outcome = extractor.run_once(chrono::Utc::now()).await;
    print_json(&outcome)?;

    if outcome.is_success() {
        Ok(())
    } else {
        Err(io::Error::other("extraction failed"))
    }
}

async fn migrate(config: Config) -> io::Result<()> {
    let url = config.database_url.as_deref().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "DATABASE_URL is required to migrate")
    })?;
    let pool = connect(url, config.max_db_connections).await?;
    pool.close().await;
    Ok(())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Resources { account, region } => {
            print_json(&PipelineResources::for_environment(&account, &region))
        }
        Command::Preflight => {
            let results = preflight::run(&preflight::REQUIREMENTS);
            print_json(&results)?;
            if results.iter().all(|r| r.passed) {
                Ok(())
            } else {
                Err(io::Error::other("preflight checks failed"))
            }
        }
        Command::Deploy {
            account,
            region,
            stack_name,
            manifest_path,
            skip_bootstrap,
        } => {
            let report = deploy::run(&deploy::DeployOptions {
                account,
                region,
                stack_name,
                manifest_path,
                skip_bootstrap,
            });
            print_json(&report)?;
            if report.passed() {
                Ok(())
            } else {
                Err(io::Error::other("deployment failed"))
            }
        }
        Command::SmokeTest {
            base_url,
            source_url,
        } => {
            let client = reqwest::Client::new();
            let report = smoke::run(&client, &base_url, &source_url).await;
            print_json(&report)?;
            if report.passed() {
                Ok(())
            } else {
                Err(io::Error::other("smoke test failed"))
            }
        }
        command => {
            let config = load_config()?;
            logging::init(&config.log_dir)?;

            match command {
                Command::Extract => extract(config).await,
                Command::Migrate => migrate(config).await,
                _ => serve(config).await,
            }
        }
    }
}
