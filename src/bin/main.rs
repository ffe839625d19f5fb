//! Juliafarm CLI - render a Julia set across a farm of workers
//!
//! Usage:
//!   juliafarm render [--worker <host[:port]>]... [--output <file.png>]
//!   juliafarm worker [--port <port>]
//!
//! Examples:
//!   juliafarm render --rows 360 --columns 640
//!   juliafarm render --worker node-a --worker node-b:9100 --force
//!   juliafarm worker --port 9001

use clap::{Parser, Subcommand};
use juliafarm::config::{Settings, SettingsError};
use juliafarm::render;
use juliafarm::worker::WorkerServer;
use juliafarm::{JobOrchestrator, WorkerAddress};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "juliafarm")]
#[command(about = "Juliafarm - distributed Julia set renderer")]
#[command(version)]
struct Cli {
    /// Path to a juliafarm.toml (defaults to the usual search locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the grid (locally or on workers) and save it as a PNG
    Render {
        /// Worker address; repeat for more workers. Overrides the config file
        #[arg(short, long = "worker")]
        workers: Vec<String>,

        /// Number of grid rows (image height)
        #[arg(long)]
        rows: Option<u32>,

        /// Number of grid columns (image width)
        #[arg(long)]
        columns: Option<u32>,

        /// Iteration cap per point
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Where to write the image
        #[arg(short, long, default_value = "JuliaSet.png")]
        output: PathBuf,

        /// Replace the output file if it exists
        #[arg(short, long)]
        force: bool,
    },

    /// Serve row computations for a coordinator
    Worker {
        /// Port to listen on (0 uses the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "juliafarm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let settings = match Settings::load_from(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Render {
            workers,
            rows,
            columns,
            max_iterations,
            output,
            force,
        } => {
            let mut settings = settings;
            if !workers.is_empty() {
                settings.workers = workers;
            }
            if let Some(rows) = rows {
                settings.job.rows = rows;
            }
            if let Some(columns) = columns {
                settings.job.columns = columns;
            }
            if let Some(max_iterations) = max_iterations {
                settings.job.max_iterations = max_iterations;
            }
            cmd_render(settings, output, force).await
        }
        Commands::Worker { port } => cmd_worker(settings, port).await,
    }
}

async fn cmd_render(settings: Settings, output: PathBuf, force: bool) -> ExitCode {
    if let Err(e) = settings.validate() {
        eprintln!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    // Fail before computing anything if the image cannot be written
    if output.exists() && !force {
        eprintln!(
            "Output file '{}' already exists (use --force to replace it)",
            output.display()
        );
        return ExitCode::FAILURE;
    }

    let (workers, read_timeout) = match resolve_network(&settings) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = match JobOrchestrator::new(settings.job, settings.fractal)
        .with_workers(workers)
        .with_read_timeout(read_timeout)
        .run()
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Job failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for report in &outcome.sessions {
        match &report.error {
            None => println!(
                "Worker {} ({}): {} rows",
                report.worker, report.address, report.completed
            ),
            Some(error) => println!(
                "Worker {} ({}): {} rows, failed: {}",
                report.worker, report.address, report.completed, error
            ),
        }
    }
    println!(
        "Finished {}x{} grid in {:.3} seconds",
        outcome.grid.rows(),
        outcome.grid.columns(),
        outcome.elapsed.as_secs_f64()
    );

    match render::write_png(&outcome.grid, &output, force) {
        Ok(()) => {
            println!("Saved {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error writing image '{}': {}", output.display(), e);
            ExitCode::FAILURE
        }
    }
}

fn resolve_network(
    settings: &Settings,
) -> Result<(Vec<WorkerAddress>, Option<std::time::Duration>), SettingsError> {
    Ok((settings.worker_addresses()?, settings.network.read_timeout()?))
}

async fn cmd_worker(settings: Settings, port: Option<u16>) -> ExitCode {
    if let Err(e) = settings.validate() {
        eprintln!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let port = port.filter(|&p| p != 0).unwrap_or(settings.network.port);

    let server = match WorkerServer::bind(port, settings.fractal).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Error listening on port {}: {}", port, e);
            return ExitCode::FAILURE;
        }
    };

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Worker stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}
