use getbench::probe::{probe, DEFAULT_FIELD};
use getbench::report::{JsonReport, Summary};
use getbench::*;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send many GET requests through a pool of workers (default)
    Run(RunArgs),
    /// Send one GET request and print a field of its JSON body
    Probe(ProbeArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// URL of the server
    #[arg(default_value = "http://127.0.0.1:8080")]
    url: String,

    /// Total number of requests
    #[arg(short = 'n', long = "requests", default_value_t = 1000)]
    total_requests: usize,

    /// Number of concurrent workers
    #[arg(short, long, default_value_t = 6)]
    concurrency: usize,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ProbeArgs {
    /// URL of the server
    #[arg(default_value = "http://localhost:8080/count")]
    url: String,

    /// Top-level JSON field to report
    #[arg(short, long, default_value = DEFAULT_FIELD)]
    field: String,

    /// Request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "getbench=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Probe(args)) => run_probe(args).await,
        Some(Command::Run(args)) => run_load(args).await,
        None => run_load(cli.run).await,
    }
}

async fn run_load(args: RunArgs) -> anyhow::Result<()> {
    let target: Target = args.url.parse()?;
    let mut config = RunConfig::new(args.total_requests, args.concurrency);
    if let Some(ms) = args.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }

    let progress = if args.no_progress || args.json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(ProgressStyle::with_template(
            "{spinner} {elapsed_precise} [{bar:40}] {pos}/{len} {per_sec}",
        )?);
        pb
    };

    let generator = LoadGenerator::new(target, config)
        .context("could not set up the worker pool")?
        .with_progress(progress);

    if !args.json {
        println!(
            "Sending {} requests to {} with {} workers...",
            generator.config().total_requests,
            generator.target(),
            generator.config().concurrency
        );
    }

    let stop = StopSignal::new();
    tokio::select! {
        result = generator.run(&stop) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&JsonReport::from(&result))?);
            } else {
                println!("{}", Summary(&result));
            }
            Ok(())
        }
        _ = stop::interrupted(tokio::signal::ctrl_c()) => {
            stop.trigger();
            eprintln!("\n[!] Ctrl+C detected. Cancelling all tasks...");
            // in-flight requests are not waited for
            std::process::exit(130);
        }
    }
}

async fn run_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let target: Target = args.url.parse()?;
    let timeout = args.timeout_ms.map(Duration::from_millis);

    let result = probe(&target, &args.field, timeout)
        .await
        .with_context(|| format!("probe of {target} failed"))?;

    println!("Called {target}");
    match result.value {
        Some(value) => println!("→ {} returned: {value}", args.field),
        None => println!("→ {} missing from response (status {})", args.field, result.status),
    }
    println!("→ Elapsed time: {:.2} ms", result.elapsed.as_secs_f64() * 1000.0);
    Ok(())
}
