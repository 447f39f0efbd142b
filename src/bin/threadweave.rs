#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use threadweave::gateway::{NoopUsageSink, QueryDispatcher, QueryGateway, StderrUsageSink};
use threadweave::{
    load_weight_policy, BasicStatusBuilder, ClientConfig, RunOptions, Thread, TwitterThreads,
    WeightPolicy,
};

#[derive(Parser)]
#[command(name = "threadweave", version, about = "Fetch statuses and threads")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a single status
    Status(FetchArgs),
    /// Fetch a status and reconstruct its thread
    Thread(FetchArgs),
}

#[derive(Args)]
struct FetchArgs {
    #[arg(long)]
    id: String,
    /// JSON weight policy (per-method overrides and disabled methods)
    #[arg(long)]
    weights: Option<PathBuf>,
    /// Seed for primary method selection
    #[arg(long)]
    seed: Option<u64>,
    /// Write the result here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
    /// Log one JSON line per upstream call to stderr
    #[arg(long)]
    usage: bool,
    /// Skip the account-origin lookup for thread authors
    #[arg(long)]
    no_about_account: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (args, process_thread) = match cli.command {
        Commands::Status(args) => (args, false),
        Commands::Thread(args) => (args, true),
    };

    if args.id.is_empty() || !args.id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("--id must be a numeric status id, got {:?}", args.id).into());
    }

    let config = ClientConfig::from_env()?;
    let weights = match &args.weights {
        Some(path) => load_weight_policy(path)?,
        None => WeightPolicy::default(),
    };
    let mut options = RunOptions::new("threadweave-cli");
    if let Some(seed) = args.seed {
        options = options.seeded(seed);
    }

    let adapter = config.adapter()?;
    let dispatcher: Arc<dyn QueryDispatcher> = if args.usage {
        Arc::new(QueryGateway::with_config(
            adapter,
            Arc::new(StderrUsageSink),
            config.gateway_config(),
        ))
    } else {
        Arc::new(QueryGateway::with_config(
            adapter,
            Arc::new(NoopUsageSink),
            config.gateway_config(),
        ))
    };

    let threads = TwitterThreads::new(dispatcher, Arc::new(BasicStatusBuilder))
        .with_weights(weights)
        .with_options(options)
        .api_host(config.api_host)
        .elevated_available(config.elevated_available())
        .about_account(!args.no_about_account)
        .with_reconstruct_config(config.reconstruct_config());

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            watcher.cancel();
        }
    });

    let result = threads
        .construct_thread(&args.id, process_thread, &cancel)
        .await;
    emit(&result, args.out.as_ref())?;
    Ok(())
}

fn emit(thread: &Thread, out: Option<&PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(thread)?;
    match out {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!("[threadweave] code {} written to {}", thread.code, path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
