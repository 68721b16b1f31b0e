use clap::{Parser, Subcommand};
use proxybench_client::{ChatClient, EndpointConfig, DEFAULT_MODEL, DIRECT_BASE_URL, PROXY_BASE_URL};
use proxybench_common::PROMPTS_FILE;
use proxybench_harness::prompts::load_prompts;
use proxybench_harness::report;
use proxybench_harness::runner;
use proxybench_harness::sample_log::RunLogs;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proxybench", about = "Direct vs. proxied chat-completion latency benchmark")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Directory holding the prompts, the latency logs and the chart
    #[arg(long, global = true, default_value = ".")]
    workdir: PathBuf,

    /// Prompts file (default: <workdir>/prompts.json)
    #[arg(long, global = true)]
    prompts: Option<PathBuf>,

    /// Base URL of the upstream API
    #[arg(long, global = true, default_value = DIRECT_BASE_URL)]
    direct_base_url: String,

    /// Base URL of the local proxy
    #[arg(long, global = true, default_value = PROXY_BASE_URL)]
    proxy_base_url: String,

    /// Model requested on both paths
    #[arg(long, global = true, default_value = DEFAULT_MODEL)]
    model: String,
}

#[derive(Subcommand)]
enum Command {
    /// Run both phases, then chart the results (default)
    Run,
    /// Re-render the chart from existing logs
    Report,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let result = match &args.command {
        Some(Command::Report) => report::generate_cdf_chart(&args.workdir).map(|_| ()),
        Some(Command::Run) | None => run_benchmark(&args).await,
    };

    if let Err(e) = result {
        eprintln!("proxybench: {e}");
        process::exit(1);
    }
}

async fn run_benchmark(args: &Args) -> proxybench_common::Result<()> {
    let prompts_path = args
        .prompts
        .clone()
        .unwrap_or_else(|| args.workdir.join(PROMPTS_FILE));
    let prompts = load_prompts(&prompts_path)?;
    println!("Loaded {} prompts from {}", prompts.len(), prompts_path.display());

    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        tracing::warn!("OPENAI_API_KEY not set; direct requests will be unauthenticated");
        String::new()
    });

    let direct = ChatClient::new(
        EndpointConfig::direct(api_key)
            .with_base_url(&args.direct_base_url)
            .with_model(&args.model),
    )?;
    let proxy = ChatClient::new(
        EndpointConfig::proxied()
            .with_base_url(&args.proxy_base_url)
            .with_model(&args.model),
    )?;

    let logs = RunLogs::in_dir(&args.workdir);
    let outcome = runner::run(&proxy, &direct, &prompts, &logs).await?;

    report::finish_run(&args.workdir, &outcome).map(|_| ())
}
