use std::sync::Arc;

use anyhow::Context;
use calc_common::config::CalcConfig;
use calc_core::evaluator::{evaluate_str, format_number};
use calc_core::randomizer::{random_expression, ExpressionShape};
use calc_obs::{init_tracing, TracingLogger, CONSUMER_LOG_FILE, PRODUCER_LOG_FILE};
use calc_producer::{HttpPostClient, LoadGenerator, RateSchedule};
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "calc", version, about = "Arithmetic compute service and its load generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve POST /compute
    Consumer(ConsumerArgs),
    /// Send random expressions to a consumer at a fixed rate
    Producer(ProducerArgs),
    /// Evaluate one expression locally
    Eval(EvalArgs),
    /// Print random expressions
    Generate(GenerateArgs),
    Version,
}

#[derive(Args, Debug)]
struct ConsumerArgs {
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct ProducerArgs {
    /// Consumer URL, e.g. http://localhost:3000/compute
    #[arg(short, long)]
    url: Option<String>,
    /// Requests per second
    #[arg(short, long)]
    rate: Option<f64>,
}

#[derive(Args, Debug)]
struct EvalArgs {
    /// Expression such as "1 + 2 = "
    expression: String,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,
    #[arg(long, default_value_t = 10.0)]
    max_left: f64,
    #[arg(long, default_value_t = 10.0)]
    max_right: f64,
    #[arg(long, default_value_t = 2)]
    precision: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = CalcConfig::load();
    match cli.command {
        Commands::Consumer(args) => consumer(cfg, args).await,
        Commands::Producer(args) => producer(cfg, args).await,
        Commands::Eval(args) => eval(args),
        Commands::Generate(args) => {
            generate(args);
            Ok(())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn consumer(mut cfg: CalcConfig, args: ConsumerArgs) -> anyhow::Result<()> {
    if let Some(port) = args.port {
        cfg.port = port;
    }
    let _guard = init_tracing(&cfg.log_dir, CONSUMER_LOG_FILE).context("initialising logging")?;

    let app = calc_api::app(Arc::new(TracingLogger::consumer()));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cfg.port))
        .await
        .with_context(|| format!("binding port {}", cfg.port))?;
    banner("CONSUMER STARTED", &[format!(" - Port: {}", cfg.port)]);
    tracing::info!("listening on http://0.0.0.0:{}", cfg.port);

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    };
    calc_api::serve(listener, app, shutdown).await.context("serving")?;

    println!();
    banner("CONSUMER STOPPED", &[]);
    Ok(())
}

async fn producer(mut cfg: CalcConfig, args: ProducerArgs) -> anyhow::Result<()> {
    if let Some(url) = args.url {
        cfg.consumer_url = url;
    }
    if let Some(rate) = args.rate {
        cfg.requests_per_second = rate;
    }
    let _guard = init_tracing(&cfg.log_dir, PRODUCER_LOG_FILE).context("initialising logging")?;

    let client = HttpPostClient::new(Arc::new(TracingLogger::producer()))?;
    let schedule = RateSchedule::new(cfg.requests_per_second)?;
    let mut generator = LoadGenerator::new(client, cfg.consumer_url.clone(), schedule)?;
    generator.start();
    banner(
        "PRODUCER STARTED",
        &[
            format!(" - URL: {}", generator.target_url()),
            format!(" - Reqs/sec: {}", generator.schedule().requests_per_second()),
        ],
    );

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    generator.stop();
    tracing::info!("stopped after {} requests", generator.issued());

    println!();
    banner("PRODUCER STOPPED", &[]);
    Ok(())
}

fn eval(args: EvalArgs) -> anyhow::Result<()> {
    let result = evaluate_str(&args.expression).map_err(|e| anyhow::anyhow!("Invalid syntax: {}", e))?;
    println!("{}{}", args.expression, format_number(result));
    Ok(())
}

fn generate(args: GenerateArgs) {
    let shape = ExpressionShape {
        max_left: args.max_left,
        max_right: args.max_right,
        precision: args.precision,
    };
    for _ in 0..args.count {
        println!("{}", random_expression(&shape));
    }
}

fn banner(title: &str, details: &[String]) {
    println!("---------------------------------");
    println!("{}", title);
    for line in details {
        println!("{}", line);
    }
    println!("---------------------------------");
}
