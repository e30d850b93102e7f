//! Induction Gateway Binary
//!
//! Serves the rule induction API over HTTP.
//!
//! # Usage
//! ```bash
//! induction-gateway [--config gateway.json] [--port 5001] [--host 127.0.0.1] [--verbose]
//! ```

use clap::Parser;
use induction_gateway::{Gateway, GatewayConfig};
use tracing_subscriber::EnvFilter;

/// Induction Gateway - black-box rule induction sessions over HTTP
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Task table (JSON)
    #[arg(long)]
    tasks: Option<String>,

    /// Session log file (JSONL)
    #[arg(long)]
    log_file: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .init();
    }

    let mut config = match &args.config {
        Some(path) => GatewayConfig::from_file(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(host) = args.host {
        config = config.with_host(host);
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(tasks) = args.tasks {
        config = config.with_tasks(tasks);
    }
    if let Some(log_file) = args.log_file {
        config = config.with_session_log(log_file);
    }

    print_banner(&config);

    let gateway = Gateway::from_config(config)?;
    gateway.start().await?;

    Ok(())
}

fn print_banner(config: &GatewayConfig) {
    println!();
    println!("Induction Gateway v{}", induction_gateway::VERSION);
    println!("   └─ http://{}:{}", config.host, config.port);
    println!();
    println!("HTTP Endpoints");
    println!("   ├─ GET  /health                  Health check");
    println!("   ├─ GET  /api/tasks               Task table");
    println!("   ├─ POST /api/start-task          Open a session");
    println!("   ├─ POST /api/query               Query the hidden rule");
    println!("   ├─ POST /api/submit-hypothesis   Grade a hypothesis");
    println!("   └─ POST /api/end-task            Close and log a session");
    println!();
    println!("Session log: {}", config.session_log_path);
    println!("Grader: {} ({})", config.oracle.model, config.oracle.endpoint);
    println!();
}
