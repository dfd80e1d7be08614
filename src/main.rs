mod acquire;
mod config;
mod error;
mod llm;
mod mcp;
mod tools;

use std::path::PathBuf;

use tracing::{error, info};

use crate::acquire::{download, format};
use crate::config::Config;
use crate::llm::KimiEngine;
use crate::mcp::McpServer;
use crate::tools::ToolRegistry;
use crate::tools::image::AnalyzeImageTool;

#[tokio::main]
async fn main() {
    // Load .env file (if present) before anything reads env vars
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    // Initialize tracing on stderr — stdout carries the MCP protocol.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    // A missing API key is the one fatal failure: better to die at startup
    // than to fail every tool call.
    let config = match Config::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let engine = match KimiEngine::new(&config) {
        Ok(e) => e,
        Err(e) => {
            error!("failed to initialize Kimi engine: {e}");
            std::process::exit(1);
        }
    };

    let client = match download::http_client() {
        Ok(c) => c,
        Err(e) => {
            error!("failed to initialize downloader: {e}");
            std::process::exit(1);
        }
    };

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(AnalyzeImageTool::new(engine, client, config.limits)));

    info!(
        tools = registry.len(),
        formats = %format::ALLOWED_EXTENSIONS.join(", "),
        max_image_mb = config.limits.max_bytes / 1024 / 1024,
        "kimi-vision MCP server running on stdio"
    );

    let server = McpServer::new(registry);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("server error: {e}");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, stopping...");
        }
    }
}

fn print_usage() {
    println!(
        "kimi-vision — MCP stdio server for image description via the Kimi vision API

USAGE:
    kimi-vision [OPTIONS]

OPTIONS:
    --config <PATH>     Path to config file (default: ~/.config/kimi-vision/config.toml)
    -h, --help          Print this help message

ENVIRONMENT:
    KIMI_API_KEY        Required. Moonshot API key.
    KIMI_API_URL        Optional. Chat-completions endpoint override.
    KIMI_MODEL          Optional. Default model (default: kimi-k2.5).
    RUST_LOG            Optional. Tracing filter (default: info).
"
    );
}
