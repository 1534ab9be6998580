//! GraphRAG Service - knowledge-graph index over stdio JSON-RPC
//!
//! Long-lived host processes talk to the index with one JSON-RPC request per
//! line on stdin and read one response per line from stdout. Methods:
//!
//! - `ping` - liveness check
//! - `query_graph` - semantically ranked subgraph for a text query
//! - `apply_update` - incremental catalog changes
//!
//! The database lives in `GRAPH_DIR` (default: `%APPDATA%\n8n-mcp\graph` on
//! Windows, `~/.cache/n8n-mcp/graph` elsewhere) as a single `graph.db` file.
//! Logging goes to stderr only; stdout belongs to the protocol.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use graphrag_core::GraphStore;
use graphrag_service::protocol::stdio::StdioTransport;
use graphrag_service::server::RpcServer;

/// Handle `--help`/`--version`; exits for both.
fn parse_args() {
    let args: Vec<String> = std::env::args().collect();

    for arg in &args[1..] {
        match arg.as_str() {
            "--help" | "-h" => {
                println!("GraphRAG Service v{}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("Knowledge-graph index speaking line-delimited JSON-RPC on stdio.");
                println!();
                println!("USAGE:");
                println!("    graphrag-service");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help              Print help information");
                println!("    -V, --version           Print version information");
                println!();
                println!("ENVIRONMENT:");
                println!("    GRAPH_DIR              Directory for graph.db");
                println!("    RUST_LOG               Log level filter (e.g., debug, info, warn)");
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("graphrag-service {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument '{arg}'");
                eprintln!("Try 'graphrag-service --help' for more information.");
                std::process::exit(1);
            }
        }
    }
}

/// Resolve the graph directory once at startup: `GRAPH_DIR` when set,
/// otherwise the platform default.
fn resolve_graph_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("GRAPH_DIR")
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }

    if cfg!(windows) {
        let appdata = std::env::var("APPDATA").ok().map(PathBuf::from).or_else(|| {
            directories::BaseDirs::new()
                .map(|dirs| dirs.home_dir().join("AppData").join("Roaming"))
        })?;
        Some(appdata.join("n8n-mcp").join("graph"))
    } else {
        let home = directories::BaseDirs::new()?.home_dir().to_path_buf();
        Some(home.join(".cache").join("n8n-mcp").join("graph"))
    }
}

#[tokio::main]
async fn main() {
    parse_args();

    // Logging goes to stderr; stdout is reserved for JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    info!("GraphRAG service v{} starting...", env!("CARGO_PKG_VERSION"));

    let graph_dir = match resolve_graph_dir() {
        Some(dir) => dir,
        None => {
            error!("could not determine the graph directory; set GRAPH_DIR");
            std::process::exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&graph_dir) {
        error!("failed to create {}: {}", graph_dir.display(), e);
        std::process::exit(1);
    }
    info!("GRAPH_DIR resolved to: {}", graph_dir.display());

    let store = match GraphStore::open(graph_dir.join("graph.db")) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("failed to open graph store: {}", e);
            std::process::exit(1);
        }
    };

    let server = RpcServer::new(store);
    let transport = StdioTransport::new();

    info!("serving JSON-RPC on stdio");
    if let Err(e) = transport.run(server) {
        error!("transport error: {}", e);
        std::process::exit(1);
    }

    info!("stdin closed, shutting down");
}
