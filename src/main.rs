//! bridge-server: the MCP adapter executable.
//!
//! Reads configuration, connects the configured bridge client to FreeCAD
//! with retry, registers the tool/resource/prompt registries, and serves
//! MCP over stdio or HTTP until SIGINT/SIGTERM.
//!
//! Exit codes: 0 normal, 1 configuration error, 2 connect failure,
//! 3 internal error.

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use freecad_bridge::bridge;
use freecad_bridge::config::{Args, Config, Transport};
use freecad_bridge::error::{Error, Result};
use freecad_bridge::mcp::handler::McpHandler;
use freecad_bridge::mcp::prompts::PromptRegistry;
use freecad_bridge::mcp::resources::ResourceRegistry;
use freecad_bridge::mcp::server::McpServer;
use freecad_bridge::mcp::transport::StdioTransport;
use freecad_bridge::retry::{retry_with_backoff, BackoffParams};
use freecad_bridge::tools;
use freecad_bridge::VERSION;

const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

fn main() {
    let args = Args::parse();

    // Logging goes to stderr: stdout carries the MCP stdio protocol.
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("failed to set tracing subscriber");

    let config: Config = args.into();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start async runtime: {e}");
            std::process::exit(3);
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => {}
        Err(e) => {
            error!("{e}");
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(config: Config) -> Result<()> {
    config.validate()?;

    info!("FreeCAD MCP bridge v{VERSION}");
    info!("Mode: {}", config.mode.as_str());

    // Connect to FreeCAD with a bounded retry budget, then fail fast.
    let client = bridge::create_client(&config)?;
    let params = BackoffParams::with_tries(config.connect_retries);
    retry_with_backoff(|| client.connect(), Error::is_retriable, &params).await?;

    match client.get_version().await {
        Ok(version) => info!(
            "Connected to FreeCAD {} ({})",
            version.version,
            if version.gui_available { "GUI" } else { "headless" }
        ),
        Err(e) => info!("Connected, but version query failed: {e}"),
    }

    // Build the registries.
    let mut handler = McpHandler::new();
    tools::register_all_tools(&mut handler, client.clone(), &config);
    info!("Registered {} MCP tools", handler.tool_count());

    let handler = Arc::new(handler);
    let prompts = Arc::new(PromptRegistry::new());
    let resources = Arc::new(ResourceRegistry::new(
        client.clone(),
        handler.clone(),
        prompts.clone(),
    ));
    let server = Arc::new(McpServer::new(
        handler,
        prompts,
        resources,
        "freecad-bridge",
    ));

    // Serve until the transport closes or a shutdown signal arrives.
    let served = async {
        match config.transport {
            Transport::Stdio => {
                info!("Starting stdio transport");
                server.run(StdioTransport::new()).await
            }
            Transport::Http => {
                info!("Starting HTTP transport on port {}", config.port);
                freecad_bridge::http::start_server(&config, server.clone()).await
            }
        }
    };
    tokio::pin!(served);

    tokio::select! {
        result = &mut served => result?,
        _ = shutdown_signal() => {
            info!(
                "Shutdown signal received; draining for up to {}s",
                SHUTDOWN_DEADLINE.as_secs()
            );
            // Give in-flight tool calls the drain window; scripts that
            // keep running past it are abandoned server-side.
            tokio::select! {
                result = &mut served => result?,
                _ = tokio::time::sleep(SHUTDOWN_DEADLINE) => {
                    info!("Drain deadline reached");
                }
            }
        }
    }

    client.disconnect().await;
    info!("Bridge disconnected, exiting");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
