//! Example greeting server.
//!
//! Serves `GET|POST /greeting/{name}` through a closure dispatcher hosted by
//! the bridge:
//!
//! ```text
//! curl http://127.0.0.1:10000/greeting/world
//! {"greeting":"Hello, world!"}
//! ```
//!
//! A POST may carry a form body with `salutation=...` to replace "Hello".

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tokio::net::TcpListener;

use dispatch_bridge::config::{load_config, BridgeConfig};
use dispatch_bridge::lifecycle::{signals, Shutdown};
use dispatch_bridge::observability::init_logging;
use dispatch_bridge::server::{DispatchService, RequestAdapter, ResponseAdapter};
use dispatch_bridge::{BoxError, HttpServer};

#[derive(Parser)]
#[command(name = "dispatch-bridge")]
#[command(about = "Greeting server hosted by the dispatch bridge", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct Greeting {
    greeting: String,
}

fn greeting(request: &mut RequestAdapter, response: &mut ResponseAdapter) -> Result<(), BoxError> {
    let segments: Vec<String> = request
        .uri()
        .path_segments()
        .iter()
        .map(|segment| segment.decoded_path())
        .collect();

    let name = match segments.as_slice() {
        [first, name] if first == "greeting" && !name.is_empty() => name.clone(),
        _ => {
            response.send_error(404)?;
            return Ok(());
        }
    };

    let salutation = match request.method().as_str() {
        "GET" => "Hello".to_string(),
        "POST" => request
            .decoded_form_parameters()?
            .get_first("salutation")
            .unwrap_or("Hello")
            .to_string(),
        _ => {
            response.send_error(405)?;
            response.output_headers().put_single("Allow", "GET, POST")?;
            return Ok(());
        }
    };

    let body = serde_json::to_vec(&Greeting {
        greeting: format!("{salutation}, {name}!"),
    })?;

    response.output_headers().put_single("Content-Type", "application/json")?;
    response.output_stream().write_all(&body)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };

    init_logging(&config.observability)?;
    tracing::info!("dispatch-bridge v0.1.0 starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        mode = ?config.worker_pool.mode,
        workers = config.worker_pool.size,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let service = DispatchService::from_config(greeting, &config.worker_pool)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_on_signal(&shutdown).await;
    });

    HttpServer::new(config, service.clone())
        .run(listener, server_shutdown)
        .await?;
    service.shutdown();

    tracing::info!("dispatch-bridge stopped");
    Ok(())
}
