use std::io::Write;

use clap::{Parser, Subcommand};
use serde_json::Value;

use dispatch_bridge::client::{ClientExecutor, ClientResponse, OutboundCall};
use dispatch_bridge::config::ClientConfig;
use dispatch_bridge::translate::MediaType;
use dispatch_bridge::BoxError;

#[derive(Parser)]
#[command(name = "bridge-cli")]
#[command(about = "Issue one call through the dispatch bridge client", long_about = None)]
struct Cli {
    /// Remote endpoint as host:port.
    #[arg(short, long, default_value = "127.0.0.1:10000")]
    endpoint: String,

    /// Media type to accept (repeatable).
    #[arg(short, long, default_value = "application/json")]
    accept: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a path
    Get { path: String },
    /// POST a body to a path
    Post {
        path: String,
        /// Request body
        #[arg(short, long, default_value = "")]
        data: String,
        /// Content type of the body
        #[arg(short = 't', long, default_value = "application/x-www-form-urlencoded")]
        content_type: String,
    },
    /// Ask the example server for a greeting
    Greet { name: String },
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let executor = ClientExecutor::from_config(&ClientConfig {
        endpoint: cli.endpoint.clone(),
        ..ClientConfig::default()
    })?;

    let mut call = match cli.command {
        Commands::Get { path } => OutboundCall::get(path),
        Commands::Greet { name } => OutboundCall::get(format!("/greeting/{name}")),
        Commands::Post {
            path,
            data,
            content_type,
        } => OutboundCall::post(path).body_bytes(MediaType::parse(&content_type)?, data),
    };
    for accept in &cli.accept {
        call = call.accept(&MediaType::parse(accept)?);
    }

    let mut response = executor.execute(&call).await?;
    print_response(&mut response)?;
    Ok(())
}

fn print_response(response: &mut ClientResponse) -> Result<(), BoxError> {
    let status = response.status();
    match response.reason() {
        Some(reason) => println!("HTTP {} {}", status, reason),
        None => println!("HTTP {}", status),
    }
    for (name, values) in response.headers().iter() {
        for value in values {
            println!("{}: {}", name, value);
        }
    }
    println!();

    let entity = response.read_entity()?;
    match serde_json::from_slice::<Value>(&entity) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => std::io::stdout().write_all(&entity)?,
    }
    Ok(())
}
