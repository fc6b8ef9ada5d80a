use clap::Parser;
use request_core::{Body, Dispatcher, RequestBody, RequestOptions};
use tracing_subscriber::EnvFilter;

/// Issue one request and print the response.
#[derive(Parser)]
#[command(name = "fetch")]
struct Cli {
    url: String,

    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// `Name: value`, repeatable.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body. Parsed as JSON when it is valid JSON, sent raw otherwise.
    #[arg(short, long)]
    data: Option<String>,

    /// Decode the response body as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let cli = Cli::parse();

    let mut options = RequestOptions::new().method(cli.method).json(cli.json);
    for header in &cli.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("header must look like `Name: value`: {header}"))?;
        options = options.header(name.trim(), value.trim());
    }
    if let Some(data) = cli.data {
        let body = serde_json::from_str(&data).map_or(RequestBody::Text(data), RequestBody::Json);
        options = options.body(body);
    }

    let reply = Dispatcher::new()?.send(cli.url, options).await?;
    println!("{} {}", reply.head.status, reply.head.status_message);
    for (name, value) in &reply.head.headers {
        println!("{name}: {value}");
    }
    println!();
    match reply.body {
        Body::Text(text) => println!("{text}"),
        Body::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
    }
    Ok(())
}
