use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "records-cli")]
#[command(about = "Operator CLI for the patient records service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Bearer token (an ADMIN token for status and circuits)
    #[arg(short, long, env = "RECORDS_TOKEN")]
    token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status and degraded peers
    Status,
    /// Show circuit breaker state per peer
    Circuits,
    /// Fetch one patient, enriched with user details
    Patient {
        /// Patient id (UUID)
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.token))?,
    );

    let path = match &cli.command {
        Commands::Status => "/admin/status".to_string(),
        Commands::Circuits => "/admin/circuits".to_string(),
        Commands::Patient { id } => format!("/api/v1/patients/{}", id),
    };

    let res = client
        .get(format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let body: Value = match res.json().await {
        Ok(body) => body,
        Err(e) => {
            eprintln!("Error: {} returned an unreadable body: {}", status, e);
            std::process::exit(1);
        }
    };

    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        eprintln!("{}", serde_json::to_string_pretty(&body)?);
        std::process::exit(1);
    }

    // unwrap the envelope; operators care about `data`
    let data = body.get("data").cloned().unwrap_or(body);
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}
