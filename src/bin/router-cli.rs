use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "router-cli")]
#[command(about = "Admin client for the content router", long_about = None)]
struct Cli {
    #[arg(short, long, env = "ROUTER_ADMIN_URL", default_value = "http://localhost:8081")]
    url: String,

    /// Bearer token, if the admin API requires one.
    #[arg(short, long, env = "ROUTER_ADMIN_API_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the route table now and show the outcome
    Reload,
    /// Show size and age of the published route table
    Stats,
    /// Check that the router is alive
    Health,
    /// Show the router's build identity
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
    }

    let base = cli.url.trim_end_matches('/');
    let request = match cli.command {
        Commands::Reload => client.post(format!("{base}/reload")),
        Commands::Stats => client.get(format!("{base}/stats")),
        Commands::Health => client.get(format!("{base}/healthcheck")),
        Commands::Version => client.get(format!("{base}/version")),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text.trim_end()),
    }
    Ok(())
}
