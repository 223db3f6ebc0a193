use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Management CLI for the circuit breaker demo server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show state and counters of every breaker
    Status,
    /// Call a service through its breaker
    Call {
        #[arg(short, long, default_value = "service-a")]
        service: String,
    },
    /// Change the simulated failure probability of a service
    SetFailRate {
        #[arg(short, long)]
        service: String,
        #[arg(short, long)]
        rate: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/api/status", cli.url)).send().await?,
        Commands::Call { service } => {
            client
                .get(format!("{}/api/call", cli.url))
                .query(&[("service", service)])
                .send()
                .await?
        }
        Commands::SetFailRate { service, rate } => {
            client
                .post(format!("{}/api/config", cli.url))
                .json(&json!({ "service": service, "fail_rate": rate }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    // Rejected calls come back as 503 with a JSON body worth showing.
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
    }
    Ok(())
}
