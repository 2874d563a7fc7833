use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "balancer-cli")]
#[command(about = "Drive the balancer's data surface", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert or replace a backend with fixed figures
    Submit {
        name: String,
        ip: String,
        #[arg(long, default_value_t = 0)]
        current_users: i64,
        #[arg(long, default_value_t = 1000)]
        max_users: i64,
        #[arg(long, default_value_t = 1000)]
        remaining_slots: i64,
    },
    /// Answer every lookup as if it came from this address
    Override { ip: String },
    /// Remove the source address override
    ClearOverride,
    /// List registered backends
    Servers,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Submit {
            name,
            ip,
            current_users,
            max_users,
            remaining_slots,
        } => {
            let body = json!({
                "name": name,
                "ip_address": ip,
                "current_users": current_users,
                "max_users": max_users,
                "remaining_slots": remaining_slots,
            });
            let res = client
                .post(format!("{}/submit_data", cli.url))
                .json(&body)
                .send()
                .await?;
            print_text(res).await?;
        }
        Commands::Override { ip } => {
            let res = client
                .post(format!("{}/dns_ip_override", cli.url))
                .body(ip)
                .send()
                .await?;
            print_text(res).await?;
        }
        Commands::ClearOverride => {
            let res = client
                .post(format!("{}/dns_ip_override", cli.url))
                .body("")
                .send()
                .await?;
            print_text(res).await?;
        }
        Commands::Servers => {
            let res = client.get(format!("{}/servers", cli.url)).send().await?;
            print_json(res).await?;
        }
    }

    Ok(())
}

async fn print_text(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if status.is_success() {
        println!("{text}");
    } else {
        eprintln!("Error ({status}): {text}");
    }
    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if res.status().is_success() {
        let json: Value = res.json().await?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        eprintln!("Error: {}", res.status());
        eprintln!("{}", res.text().await?);
    }
    Ok(())
}
