mod commands;
mod output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use xero_api::{Client, ClientConfig, Credentials, HttpExecutor, OAuthSigner, RsaSha1};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "xero")]
#[command(about = "Call the Xero accounting API with automatic paging and batching")]
struct Cli {
    /// Output format: json or xml
    #[arg(long, default_value = "json", global = true)]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Perform one logical call against an API path
    Call(commands::call::CallArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("xero_api=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let format = match cli.output.as_str() {
        "xml" => OutputFormat::Xml,
        _ => OutputFormat::Json,
    };

    let client = build_client()?;

    match &cli.command {
        Commands::Call(args) => commands::call::run(args, &client, &format).await?,
    }

    Ok(())
}

fn build_client() -> Result<Client> {
    let consumer_key = std::env::var("XERO_CONSUMER_KEY")
        .context("XERO_CONSUMER_KEY environment variable not set")?;
    let private_key_path = std::env::var("XERO_PRIVATE_KEY_PATH").ok();
    // Private apps sign with their RSA key and do not need the consumer secret.
    let consumer_secret = match std::env::var("XERO_CONSUMER_SECRET") {
        Ok(secret) => secret,
        Err(_) if private_key_path.is_some() => String::new(),
        Err(_) => bail!(
            "XERO_CONSUMER_SECRET environment variable not set (or set XERO_PRIVATE_KEY_PATH)"
        ),
    };

    let mut credentials = Credentials::private_app(&consumer_key, &consumer_secret);
    if let Ok(token) = std::env::var("XERO_TOKEN") {
        credentials.token = Some(token);
    }
    if let Ok(token_secret) = std::env::var("XERO_TOKEN_SECRET") {
        credentials.token_secret = Some(token_secret);
    }

    let signer = match private_key_path {
        Some(path) => {
            let pem = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read private key {}", path))?;
            tracing::debug!("Signing requests with RSA-SHA1 key from {}", path);
            OAuthSigner::new(credentials, RsaSha1::from_pem(&pem)?)
        }
        None => OAuthSigner::plaintext(credentials),
    };

    let mut executor = HttpExecutor::new(signer)?;
    if let Ok(user_agent) = std::env::var("XERO_USER_AGENT") {
        executor = executor.with_header("User-Agent", &user_agent);
    }

    let config = ClientConfig::from_env()?;
    Ok(Client::with_config(executor, config)?)
}
