use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gateway_auth::config;
use gateway_auth::observability::init_observability;
use gateway_auth::{ApiKeyAuthenticator, AuthContext, AuthStack, Authenticator};

#[derive(Parser, Debug)]
#[command(name = "gateway-auth")]
#[command(about = "Inspect and exercise the gateway authentication stack", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable JSON logging output
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate one credential and print the resolved identity
    Verify {
        /// Bearer token or API key
        #[arg(long, env = "GATEWAY_AUTH_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// List configured API keys (names and roles only)
    ListKeys,

    /// Mint a new API key value
    GenerateKey {
        /// Key name, unique among configured keys
        #[arg(long)]
        name: String,

        /// Role granted to the key (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration with precedence: env > file > defaults
    let mut config = if let Some(ref path) = args.config {
        config::load_config_from_path(path)?
    } else {
        config::load_config()?
    };

    if args.verbose {
        config.telemetry.log_level = "debug".to_string();
    }
    if args.json_logs {
        config.telemetry.json_logs = true;
    }

    init_observability(&config.telemetry)?;
    config.validate()?;

    match args.command {
        Command::Verify { token } => {
            let stack = AuthStack::build(&config.auth)
                .await
                .context("Failed to build authentication stack")?;
            let ctx = AuthContext::new().with_token(token);

            let identity = stack
                .authenticate(&ctx)
                .await
                .context("Authentication failed")?
                .context("Credential was not accepted")?;

            println!("{}", serde_json::to_string_pretty(&identity)?);
        }
        Command::ListKeys => {
            let keys = ApiKeyAuthenticator::new(&config.auth.api_keys);
            println!("{}", serde_json::to_string_pretty(&keys.list_keys())?);
        }
        Command::GenerateKey { name, roles } => {
            let keys = ApiKeyAuthenticator::new(&config.auth.api_keys);
            let secret = keys.generate_key(&name, roles)?;
            tracing::info!(name = %name, "Generated API key; add it to [[auth.api_keys]] to persist");
            println!("{secret}");
        }
    }

    Ok(())
}
