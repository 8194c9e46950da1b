//! ISS gateway — entry point.

use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use iss_gateway::rest::{self, GatewayState};
use iss_gateway::{assemble, render_sdl, GatewayConfig, IssClient};

#[derive(Parser)]
#[command(
    name = "iss-gateway",
    about = "Typed query gateway for MOEX ISS, generated from ISS reference pages",
    version
)]
struct Cli {
    /// Path to a JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Override the ISS base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the schema and serve the REST API (default).
    Serve {
        /// Listen address (host:port).
        #[arg(long)]
        listen: Option<String>,
    },

    /// Assemble the schema and print it as GraphQL SDL.
    Schema,

    /// Parse a saved ISS reference page and print it as JSON.
    Parse {
        /// Path to the HTML file.
        file: String,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<GatewayConfig> {
    let mut config = GatewayConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(base_url) = &cli.base_url {
        url::Url::parse(base_url).with_context(|| format!("invalid --base-url {base_url:?}"))?;
        config.base_url = base_url.clone();
    }
    Ok(config)
}

async fn build_schema(config: &GatewayConfig) -> anyhow::Result<(IssClient, iss_gateway::QuerySchema)> {
    let client = IssClient::new(config.base_url(), config.timeout_ms);
    let schema = assemble(&client, config)
        .await
        .context("failed to assemble query schema")?;
    Ok((client, schema))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        None | Some(Commands::Serve { .. }) => {
            let config = load_config(&cli)?;
            let listen = match &cli.command {
                Some(Commands::Serve { listen: Some(addr) }) => addr.clone(),
                _ => config.listen.clone(),
            };
            let (client, schema) = build_schema(&config).await?;
            let state = Arc::new(GatewayState::new(schema, client, config.references.clone()));
            rest::start(&listen, state).await?;
        }

        Some(Commands::Schema) => {
            let config = load_config(&cli)?;
            let (_, schema) = build_schema(&config).await?;
            print!("{}", render_sdl(&schema));
        }

        Some(Commands::Parse { file }) => {
            let markup = std::fs::read_to_string(file).with_context(|| format!("failed to read {file}"))?;
            let reference = iss_reference::parse(&markup).with_context(|| format!("failed to parse {file}"))?;
            println!("{}", serde_json::to_string_pretty(&reference)?);
        }

        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "iss-gateway", &mut std::io::stdout());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    if let Err(e) = run(cli).await {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }
}
