//! vapi-mcp CLI - outbound phone calls for AI agents
//!
//! Run `vapi-mcp --help` for usage information.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vapi_mcp::config::{Config, LogFormat, LoggingConfig};
use vapi_mcp::mcp::McpServer;
use vapi_mcp::web::{WebConfig, WebServer};
use vapi_mcp::{AssistantSelector, CallDispatcher, CallRequest, VapiMcpError};

#[derive(Parser)]
#[command(
    name = "vapi-mcp",
    about = "MCP server that places outbound phone calls through Vapi",
    version
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over HTTP at /mcp
    Serve {
        /// Address to bind to (defaults to the config, HOST/PORT, or 0.0.0.0:8000)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Serve MCP over stdio
    Stdio,

    /// Place a single call and print the result as JSON
    Call {
        /// Number to call, in international format (e.g. +15551234567)
        destination_phone_number: String,

        /// Customer name passed to the assistant
        #[arg(short, long)]
        name: Option<String>,

        /// Assistant to use (andy, mam)
        #[arg(short, long)]
        assistant: Option<String>,
    },

    /// Print the MCP tool definition
    Tools,

    /// Write a sample configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // A missing .env is normal in production
    let _ = dotenvy::dotenv();

    let config_path = cli.config;
    let verbose = cli.verbose;

    match cli.command {
        Commands::Init { force } => init_config(config_path, force).await?,
        Commands::Serve { bind } => {
            let config = load_config(config_path, verbose).await?;
            run_http_server(config, bind).await?
        }
        Commands::Stdio => {
            let config = load_config(config_path, verbose).await?;
            run_stdio_server(config).await?
        }
        Commands::Call {
            destination_phone_number,
            name,
            assistant,
        } => {
            let config = load_config(config_path, verbose).await?;
            place_call(config, destination_phone_number, name, assistant).await?
        }
        Commands::Tools => {
            let json = serde_json::to_string_pretty(&McpServer::tool_definition())?;
            println!("{}", json);
        }
    }

    Ok(())
}

/// Resolve configuration and start logging
async fn load_config(path: Option<PathBuf>, verbose: u8) -> Result<Config, VapiMcpError> {
    let config = Config::resolve(path.as_deref()).await?;
    init_logging(&config.logging, verbose);
    Ok(config)
}

/// Logs go to stderr so stdout stays free for the stdio transport
fn init_logging(logging: &LoggingConfig, verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn build_dispatcher(config: &Config) -> Result<CallDispatcher, VapiMcpError> {
    let provider = &config.provider;
    for selector in AssistantSelector::ALL {
        if let Err(e) = provider.resolve(selector) {
            warn!(assistant = %selector, error = %e, "Assistant not fully configured; calls with it will fail");
        }
    }

    Ok(CallDispatcher::with_vapi(provider.clone())?)
}

/// Run the MCP server over HTTP
async fn run_http_server(config: Config, bind: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let dispatcher = build_dispatcher(&config)?;
    let web_config = WebConfig {
        bind: bind.unwrap_or(config.server.bind),
    };

    let server = WebServer::new(web_config, McpServer::new(dispatcher));
    info!(bind = %server.bind_address(), tool = vapi_mcp::mcp::TOOL_NAME, "MCP endpoint at /mcp");

    server
        .run()
        .await
        .map_err(|e| -> Box<dyn std::error::Error> { e })?;
    Ok(())
}

/// Run the MCP server over stdio
async fn run_stdio_server(config: Config) -> Result<(), VapiMcpError> {
    let dispatcher = build_dispatcher(&config)?;
    McpServer::new(dispatcher).run_stdio().await
}

/// Place one call from the command line
async fn place_call(
    config: Config,
    destination_phone_number: String,
    name: Option<String>,
    assistant: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let dispatcher = build_dispatcher(&config)?;
    let request = CallRequest::new(destination_phone_number)
        .with_customer_name(name)
        .with_assistant(AssistantSelector::parse_or_default(assistant.as_deref()));

    let result = dispatcher.make_call(request).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize configuration
async fn init_config(path: Option<PathBuf>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = path.unwrap_or_else(Config::default_path);

    if config_path.exists() && !force {
        return Err(format!(
            "Configuration already exists at {}. Use --force to overwrite.",
            config_path.display()
        )
        .into());
    }

    if let Some(parent) = config_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let default_config = r#"# vapi-mcp Configuration
#
# Environment variables override these values:
#   VAPI_API_KEY, ANDY, MAM, PHONE, VAPI_BASE_URL, VAPI_TIMEOUT_SECS,
#   VAPI_ENRICH, VAPI_ENRICH_DELAY_SECS, HOST, PORT, LOG_FORMAT

[server]
bind = "0.0.0.0:8000"

[logging]
level = "info"
format = "pretty"

[provider]
base_url = "https://api.vapi.ai"
timeout_secs = 60
# phone_number_id = "..."
# api_key is best left to VAPI_API_KEY

[provider.assistants]
# andy = "..."
# mam = "..."

[enrichment]
enabled = true
delay_secs = 3
"#;

    tokio::fs::write(&config_path, default_config).await?;

    println!("Configuration initialized at {}", config_path.display());
    Ok(())
}
