//! CLI entry point for chat-relay

use anyhow::Result;
use chat_relay_agent::{AgentFactory, ChatOutcome};
use chat_relay_core::config::{Config, ConfigLoader};
use chat_relay_core::logging::init_logging;
use chat_relay_core::session::{SessionStore, DEFAULT_SESSION_ID};
use chat_relay_manager::{run_server, AppState};
use clap::{Parser, Subcommand};
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "chat-relay")]
#[command(about = "Session-aware chat service backed by Hugging Face inference")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Send a single message and print the reply
    Chat {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Session id tagged on the exchange's log records (history is not
        /// kept between runs)
        #[arg(short, long)]
        session: Option<String>,
        /// Model to use
        #[arg(long)]
        model: Option<String>,
    },
    /// Validate configuration and print a summary
    Check,
    /// Write a default config.json to the config directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    let command = cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    });

    // Runs before loading so a broken config file can be replaced.
    if let Commands::Init { force } = command {
        return run_init(&config_loader, force);
    }

    let config = config_loader.load()?;

    match command {
        Commands::Serve { host, port } => {
            let _guard = init_logging(&config.logging);
            run_serve(config, host, port).await?;
        }
        Commands::Chat {
            message,
            session,
            model,
        } => {
            let _guard = init_logging(&config.logging);
            run_chat(config, &message, session, model).await?;
        }
        Commands::Check => run_check(&config_loader, &config),
        Commands::Init { .. } => {} // handled before loading
    }

    Ok(())
}

async fn run_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let addr = tokio::net::lookup_host((config.server.host.as_str(), config.server.port))
        .await?
        .next()
        .ok_or_else(|| anyhow::anyhow!("Cannot resolve {}", config.server.host))?;

    println!("{}", style("Starting chat-relay server...").bold().cyan());
    println!("Model: {}", config.provider.model);
    println!("Address: http://{}", addr);

    let factory = AgentFactory::new(config, Arc::new(SessionStore::new()));
    let state = AppState::from_factory(factory);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        println!("\n{}", style("Shutting down...").yellow());
        let _ = shutdown_tx.send(());
    });

    run_server(state, addr, shutdown_rx).await?;

    println!("{}", style("Server stopped.").green());
    Ok(())
}

/// Run one exchange without the HTTP layer
async fn run_chat(
    mut config: Config,
    message: &str,
    session: Option<String>,
    model: Option<String>,
) -> Result<()> {
    let message = message.trim();
    if message.is_empty() {
        anyhow::bail!("No message provided");
    }
    if let Some(model) = model {
        config.provider.model = model;
    }

    let factory = AgentFactory::new(config, Arc::new(SessionStore::new()));
    let agent = factory.build(None)?;
    let session_id = session.unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());

    info!(session_id = %session_id, model = agent.model(), "Processing message");
    println!("{}", style("Processing...").cyan());

    match agent.exchange(&session_id, message).await {
        ChatOutcome::Reply(reply) => {
            println!("\n{}", style("Response:").bold());
            println!("{}", reply);
        }
        ChatOutcome::Fallback { reply, reason } => {
            println!("\n{}", style("Response (fallback):").bold().yellow());
            println!("{}", reply);
            eprintln!(
                "{} {}: {}",
                style("Backend error").red(),
                reason.kind,
                reason.message
            );
        }
    }

    Ok(())
}

/// Write defaults only; tokens and env overrides never reach the file
fn run_init(loader: &ConfigLoader, force: bool) -> Result<()> {
    let config_path = loader.config_path();
    if config_path.exists() && !force {
        println!(
            "Configuration already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
        return Ok(());
    }

    loader.save(&Config::default())?;

    println!(
        "{} {}",
        style("Configuration written to").green(),
        config_path.display()
    );
    println!("\nNext steps:");
    println!("  Set HF_API_TOKEN in the environment or a .env file");
    println!("  {} - Start the server", style("chat-relay serve").cyan());
    println!(
        "  {} - Send a message",
        style("chat-relay chat --message 'Hello!'").cyan()
    );
    Ok(())
}

fn run_check(loader: &ConfigLoader, config: &Config) {
    println!("{}", style("chat-relay configuration").bold().cyan());
    println!("  Config directory: {}", loader.config_dir().display());
    println!(
        "  Config file: {}",
        present(loader.config_path().exists(), "found", "not found (defaults)")
    );
    println!();

    println!("{}", style("Provider:").bold());
    println!("  Model: {}", config.provider.model);
    println!("  API style: {:?}", config.provider.api_style);
    println!(
        "  API base: {}",
        config.provider.api_base.as_deref().unwrap_or("(default)")
    );
    println!("  Timeout: {}s", config.provider.timeout_secs);
    println!(
        "  Token: {}",
        present(
            config.provider.api_key().is_some(),
            "configured",
            "not configured"
        )
    );
    println!();

    let sampling = &config.agent.sampling;
    println!("{}", style("Agent:").bold());
    println!(
        "  Prompt file: {} ({})",
        config.agent.prompt_file,
        present(
            Path::new(&config.agent.prompt_file).exists(),
            "found",
            "missing, default instruction used"
        )
    );
    println!(
        "  Sampling: temperature={} top_p={} max_new_tokens={} repetition_penalty={}",
        sampling.temperature, sampling.top_p, sampling.max_new_tokens, sampling.repetition_penalty
    );
    println!();

    println!("{}", style("Server:").bold());
    println!("  Listen: {}:{}", config.server.host, config.server.port);
    println!(
        "  Logging: level={} format={} dir={}",
        config.logging.level, config.logging.format, config.logging.dir
    );
    println!();

    println!("{}", style("Configuration is valid.").green());
}

fn present(ok: bool, yes: &str, no: &str) -> String {
    if ok {
        style(yes).green().to_string()
    } else {
        style(no).red().to_string()
    }
}
