use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use music_link_relay as lib;
use lib::api::spotify::SpotifyClient;
use lib::api::spotify_auth;
use lib::config::Config;
use lib::handler::MessageHandler;
use lib::listener::Listener;
use lib::models::ChatMessage;
use lib::session::SessionStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "music-relay", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read chat messages from stdin, one per line, and print replies (long-running)
    Run,
    /// Run the pipeline once on a message text.
    ///
    /// One-shot mode starts without a Spotify session, so a link that is on
    /// Spotify is printed with the re-authentication advisory and nothing is
    /// added to the playlist. Use `run` and `/callback` to sync.
    Resolve {
        /// Message text to scan for a music link
        text: String,
    },
    /// Print the Spotify authorization URL
    AuthUrl,
    /// Validate config file and exit
    ConfigValidate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Explicit --config wins; otherwise /etc, then the example config for dev.
    let resolved_config_path: PathBuf = match &cli.config {
        Some(p) => p.clone(),
        None => {
            let etc_path = Path::new("/etc/music-relay/config.toml");
            if etc_path.exists() {
                etc_path.to_path_buf()
            } else {
                PathBuf::from("config/example-config.toml")
            }
        }
    };

    let mut cfg = Config::from_path(&resolved_config_path)
        .with_context(|| format!("loading config from {}", resolved_config_path.display()))?;
    cfg.apply_env();

    // log -> tracing bridge; stderr plus a daily-rotated file in cfg.log_dir.
    // stdout is reserved for replies.
    let _ = LogTracer::init();
    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(&cfg.log_dir, "music-relay.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer().with_writer(non_blocking);
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer);

    tracing_subscriber_global::set_global_default(subscriber)
        .context("failed to set global tracing subscriber")?;

    match cli.command {
        Commands::Run => {
            cfg.validate().context("invalid config")?;
            run_listener(cfg).await.context("running listener")?;
        }
        Commands::Resolve { text } => {
            cfg.validate().context("invalid config")?;
            let handler = build_handler(&cfg, Arc::new(SessionStore::new()))?;
            for reply in handler.handle(&ChatMessage::from_user(text)).await {
                println!("{}", reply);
            }
        }
        Commands::AuthUrl => {
            println!("{}", spotify_auth::authorize_url(&cfg)?);
        }
        Commands::ConfigValidate => match cfg.validate() {
            Ok(_) => println!("OK"),
            Err(e) => {
                eprintln!("Config validation failed: {}", e);
                std::process::exit(2);
            }
        },
    }

    Ok(())
}

fn build_handler(cfg: &Config, sessions: Arc<SessionStore>) -> Result<MessageHandler> {
    let spotify = SpotifyClient::new(cfg.http_client()?, cfg.spotify_api_base.clone());
    MessageHandler::from_config(cfg, sessions, Arc::new(spotify))
}

async fn run_listener(cfg: Config) -> Result<()> {
    let handler = build_handler(&cfg, Arc::new(SessionStore::new()))?;
    let listener = Listener::new(cfg, handler)?;
    let out = Arc::new(Mutex::new(tokio::io::stdout()));
    listener
        .run(tokio::io::stdin(), out, tokio::signal::ctrl_c())
        .await
}
