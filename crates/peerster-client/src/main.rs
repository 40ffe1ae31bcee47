mod console;
mod http;
mod poll;
mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::ConsoleRenderer;
use http::HttpGateway;
use peerster_core::{
    CollectionKind, ConversationId, DownloadPost, FilePost, MessagePost, PeerPost, PostRequest,
    SyncEngine,
};
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "peerster")]
#[command(about = "Terminal client for a Peerster gossiper", long_about = None)]
struct Cli {
    /// Gossiper web server, `host:port` or `http(s)://host:port`.
    #[arg(long, env = "PEERSTER_SERVER", default_value = "127.0.0.1:8080", global = true)]
    server: String,
    #[arg(long, env = "PEERSTER_POLL_MS", default_value_t = 1000, global = true)]
    poll_ms: u64,
    #[arg(long, env = "PEERSTER_TIMEOUT_SECS", default_value_t = 5, global = true)]
    timeout_secs: u64,
    #[arg(long, default_value_t = false, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Follow a conversation and type commands on stdin (default)
    Watch {
        /// Start in the private conversation with this origin
        #[arg(long)]
        chat: Option<String>,
    },
    /// Send one message; broadcast unless `--to` names an origin
    Send {
        #[arg(long)]
        to: Option<String>,
        text: String,
    },
    /// Add a peer by `ip:port`
    AddPeer { node: String },
    /// Share a file from the gossiper's shared directory
    Share { filename: String },
    /// Request a file by metahash from an origin
    Download {
        filename: String,
        hexhash: String,
        destination: String,
        origin: String,
    },
    /// Fetch every collection once and print what the gossiper knows
    Snapshot,
}

#[derive(Debug, Clone)]
struct ClientConfig {
    server: String,
    poll_interval: Duration,
    timeout: Duration,
    debug: bool,
}

fn load_config(cli: &Cli) -> ClientConfig {
    ClientConfig {
        server: cli.server.clone(),
        poll_interval: Duration::from_millis(cli.poll_ms.max(1)),
        timeout: Duration::from_secs(cli.timeout_secs.max(1)),
        debug: cli.debug,
    }
}

fn init_logging(config: &ClientConfig) {
    let level = if config.debug {
        "debug".to_string()
    } else if let Ok(level) = std::env::var("PEERSTER_LOG_LEVEL") {
        level
    } else {
        "info".to_string()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli);
    init_logging(&config);

    let gateway = HttpGateway::new(&config.server, config.timeout)
        .with_context(|| format!("failed to build client for {}", config.server))?;

    match cli.command.unwrap_or(Commands::Watch { chat: None }) {
        Commands::Watch { chat } => {
            let initial = chat.map_or(ConversationId::Broadcast, ConversationId::origin);
            session::run_watch(&config, Arc::new(gateway), initial).await
        }
        Commands::Send { to, text } => {
            let conversation = to.map_or(ConversationId::Broadcast, ConversationId::origin);
            let post = MessagePost::new(&conversation, text).context("invalid message")?;
            send(&gateway, &post).await
        }
        Commands::AddPeer { node } => {
            let post = PeerPost::new(node).context("invalid peer")?;
            send(&gateway, &post).await
        }
        Commands::Share { filename } => {
            let post = FilePost::new(filename).context("invalid filename")?;
            send(&gateway, &post).await
        }
        Commands::Download {
            filename,
            hexhash,
            destination,
            origin,
        } => {
            let post = DownloadPost::new(filename, hexhash, destination, origin)
                .context("invalid download request")?;
            send(&gateway, &post).await
        }
        Commands::Snapshot => snapshot(&gateway).await,
    }
}

async fn send<R: PostRequest>(gateway: &HttpGateway, request: &R) -> Result<()> {
    gateway
        .post(request)
        .await
        .with_context(|| format!("POST {} failed", R::PATH))?;
    info!(event = "post_sent", path = R::PATH);
    Ok(())
}

async fn snapshot(gateway: &HttpGateway) -> Result<()> {
    let mut engine = SyncEngine::new();
    for kind in CollectionKind::ALL {
        match gateway.get_snapshot(kind).await {
            Ok(Some(snapshot)) => {
                engine.apply(snapshot);
            }
            Ok(None) => {}
            Err(err) => warn!(event = "poll_fetch_error", kind = %kind, error = %err),
        }
    }

    let stdout = std::io::stdout();
    let color = stdout.is_terminal();
    let mut console = ConsoleRenderer::new(stdout, color);
    console
        .render_all(&engine.select_conversation(ConversationId::Broadcast))
        .context("write to stdout")?;
    console
        .list_peers(engine.store())
        .context("write to stdout")?;
    console
        .list_origins(engine.store())
        .context("write to stdout")?;
    for origin in engine.store().origins().as_slice() {
        let count = engine
            .store()
            .messages_for(&ConversationId::origin(origin.as_str()))
            .len();
        if count > 0 {
            console
                .line(&format!("@{origin}: {count} private message(s)"))
                .context("write to stdout")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_watch_against_local_gossiper() {
        let cli = Cli::try_parse_from(["peerster"]).expect("parse");
        assert!(cli.command.is_none());
        let config = load_config(&cli);
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.debug);
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "peerster",
            "send",
            "--to",
            "bob",
            "hello",
            "--server",
            "10.0.0.1:9000",
            "--poll-ms",
            "0",
        ])
        .expect("parse");
        let config = load_config(&cli);
        assert_eq!(config.server, "10.0.0.1:9000");
        assert_eq!(config.poll_interval, Duration::from_millis(1));
        match cli.command {
            Some(Commands::Send { to, text }) => {
                assert_eq!(to.as_deref(), Some("bob"));
                assert_eq!(text, "hello");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn download_takes_four_positionals() {
        let cli = Cli::try_parse_from(["peerster", "download", "a.bin", "00ff", "bob", "alice"])
            .expect("parse");
        assert!(matches!(cli.command, Some(Commands::Download { .. })));
        assert!(Cli::try_parse_from(["peerster", "download", "a.bin"]).is_err());
    }
}
