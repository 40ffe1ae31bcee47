use crate::console::{parse_command, Command, ConsoleRenderer, HELP};
use crate::http::HttpGateway;
use crate::poll::{FetchOutcome, PollScheduler, SnapshotSource};
use crate::ClientConfig;
use anyhow::Context;
use peerster_core::{
    ConversationId, DownloadPost, FilePost, MessagePost, PeerPost, PostRequest, SyncEngine,
    SyncEvent,
};
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

const OUTCOME_CHANNEL_CAPACITY: usize = 64;

/// Single owner of the sync engine; every snapshot and conversation switch
/// goes through here in arrival order.
pub struct Session<S> {
    engine: SyncEngine,
    scheduler: PollScheduler<S>,
}

impl<S: SnapshotSource> Session<S> {
    pub fn new(source: Arc<S>, outcomes: mpsc::Sender<FetchOutcome>) -> Self {
        Self {
            engine: SyncEngine::new(),
            scheduler: PollScheduler::new(source, outcomes),
        }
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn tick(&mut self) -> usize {
        self.scheduler.tick()
    }

    pub fn select(&mut self, conversation: ConversationId) -> Vec<SyncEvent> {
        self.engine.select_conversation(conversation)
    }

    /// Failed or empty fetches leave the view untouched; the next tick retries.
    pub fn handle_outcome(&mut self, outcome: FetchOutcome) -> Vec<SyncEvent> {
        let FetchOutcome { kind, result } = outcome;
        self.scheduler.complete(kind);
        match result {
            Ok(Some(snapshot)) => {
                if snapshot.kind() != kind {
                    warn!(
                        event = "poll_kind_mismatch",
                        requested = %kind,
                        received = %snapshot.kind()
                    );
                }
                self.engine.apply(snapshot)
            }
            Ok(None) => {
                debug!(event = "poll_snapshot_null", kind = %kind);
                Vec::new()
            }
            Err(err) => {
                warn!(event = "poll_fetch_error", kind = %kind, error = %err);
                Vec::new()
            }
        }
    }
}

fn spawn_post<R>(gateway: &Arc<HttpGateway>, request: R)
where
    R: PostRequest + Send + Sync + 'static,
{
    let gateway = Arc::clone(gateway);
    tokio::spawn(async move {
        match gateway.post(&request).await {
            Ok(()) => debug!(event = "post_sent", path = R::PATH),
            Err(err) => warn!(event = "post_failed", path = R::PATH, error = %err),
        }
    });
}

/// Polls the gossiper and renders the active conversation until `/quit` or
/// ctrl-c.
pub async fn run_watch(
    config: &ClientConfig,
    gateway: Arc<HttpGateway>,
    initial: ConversationId,
) -> anyhow::Result<()> {
    let (outcomes_tx, mut outcomes_rx) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY);
    let mut session = Session::new(Arc::clone(&gateway), outcomes_tx);
    let stdout = std::io::stdout();
    let color = stdout.is_terminal();
    let mut console = ConsoleRenderer::new(stdout, color);

    info!(
        event = "watch_started",
        server = gateway.base_url(),
        poll_ms = config.poll_interval.as_millis() as u64
    );
    console
        .render_all(&session.select(initial))
        .context("write to stdout")?;

    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.tick();
            }
            Some(outcome) = outcomes_rx.recv() => {
                let events = session.handle_outcome(outcome);
                console.render_all(&events).context("write to stdout")?;
            }
            line = lines.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        debug!(event = "stdin_closed");
                        stdin_open = false;
                        continue;
                    }
                    Err(err) => {
                        warn!(event = "stdin_read_error", error = %err);
                        stdin_open = false;
                        continue;
                    }
                };
                let Some(command) = parse_command(&line) else {
                    continue;
                };
                if !dispatch(command, &mut session, &mut console, &gateway)? {
                    break;
                }
            }
            _ = &mut shutdown => {
                info!(event = "watch_interrupted");
                break;
            }
        }
    }
    info!(event = "watch_stopped");
    Ok(())
}

/// Returns `false` once the user asks to leave.
fn dispatch<W: std::io::Write>(
    command: Command,
    session: &mut Session<HttpGateway>,
    console: &mut ConsoleRenderer<W>,
    gateway: &Arc<HttpGateway>,
) -> anyhow::Result<bool> {
    match command {
        Command::Select(conversation) => {
            console
                .render_all(&session.select(conversation))
                .context("write to stdout")?;
        }
        Command::ListPeers => console
            .list_peers(session.engine().store())
            .context("write to stdout")?,
        Command::ListOrigins => console
            .list_origins(session.engine().store())
            .context("write to stdout")?,
        Command::AddPeer(node) => match PeerPost::new(node) {
            Ok(post) => spawn_post(gateway, post),
            Err(err) => console.line(&format!("! {err}"))?,
        },
        Command::Share(filename) => match FilePost::new(filename) {
            Ok(post) => spawn_post(gateway, post),
            Err(err) => console.line(&format!("! {err}"))?,
        },
        Command::Download {
            filename,
            hexhash,
            destination,
            origin,
        } => match DownloadPost::new(filename, hexhash, destination, origin) {
            Ok(post) => spawn_post(gateway, post),
            Err(err) => console.line(&format!("! {err}"))?,
        },
        Command::Say(text) => {
            let Some(active) = session.engine().active() else {
                console.line("! no active conversation")?;
                return Ok(true);
            };
            match MessagePost::new(active, text) {
                Ok(post) => spawn_post(gateway, post),
                Err(err) => console.line(&format!("! {err}"))?,
            }
        }
        Command::Help => console.line(HELP)?,
        Command::Quit => return Ok(false),
        Command::Invalid(line) => console.line(&format!("! unknown command: {line} (try /help)"))?,
    }
    Ok(true)
}
