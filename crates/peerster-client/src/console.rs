use peerster_core::format::{display_score, score_tint};
use peerster_core::{ConversationId, EntityStore, ReputationScore, SyncEvent};
use std::io::{self, Write};

/// One line typed into the watch session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select(ConversationId),
    ListPeers,
    ListOrigins,
    AddPeer(String),
    Share(String),
    Download {
        filename: String,
        hexhash: String,
        destination: String,
        origin: String,
    },
    Say(String),
    Help,
    Quit,
    Invalid(String),
}

/// Blank lines parse to `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Say(line.to_string()));
    };
    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();
    let command = match (name, args.as_slice()) {
        ("broadcast", []) => Command::Select(ConversationId::Broadcast),
        ("chat", [origin]) => Command::Select(ConversationId::origin(*origin)),
        ("peers", []) => Command::ListPeers,
        ("origins", []) => Command::ListOrigins,
        ("add", [node]) => Command::AddPeer(node.to_string()),
        ("share", [filename]) => Command::Share(filename.to_string()),
        ("download", [filename, hexhash, destination, origin]) => Command::Download {
            filename: filename.to_string(),
            hexhash: hexhash.to_string(),
            destination: destination.to_string(),
            origin: origin.to_string(),
        },
        ("help", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        _ => Command::Invalid(line.to_string()),
    };
    Some(command)
}

pub const HELP: &str = "\
/broadcast                                   show the broadcast conversation
/chat <origin>                               show the private conversation with <origin>
/peers                                       list peers with contribution reputation
/origins                                     list origins with signature reputation
/add <ip:port>                               add a peer
/share <filename>                            share a file
/download <file> <hexhash> <dest> <origin>   request a file
/help                                        show this help
/quit                                        leave
anything else is sent to the active conversation";

/// Writes render events and listings as plain lines.
pub struct ConsoleRenderer<W> {
    out: W,
    color: bool,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn render(&mut self, event: &SyncEvent) -> io::Result<()> {
        match event {
            SyncEvent::Cleared(conversation) => {
                writeln!(self.out, "──── {conversation} ────")?;
            }
            SyncEvent::Messages {
                conversation,
                messages,
            } => {
                for message in messages {
                    writeln!(
                        self.out,
                        "[{conversation}] {}: {}",
                        message.sender, message.text
                    )?;
                }
            }
            SyncEvent::PeerAdded(peer) => writeln!(self.out, "+ peer {peer}")?,
            SyncEvent::OriginAdded(origin) => writeln!(self.out, "+ origin {origin}")?,
            // Picked up by the next listing.
            SyncEvent::ReputationsReplaced(_) => {}
        }
        self.out.flush()
    }

    pub fn render_all(&mut self, events: &[SyncEvent]) -> io::Result<()> {
        for event in events {
            self.render(event)?;
        }
        Ok(())
    }

    pub fn list_peers(&mut self, store: &EntityStore) -> io::Result<()> {
        let reputations = store.reputations();
        writeln!(self.out, "peers ({}):", store.peers().len())?;
        for peer in store.peers().as_slice() {
            let score = self.score(reputations.contribution_of(peer));
            writeln!(self.out, "  {peer:<24} {score}")?;
        }
        self.out.flush()
    }

    pub fn list_origins(&mut self, store: &EntityStore) -> io::Result<()> {
        let reputations = store.reputations();
        writeln!(self.out, "origins ({}):", store.origins().len())?;
        for origin in store.origins().as_slice() {
            let score = self.score(reputations.signature_of(origin));
            writeln!(self.out, "  {origin:<24} {score}")?;
        }
        self.out.flush()
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    fn score(&self, score: Option<ReputationScore>) -> String {
        let text = display_score(score);
        match score {
            Some(score) if self.color => {
                let (red, green, blue) = score_tint(score);
                format!("\x1b[38;2;{red};{green};{blue}m{text}\x1b[0m")
            }
            _ => text,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}
