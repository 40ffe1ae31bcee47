use crate::model::{ReputationScore, ReputationSnapshot, ReputationTable};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid peer entry: {0}")]
    InvalidPeer(String),
}

/// The five independently polled collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKind {
    Rumors,
    PrivateMessages,
    Peers,
    Origins,
    Reputations,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 5] = [
        CollectionKind::Rumors,
        CollectionKind::PrivateMessages,
        CollectionKind::Peers,
        CollectionKind::Origins,
        CollectionKind::Reputations,
    ];

    pub fn path(self) -> &'static str {
        match self {
            CollectionKind::Rumors => "/message",
            CollectionKind::PrivateMessages => "/private-message",
            CollectionKind::Peers => "/node",
            CollectionKind::Origins => "/reachable-node",
            CollectionKind::Reputations => "/reputations",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKind::Rumors => "rumors",
            CollectionKind::PrivateMessages => "private_messages",
            CollectionKind::Peers => "peers",
            CollectionKind::Origins => "origins",
            CollectionKind::Reputations => "reputations",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RumorRecord {
    #[serde(rename = "SenderName")]
    pub sender_name: String,
    #[serde(rename = "Text", default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateRecord {
    #[serde(rename = "Origin")]
    pub origin: String,
    #[serde(rename = "Dest", default)]
    pub dest: String,
    #[serde(rename = "Text", default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ReputationsPayload {
    #[serde(rename = "SigReps", default)]
    sig_reps: Option<HashMap<String, f32>>,
    #[serde(rename = "ContribReps", default)]
    contrib_reps: Option<HashMap<String, f32>>,
}

/// A full point-in-time view of one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionSnapshot {
    Rumors(Vec<RumorRecord>),
    PrivateMessages(Vec<PrivateRecord>),
    Peers(Vec<String>),
    Origins(Vec<String>),
    Reputations(ReputationSnapshot),
}

impl CollectionSnapshot {
    pub fn kind(&self) -> CollectionKind {
        match self {
            CollectionSnapshot::Rumors(_) => CollectionKind::Rumors,
            CollectionSnapshot::PrivateMessages(_) => CollectionKind::PrivateMessages,
            CollectionSnapshot::Peers(_) => CollectionKind::Peers,
            CollectionSnapshot::Origins(_) => CollectionKind::Origins,
            CollectionSnapshot::Reputations(_) => CollectionKind::Reputations,
        }
    }
}

/// Decodes a response body for `kind`.
///
/// A top-level JSON `null` means the server has nothing for this collection
/// yet and yields `Ok(None)`; an empty array is a valid, empty snapshot.
pub fn decode_snapshot(
    kind: CollectionKind,
    body: &[u8],
) -> Result<Option<CollectionSnapshot>, WireError> {
    let value: Value = serde_json::from_slice(body)?;
    if value.is_null() {
        return Ok(None);
    }
    let snapshot = match kind {
        CollectionKind::Rumors => CollectionSnapshot::Rumors(serde_json::from_value(value)?),
        CollectionKind::PrivateMessages => {
            CollectionSnapshot::PrivateMessages(serde_json::from_value(value)?)
        }
        CollectionKind::Peers => {
            let entries: Vec<Value> = serde_json::from_value(value)?;
            let peers = entries
                .iter()
                .map(peer_address)
                .collect::<Result<Vec<_>, _>>()?;
            CollectionSnapshot::Peers(peers)
        }
        CollectionKind::Origins => CollectionSnapshot::Origins(serde_json::from_value(value)?),
        CollectionKind::Reputations => {
            let payload: ReputationsPayload = serde_json::from_value(value)?;
            CollectionSnapshot::Reputations(ReputationSnapshot {
                signature: reputation_table(payload.sig_reps),
                contribution: reputation_table(payload.contrib_reps),
            })
        }
    };
    Ok(Some(snapshot))
}

/// Peers come either as plain `ip:port` strings or as the gossiper's
/// `{"Address": {"IP": .., "Port": ..}}` records.
fn peer_address(entry: &Value) -> Result<String, WireError> {
    match entry {
        Value::String(address) => Ok(address.clone()),
        Value::Object(map) => {
            let address = map
                .get("Address")
                .and_then(Value::as_object)
                .ok_or_else(|| WireError::InvalidPeer(entry.to_string()))?;
            let ip = address
                .get("IP")
                .and_then(Value::as_str)
                .ok_or_else(|| WireError::InvalidPeer(entry.to_string()))?;
            let port = address
                .get("Port")
                .and_then(Value::as_u64)
                .ok_or_else(|| WireError::InvalidPeer(entry.to_string()))?;
            if ip.contains(':') {
                Ok(format!("[{ip}]:{port}"))
            } else {
                Ok(format!("{ip}:{port}"))
            }
        }
        other => Err(WireError::InvalidPeer(other.to_string())),
    }
}

fn reputation_table(raw: Option<HashMap<String, f32>>) -> ReputationTable {
    raw.unwrap_or_default()
        .into_iter()
        .filter_map(|(id, value)| ReputationScore::new(value).map(|score| (id, score)))
        .collect()
}
