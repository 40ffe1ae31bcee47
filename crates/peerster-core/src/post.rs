//! Request bodies for the write endpoints.
//!
//! Writes are pass-through side effects on the gossiper; the constructors
//! only reject input the browser client would never have sent.

use crate::model::ConversationId;
use serde::Serialize;
use thiserror::Error;

/// A JSON body accepted by one write endpoint.
pub trait PostRequest: Serialize {
    const PATH: &'static str;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PostValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("hexhash must be an even-length hex string: {0}")]
    InvalidHexHash(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagePost {
    pub message: String,
    pub destination: String,
}

impl PostRequest for MessagePost {
    const PATH: &'static str = "/message";
}

impl MessagePost {
    pub fn new(
        conversation: &ConversationId,
        message: impl Into<String>,
    ) -> Result<Self, PostValidationError> {
        let message = message.into();
        if message.is_empty() {
            return Err(PostValidationError::Empty("message"));
        }
        Ok(Self {
            message,
            destination: conversation.destination().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePost {
    pub filename: String,
}

impl PostRequest for FilePost {
    const PATH: &'static str = "/file";
}

impl FilePost {
    pub fn new(filename: impl Into<String>) -> Result<Self, PostValidationError> {
        let filename = filename.into();
        if filename.trim().is_empty() {
            return Err(PostValidationError::Empty("filename"));
        }
        Ok(Self { filename })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerPost {
    pub node: String,
}

impl PostRequest for PeerPost {
    const PATH: &'static str = "/node";
}

impl PeerPost {
    pub fn new(node: impl Into<String>) -> Result<Self, PostValidationError> {
        let node = node.into();
        if node.trim().is_empty() {
            return Err(PostValidationError::Empty("node"));
        }
        Ok(Self {
            node: node.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadPost {
    pub filename: String,
    pub hexhash: String,
    pub destination: String,
    pub origin: String,
}

impl PostRequest for DownloadPost {
    const PATH: &'static str = "/download";
}

impl DownloadPost {
    pub fn new(
        filename: impl Into<String>,
        hexhash: impl Into<String>,
        destination: impl Into<String>,
        origin: impl Into<String>,
    ) -> Result<Self, PostValidationError> {
        let post = Self {
            filename: filename.into(),
            hexhash: hexhash.into(),
            destination: destination.into(),
            origin: origin.into(),
        };
        for (field, value) in [
            ("filename", &post.filename),
            ("hexhash", &post.hexhash),
            ("destination", &post.destination),
            ("origin", &post.origin),
        ] {
            if value.is_empty() {
                return Err(PostValidationError::Empty(field));
            }
        }
        let well_formed = post.hexhash.len() % 2 == 0
            && post.hexhash.chars().all(|ch| ch.is_ascii_hexdigit());
        if !well_formed {
            return Err(PostValidationError::InvalidHexHash(post.hexhash));
        }
        Ok(post)
    }
}
