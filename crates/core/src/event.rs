//! Stream events, control messages, and the notification sink contract.
//!
//! The remote endpoint replies with a single `text/plain` chunked stream
//! that interleaves answer text with embedded JSON control objects. A
//! control object is a whole chunk of the form `{"type": "...", ...}`;
//! anything else is content. [`ControlMessage`] models the closed set of
//! recognized control shapes, [`StreamEvent`] is what the demultiplexer
//! emits, and [`Notification`] is the `{type, data}` envelope re-published
//! to the host's event sink.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Payload of a status update, shared between the wire control object and
/// the outbound notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusData {
    /// Human-readable description of the current state.
    pub description: String,

    /// Whether the operation this status describes has finished.
    #[serde(default)]
    pub done: bool,

    /// Hidden statuses are delivered but kept out of the visible transcript.
    #[serde(default)]
    pub hidden: bool,
}

impl StatusData {
    pub fn new(description: impl Into<String>, done: bool, hidden: bool) -> Self {
        Self {
            description: description.into(),
            done,
            hidden,
        }
    }
}

/// One metadata record attached to a citation (currently just the source URL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationMeta {
    pub source: String,
}

/// The named source of a citation, numbered by the emitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationSource {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Payload of a citation event: document excerpts plus source metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationData {
    /// Excerpts of the cited document(s).
    #[serde(default)]
    pub document: Vec<String>,

    /// One metadata record per excerpt.
    #[serde(default)]
    pub metadata: Vec<CitationMeta>,

    /// The named, numbered source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<CitationSource>,
}

/// A control object embedded inline in the content stream.
///
/// Decoded at the chunk boundary with the exact wire heuristic the remote
/// endpoint uses: the trimmed chunk starts with `{`, ends with `}`, parses
/// as JSON, and carries a recognized `type`. Unknown types and malformed
/// JSON both fail this decode and are treated as ordinary content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    Status(StatusData),
    Citation(CitationData),
}

/// A typed event produced by the stream demultiplexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of visible answer text, in strict arrival order.
    Content(String),

    /// An out-of-band status update extracted from the stream.
    Status(StatusData),

    /// An out-of-band citation extracted from the stream.
    Citation(CitationData),

    /// The transport failed mid-stream.
    StreamError(String),
}

/// Payload of a `message` notification (errors and other host-visible text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    pub content: String,

    #[serde(default)]
    pub citations: Vec<serde_json::Value>,
}

/// An event published to the host's notification sink.
///
/// Serializes to the `{type: "status"|"message"|"citation", data: {...}}`
/// envelope the host expects. The core makes no assumption about the sink
/// beyond "deliver in call order".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Notification {
    Status(StatusData),
    Message(MessageData),
    Citation(CitationData),
}

impl Notification {
    /// A visible, in-progress status update.
    pub fn status(description: impl Into<String>) -> Self {
        Self::Status(StatusData::new(description, false, false))
    }

    /// The hidden "Answering" status that precedes the first content chunk.
    pub fn answering() -> Self {
        Self::Status(StatusData::new("Answering", false, true))
    }

    /// The hidden terminal "Done" status emitted on every exit path.
    pub fn done() -> Self {
        Self::Status(StatusData::new("Done", true, true))
    }

    /// A host-visible message with no citations.
    pub fn message(content: impl Into<String>) -> Self {
        Self::Message(MessageData {
            content: content.into(),
            citations: Vec::new(),
        })
    }
}

/// The host-provided event sink.
///
/// Implementations deliver notifications to the surrounding runtime (a
/// websocket, an event emitter, a log). Delivery failures are the sink's
/// problem; `emit` is infallible from the relay's point of view.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn emit(&self, event: Notification);
}

/// A sink that forwards notifications over a tokio mpsc channel.
pub struct ChannelSink {
    tx: tokio::sync::mpsc::Sender<Notification>,
}

impl ChannelSink {
    pub fn new(tx: tokio::sync::mpsc::Sender<Notification>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn emit(&self, event: Notification) {
        // A closed receiver means the host went away; nothing to do.
        let _ = self.tx.send(event).await;
    }
}

/// A sink that discards every notification.
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn emit(&self, _event: Notification) {}
}
