//! # Inlet Core
//!
//! Domain types, traits, and error definitions for the inlet streaming
//! chat relay. This crate has **zero framework dependencies** — it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The relay sits between a chat host and a remote inference endpoint.
//! Everything that crosses a crate boundary — messages, stream events,
//! notifications, outcomes — is defined here so that the relay, search,
//! and CLI crates all depend inward on one vocabulary.

pub mod error;
pub mod event;
pub mod message;
pub mod outcome;

// Re-export key types at crate root for ergonomics
pub use error::{Error, RelayError, Result, SearchError};
pub use event::{
    ChannelSink, CitationData, CitationMeta, CitationSource, ControlMessage, Notification,
    NotificationSink, NullSink, StatusData, StreamEvent,
};
pub use message::{Message, Role};
pub use outcome::{ErrorPayload, RelayOutcome};
