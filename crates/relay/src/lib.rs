//! Streaming relay: context assembly, stream demultiplexing, and exchange
//! orchestration for the inlet chat endpoint.

pub mod client;
pub mod context;
pub mod demux;
pub mod orchestrator;

pub use client::{ChatPayload, ChunkStream, ExchangeTransport, RelayClient, WireMessage};
pub use context::{ContextAssembler, DocumentRef, SourceMarker, TokenEstimator};
pub use demux::{Demultiplexer, Utf8Carry};
pub use orchestrator::{ExchangeRequest, RelayOrchestrator};
