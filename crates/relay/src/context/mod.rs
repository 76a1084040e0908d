//! Context assembly: token budgeting and message-list construction.

pub mod assembler;
pub mod token;

pub use assembler::{ContextAssembler, DocumentRef, SourceMarker, CONTEXT_CLOSE, CONTEXT_OPEN};
pub use token::TokenEstimator;
