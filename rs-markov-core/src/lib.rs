//! Word-level Markov chain text model.
//!
//! This crate provides the chat-bot text model:
//! - A fixed-length sliding context window over whitespace-delimited words
//! - Forward and backward context-to-word mappings learned in a single pass
//! - Unconstrained generation and keyword-anchored bidirectional generation
//! - Parallel ingestion of a corpus file into a single merged chain
//!
//! Only the high-level API is exposed publicly. Low-level components
//! are kept internal to ensure consistency and prevent misuse.

/// Core Markov model and generation logic.
///
/// This module exposes the high-level chain interface while keeping
/// internal context representations private.
pub mod model;

/// I/O utilities (corpus file loading).
///
/// Not exposed
pub(crate) mod io;
