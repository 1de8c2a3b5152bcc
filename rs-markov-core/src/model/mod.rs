//! Top-level module for the Markov chain text model.
//!
//! This module provides a word-level Markov generator, including:
//! - The trainable chain with forward and backward mappings (`Chain`)
//! - Internal fixed-length context windows (`Prefix`, `Slot`)

/// The Markov chain itself: training, merging, and both generation modes.
///
/// Exposes corpus ingestion, unconstrained forward generation and
/// keyword-anchored bidirectional generation.
pub mod chain;

/// Internal representation of a fixed-length context window.
///
/// Tracks the last `prefix_len` words seen and supports pure shift
/// operations in both directions. This module is not exposed publicly.
mod prefix;
