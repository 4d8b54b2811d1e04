//! Schema-closure inference.
//!
//! The inference view is a pure function of the completed base graph:
//! `view = close(base)`. There is no incremental update; the view is built
//! once and only read afterwards.

pub mod rdfs;

use std::time::Instant;

use crate::error::InferError;
use crate::graph::GraphStore;

pub use rdfs::{MAX_ROUNDS, Saturation, saturate};

/// Result type for inference.
pub type InferResult<T> = std::result::Result<T, InferError>;

/// Read-only closure of the base graph under the RDFS rules.
#[derive(Debug)]
pub struct InferenceView {
    graph: GraphStore,
    base_len: usize,
    rounds: usize,
}

impl InferenceView {
    /// All facts: base plus inferred.
    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    /// Total number of facts; always at least [`Self::base_len`].
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Number of facts in the base graph the view was built from.
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Number of facts added by inference.
    pub fn inferred_len(&self) -> usize {
        self.graph.len() - self.base_len
    }

    /// Fixpoint rounds it took to build the view.
    pub fn rounds(&self) -> usize {
        self.rounds
    }
}

/// Compute the inference view of `base`. The base graph is left untouched.
pub fn close(base: &GraphStore) -> InferResult<InferenceView> {
    let start = Instant::now();
    let mut graph = base.clone();
    match saturate(&mut graph) {
        Saturation::Fixpoint { rounds, added } => {
            tracing::info!(
                base = base.len(),
                inferred = added,
                total = graph.len(),
                rounds,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "inference view built"
            );
            Ok(InferenceView {
                graph,
                base_len: base.len(),
                rounds,
            })
        }
        Saturation::RoundLimit { added } => Err(InferError::NoFixpoint {
            rounds: MAX_ROUNDS,
            added,
        }),
    }
}
