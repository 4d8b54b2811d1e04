//! Knowledge base: the ETL + inference subsystem as one lifecycle unit.
//!
//! ```text
//! Uninitialized -> Loading -> Ready   (terminal)
//!                          -> Failed  (terminal)
//! ```
//!
//! The build runs under the exclusive side of a [`RwLock`], taken before any
//! source is read and released only once the query store is complete or the
//! failure is recorded. Queries take the shared side, so a reader never sees
//! a half-built graph.

use std::fmt;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Instant;

use serde::Serialize;

use crate::error::{KbError, N2sResult};
use crate::etl::{self, LoadReport, Sources};
use crate::graph::dump::dump_turtle;
use crate::graph::sparql::{QueryResult, SparqlStore};
use crate::infer;

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KbState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for KbState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KbState::Uninitialized => "uninitialized",
            KbState::Loading => "loading",
            KbState::Ready => "ready",
            KbState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Summary of a successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildStats {
    /// Facts loaded from the schema file.
    pub schema_triples: usize,
    /// Facts in the base graph (schema included).
    pub base_triples: usize,
    /// Facts added by inference.
    pub inferred_triples: usize,
    /// Rounds the closure took to reach its fixpoint.
    pub inference_rounds: usize,
    /// One report per ETL pass, in load order.
    pub reports: Vec<LoadReport>,
    pub elapsed_ms: u64,
}

impl BuildStats {
    pub fn total_triples(&self) -> usize {
        self.base_triples + self.inferred_triples
    }
}

impl fmt::Display for BuildStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "knowledge base")?;
        writeln!(f, "  schema:    {} triples", self.schema_triples)?;
        writeln!(f, "  base:      {} triples", self.base_triples)?;
        writeln!(
            f,
            "  inferred:  {} triples ({} rounds)",
            self.inferred_triples, self.inference_rounds
        )?;
        writeln!(f, "  total:     {} triples", self.total_triples())?;
        writeln!(f, "  built in:  {} ms", self.elapsed_ms)?;
        for report in &self.reports {
            writeln!(f, "  {report}")?;
        }
        Ok(())
    }
}

struct Loaded {
    sparql: SparqlStore,
    stats: BuildStats,
}

enum Inner {
    Uninitialized,
    Loading,
    Ready(Box<Loaded>),
    Failed { reason: String },
}

impl Inner {
    fn state(&self) -> KbState {
        match self {
            Inner::Uninitialized => KbState::Uninitialized,
            Inner::Loading => KbState::Loading,
            Inner::Ready(_) => KbState::Ready,
            Inner::Failed { .. } => KbState::Failed,
        }
    }
}

/// Owned handle to the knowledge graph and its query store.
///
/// Share it with `Arc<KnowledgeBase>`; there is no global instance.
pub struct KnowledgeBase {
    inner: RwLock<Inner>,
    dump_path: Option<PathBuf>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("state", &self.state())
            .field("dump_path", &self.dump_path)
            .finish()
    }
}

impl KnowledgeBase {
    /// An uninitialized knowledge base that writes no dump.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::Uninitialized),
            dump_path: None,
        }
    }

    /// Write the inference view as Turtle to `path` after a successful build.
    pub fn with_dump_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dump_path = Some(path.into());
        self
    }

    /// Build the knowledge base from `sources`. Only valid once.
    ///
    /// Any hard failure (missing source, schema parse error, runaway closure,
    /// store load error) moves the knowledge base to [`KbState::Failed`] for
    /// good and is returned to the caller.
    pub fn initialize(&self, sources: &Sources) -> N2sResult<BuildStats> {
        let mut inner = self.inner.write().expect("knowledge base lock poisoned");
        if !matches!(*inner, Inner::Uninitialized) {
            return Err(KbError::AlreadyInitialized {
                state: inner.state().to_string(),
            }
            .into());
        }
        *inner = Inner::Loading;
        tracing::info!("building knowledge base");

        match self.build(sources) {
            Ok(loaded) => {
                let stats = loaded.stats.clone();
                tracing::info!(
                    base = stats.base_triples,
                    inferred = stats.inferred_triples,
                    elapsed_ms = stats.elapsed_ms,
                    "knowledge base ready"
                );
                *inner = Inner::Ready(Box::new(loaded));
                Ok(stats)
            }
            Err(err) => {
                tracing::error!(error = %err, "knowledge base build failed");
                *inner = Inner::Failed {
                    reason: err.to_string(),
                };
                Err(err)
            }
        }
    }

    fn build(&self, sources: &Sources) -> N2sResult<Loaded> {
        let start = Instant::now();
        let base = etl::load_base_graph(sources)?;
        let view = infer::close(&base.graph)?;
        let sparql = SparqlStore::load(view.graph())?;
        tracing::debug!(quads = sparql.quad_count()?, "query store loaded");

        if let Some(path) = &self.dump_path {
            match dump_turtle(view.graph(), path) {
                Ok(()) => tracing::info!(path = %path.display(), "inference view dumped"),
                Err(err) => tracing::warn!(error = %err, "could not dump inference view"),
            }
        }

        Ok(Loaded {
            sparql,
            stats: BuildStats {
                schema_triples: base.schema_triples,
                base_triples: view.base_len(),
                inferred_triples: view.inferred_len(),
                inference_rounds: view.rounds(),
                reports: base.reports,
                elapsed_ms: start.elapsed().as_millis() as u64,
            },
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> KbState {
        self.inner
            .read()
            .expect("knowledge base lock poisoned")
            .state()
    }

    /// Build statistics, once ready.
    pub fn stats(&self) -> Option<BuildStats> {
        match &*self.inner.read().expect("knowledge base lock poisoned") {
            Inner::Ready(loaded) => Some(loaded.stats.clone()),
            _ => None,
        }
    }

    /// Why the build failed, if it did.
    pub fn failure(&self) -> Option<String> {
        match &*self.inner.read().expect("knowledge base lock poisoned") {
            Inner::Failed { reason } => Some(reason.clone()),
            _ => None,
        }
    }

    /// Run a SELECT query and project `variable`.
    ///
    /// Returns an empty list when the knowledge base is not ready. That is a
    /// "no data" answer, distinct from the `Err` a bad query produces.
    pub fn execute_query(&self, sparql: &str, variable: &str) -> QueryResult<Vec<String>> {
        let inner = self.inner.read().expect("knowledge base lock poisoned");
        let Inner::Ready(loaded) = &*inner else {
            tracing::warn!(state = %inner.state(), "query attempted before knowledge base is ready");
            return Ok(Vec::new());
        };

        let start = Instant::now();
        match loaded.sparql.select_variable(sparql, variable) {
            Ok(values) => {
                tracing::debug!(
                    variable,
                    results = values.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "query executed"
                );
                Ok(values)
            }
            Err(err) => {
                tracing::warn!(variable, error = %err, "query failed");
                Err(err)
            }
        }
    }
}
