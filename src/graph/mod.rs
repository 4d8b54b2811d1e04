//! Graph Store: the deduplicated, append-only set of base facts.
//!
//! - **Base layer** ([`GraphStore`]): an `oxigraph::model::Graph` plus a
//!   resource index used to validate trading rows against declared tickers
//! - **Query layer** ([`sparql::SparqlStore`]): an in-memory oxigraph store
//!   loaded with the inference view for SPARQL evaluation
//! - **Dump** ([`dump`]): best-effort Turtle serialization for diagnostics

pub mod dump;
pub mod sparql;

use std::collections::HashSet;

use oxigraph::model::{Graph, Literal, NamedNode, Term, Triple, TripleRef};

/// Deduplicated set of (subject, predicate, object) facts.
///
/// Insertion is idempotent: adding a triple that is already present leaves the
/// store unchanged. There is no removal.
#[derive(Debug, Default, Clone)]
pub struct GraphStore {
    graph: Graph,
    /// Every named node seen in subject or object position.
    resources: HashSet<NamedNode>,
}

impl GraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fact about a named subject. Returns `true` if the triple was new.
    pub fn add_fact(
        &mut self,
        subject: &NamedNode,
        predicate: &NamedNode,
        object: impl Into<Term>,
    ) -> bool {
        self.insert(Triple::new(subject.clone(), predicate.clone(), object))
    }

    /// Insert a numeric fact only if `value` is a defined number.
    ///
    /// `None` and NaN are both treated as "not a number" and skipped silently;
    /// a missing price is never coerced to zero. The value is stored as a plain
    /// literal in [`decimal_lexical`] form: oxigraph canonicalizes `xsd:decimal`
    /// lexical forms (`35.80` would come back as `35.8`).
    pub fn add_numeric_fact_if_valid(
        &mut self,
        subject: &NamedNode,
        predicate: &NamedNode,
        value: Option<f64>,
    ) -> bool {
        match value {
            Some(v) if v.is_finite() => {
                self.add_fact(subject, predicate, Literal::new_simple_literal(decimal_lexical(v)))
            }
            _ => false,
        }
    }

    /// Insert an arbitrary triple (schema statements may have blank nodes).
    pub fn insert(&mut self, triple: Triple) -> bool {
        if self.graph.contains(&triple) {
            return false;
        }
        let subject: Term = triple.subject.clone().into();
        if let Term::NamedNode(n) = subject {
            self.resources.insert(n);
        }
        if let Term::NamedNode(n) = &triple.object {
            self.resources.insert(n.clone());
        }
        self.graph.insert(&triple)
    }

    /// Whether the resource appears in any fact, as subject or object.
    pub fn contains_resource(&self, resource: &NamedNode) -> bool {
        self.resources.contains(resource)
    }

    /// Whether this exact triple is present.
    pub fn contains(&self, triple: &Triple) -> bool {
        self.graph.contains(triple)
    }

    /// Number of facts.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Iterate over all facts.
    pub fn iter(&self) -> impl Iterator<Item = TripleRef<'_>> {
        self.graph.iter()
    }
}

/// Lexical form of a price: two fractional digits when that is exact
/// (`35.8` -> `"35.80"`), otherwise the shortest round-trip form.
pub fn decimal_lexical(value: f64) -> String {
    let fixed = format!("{value:.2}");
    if fixed.parse::<f64>().ok() == Some(value) {
        fixed
    } else {
        let shortest = value.to_string();
        if shortest.contains('.') { shortest } else { format!("{shortest}.0") }
    }
}
