//! RDFS schema closure.
//!
//! Implements the RDFS entailment rules that matter for the loaded ontology:
//!
//! | rule | premises | conclusion |
//! |---|---|---|
//! | rdfs2 | `p rdfs:domain C`, `x p y` | `x rdf:type C` |
//! | rdfs3 | `p rdfs:range C`, `x p y` (y not a literal) | `y rdf:type C` |
//! | rdfs5 | `p subPropertyOf q`, `q subPropertyOf r` | `p subPropertyOf r` |
//! | rdfs7 | `p subPropertyOf q`, `x p y` | `x q y` |
//! | rdfs9 | `C subClassOf D`, `x rdf:type C` | `x rdf:type D` |
//! | rdfs11 | `C subClassOf D`, `D subClassOf E` | `C subClassOf E` |
//!
//! Every rule has exactly one data premise once the schema is fixed, so rounds
//! after the first only look at the previous round's new facts, unless that
//! round also changed the schema.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

use oxigraph::model::vocab::{rdf, rdfs};
use oxigraph::model::{NamedNode, NamedNodeRef, Term, Triple};

use crate::graph::GraphStore;

/// Fixpoint rounds allowed before the closure is considered runaway.
pub const MAX_ROUNDS: usize = 64;

/// Schema relationships extracted from a graph, with the subclass and
/// subproperty relations already transitively closed.
#[derive(Debug, Default)]
pub(crate) struct Schema {
    super_classes: HashMap<Term, Vec<Term>>,
    super_properties: HashMap<NamedNode, Vec<NamedNode>>,
    domains: HashMap<NamedNode, Vec<Term>>,
    ranges: HashMap<NamedNode, Vec<Term>>,
}

impl Schema {
    pub(crate) fn extract(graph: &GraphStore) -> Self {
        let mut sub_class: HashMap<Term, Vec<Term>> = HashMap::new();
        let mut sub_property: HashMap<NamedNode, Vec<NamedNode>> = HashMap::new();
        let mut domains: HashMap<NamedNode, Vec<Term>> = HashMap::new();
        let mut ranges: HashMap<NamedNode, Vec<Term>> = HashMap::new();

        for t in graph.iter() {
            let subject: Term = t.subject.into_owned().into();
            let object = t.object.into_owned();
            let predicate = t.predicate;
            if predicate == rdfs::SUB_CLASS_OF {
                sub_class.entry(subject).or_default().push(object);
            } else if predicate == rdfs::SUB_PROPERTY_OF {
                if let (Term::NamedNode(p), Term::NamedNode(q)) = (subject, object) {
                    sub_property.entry(p).or_default().push(q);
                }
            } else if predicate == rdfs::DOMAIN {
                if let Term::NamedNode(p) = subject {
                    domains.entry(p).or_default().push(object);
                }
            } else if predicate == rdfs::RANGE {
                if let Term::NamedNode(p) = subject {
                    ranges.entry(p).or_default().push(object);
                }
            }
        }

        Self {
            super_classes: transitive_closure(&sub_class),
            super_properties: transitive_closure(&sub_property),
            domains,
            ranges,
        }
    }

    /// All conclusions whose single data premise is `t`.
    fn derive_from(&self, t: &Triple, out: &mut Vec<Triple>) {
        let subject: Term = t.subject.clone().into();

        // rdfs7
        if let Some(supers) = self.super_properties.get(&t.predicate) {
            for q in supers {
                push_with_subject(out, &subject, q.as_ref(), t.object.clone());
            }
        }
        // rdfs2
        if let Some(classes) = self.domains.get(&t.predicate) {
            for c in classes {
                push_with_subject(out, &subject, rdf::TYPE, c.clone());
            }
        }
        // rdfs3
        if !matches!(t.object, Term::Literal(_)) {
            if let Some(classes) = self.ranges.get(&t.predicate) {
                for c in classes {
                    push_with_subject(out, &t.object, rdf::TYPE, c.clone());
                }
            }
        }
        // rdfs9
        if t.predicate.as_ref() == rdf::TYPE {
            if let Some(supers) = self.super_classes.get(&t.object) {
                for d in supers {
                    push_with_subject(out, &subject, rdf::TYPE, d.clone());
                }
            }
        }
    }

    /// rdfs5 and rdfs11 conclusions.
    fn closure_triples(&self, out: &mut Vec<Triple>) {
        for (c, supers) in &self.super_classes {
            for d in supers {
                push_with_subject(out, c, rdfs::SUB_CLASS_OF, d.clone());
            }
        }
        for (p, supers) in &self.super_properties {
            for q in supers {
                out.push(Triple::new(p.clone(), rdfs::SUB_PROPERTY_OF, q.clone()));
            }
        }
    }
}

/// Whether `t` changes the schema (and therefore invalidates the delta scan).
fn is_schema_triple(t: &Triple) -> bool {
    let p = t.predicate.as_ref();
    p == rdfs::SUB_CLASS_OF || p == rdfs::SUB_PROPERTY_OF || p == rdfs::DOMAIN || p == rdfs::RANGE
}

fn push_with_subject(out: &mut Vec<Triple>, subject: &Term, predicate: NamedNodeRef<'_>, object: Term) {
    match subject {
        Term::NamedNode(n) => out.push(Triple::new(n.clone(), predicate, object)),
        Term::BlankNode(b) => out.push(Triple::new(b.clone(), predicate, object)),
        _ => {}
    }
}

/// BFS from every node to everything reachable above it. A node only reaches
/// itself through an explicit cycle.
fn transitive_closure<T: Clone + Eq + Hash>(direct: &HashMap<T, Vec<T>>) -> HashMap<T, Vec<T>> {
    let mut closed = HashMap::with_capacity(direct.len());
    for start in direct.keys() {
        let mut reachable = Vec::new();
        let mut visited = HashSet::new();
        let mut queue: VecDeque<&T> = direct[start].iter().collect();
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            reachable.push(current.clone());
            if let Some(parents) = direct.get(current) {
                queue.extend(parents.iter());
            }
        }
        closed.insert(start.clone(), reachable);
    }
    closed
}

/// Outcome of [`saturate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Saturation {
    /// Fixpoint reached after this many rounds, adding this many facts.
    Fixpoint { rounds: usize, added: usize },
    /// Still deriving new facts after [`MAX_ROUNDS`].
    RoundLimit { added: usize },
}

/// Apply the rules to `graph` in place until nothing new is derived.
pub fn saturate(graph: &mut GraphStore) -> Saturation {
    let mut added = 0;
    let mut frontier: Vec<Triple> = graph.iter().map(|t| t.into_owned()).collect();
    let mut schema_changed = true;
    let mut schema = Schema::default();

    for round in 1..=MAX_ROUNDS {
        let mut derived = Vec::new();
        if schema_changed {
            schema = Schema::extract(graph);
            schema.closure_triples(&mut derived);
        }
        for t in &frontier {
            schema.derive_from(t, &mut derived);
        }

        let mut fresh = Vec::new();
        for t in derived {
            if !graph.contains(&t) {
                graph.insert(t.clone());
                fresh.push(t);
            }
        }
        if fresh.is_empty() {
            return Saturation::Fixpoint { rounds: round, added };
        }
        added += fresh.len();
        tracing::debug!(round, new = fresh.len(), "rdfs round");

        schema_changed = fresh.iter().any(is_schema_triple);
        frontier = if schema_changed {
            graph.iter().map(|t| t.into_owned()).collect()
        } else {
            fresh
        };
    }
    Saturation::RoundLimit { added }
}
