//! SPARQL evaluation over the inference view, backed by oxigraph.
//!
//! The inference view is loaded once into an in-memory oxigraph [`Store`];
//! queries are parsed first so that syntax errors and evaluation errors stay
//! distinguishable, then evaluated and projected onto one variable.

use oxigraph::model::{GraphName, Term};
use oxigraph::sparql::{Query, QueryResults};
use oxigraph::store::Store;

use crate::error::{GraphError, QueryError};

use super::GraphStore;

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Result type for query evaluation. `Err` is the distinguished "failure"
/// outcome; `Ok(vec![])` means the query matched nothing.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// In-memory SPARQL-capable RDF store holding a read-only snapshot of a graph.
pub struct SparqlStore {
    store: Store,
}

impl SparqlStore {
    /// Load every fact of `graph` into a fresh in-memory store.
    pub fn load(graph: &GraphStore) -> GraphResult<Self> {
        let store = Store::new().map_err(|e| GraphError::Sparql {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        for triple in graph.iter() {
            let quad = triple.into_owned().in_graph(GraphName::DefaultGraph);
            store.insert(&quad).map_err(|e| GraphError::Sparql {
                message: format!("insert failed: {e}"),
            })?;
        }
        Ok(Self { store })
    }

    /// Evaluate a SELECT query and project `variable` from every solution.
    ///
    /// Literals are projected to their lexical form, IRIs to their string.
    /// Solutions without a binding for `variable` are skipped. Solution order
    /// is the engine's; nothing is sorted.
    pub fn select_variable(&self, sparql: &str, variable: &str) -> QueryResult<Vec<String>> {
        let query = Query::parse(sparql, None).map_err(|e| QueryError::Syntax {
            message: e.to_string(),
        })?;

        let results = self.store.query(query).map_err(|e| QueryError::Execution {
            message: e.to_string(),
        })?;

        let QueryResults::Solutions(solutions) = results else {
            return Err(QueryError::NotSelect);
        };

        let mut values = Vec::new();
        for solution in solutions {
            let solution = solution.map_err(|e| QueryError::Execution {
                message: format!("solution error: {e}"),
            })?;
            if let Some(term) = solution.get(variable) {
                values.push(lexical(term));
            }
        }
        Ok(values)
    }

    /// Number of facts loaded.
    pub fn quad_count(&self) -> GraphResult<usize> {
        self.store.len().map_err(|e| GraphError::Sparql {
            message: format!("failed to count quads: {e}"),
        })
    }
}

impl std::fmt::Debug for SparqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparqlStore").finish()
    }
}

fn lexical(term: &Term) -> String {
    match term {
        Term::Literal(literal) => literal.value().to_string(),
        Term::NamedNode(node) => node.as_str().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab;
    use oxigraph::model::Literal;

    fn sample() -> SparqlStore {
        let mut graph = GraphStore::new();
        let code = vocab::security_code("PETR4");
        graph.add_fact(
            &code,
            &vocab::node(vocab::prop::TICKER),
            Literal::new_simple_literal("PETR4"),
        );
        graph.add_fact(
            &vocab::security("PETR4"),
            &vocab::node(vocab::prop::REPRESENTED_BY),
            code,
        );
        SparqlStore::load(&graph).unwrap()
    }

    #[test]
    fn projects_literal_lexical_form() {
        let store = sample();
        let values = store
            .select_variable(
                &format!("SELECT ?valor WHERE {{ ?c <{}ticker> ?valor }}", vocab::B3_NS),
                "valor",
            )
            .unwrap();
        assert_eq!(values, vec!["PETR4"]);
    }

    #[test]
    fn projects_iri_string() {
        let store = sample();
        let values = store
            .select_variable(
                &format!(
                    "SELECT ?s WHERE {{ ?s <{}representadoPor> ?c }}",
                    vocab::B3_NS
                ),
                "s",
            )
            .unwrap();
        assert_eq!(values, vec![vocab::security("PETR4").as_str().to_string()]);
    }

    #[test]
    fn unbound_variable_rows_are_skipped() {
        let store = sample();
        let values = store
            .select_variable("SELECT ?s ?nothing WHERE { ?s ?p ?o }", "nothing")
            .unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn syntax_error_is_distinguished_from_empty() {
        let store = sample();
        let err = store.select_variable("SELEC ?x WHERE {", "x").unwrap_err();
        assert!(matches!(err, QueryError::Syntax { .. }));

        let empty = store
            .select_variable("SELECT ?x WHERE { ?x <http://example.org/none> ?y }", "x")
            .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn ask_query_is_rejected() {
        let store = sample();
        let err = store.select_variable("ASK { ?s ?p ?o }", "s").unwrap_err();
        assert!(matches!(err, QueryError::NotSelect));
    }

    #[test]
    fn len_counts_loaded_facts() {
        assert_eq!(sample().quad_count().unwrap(), 2);
    }
}
