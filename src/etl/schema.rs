//! Ontology schema loading (Turtle).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::Triple;

use crate::error::SourceError;
use crate::graph::GraphStore;

use super::SourceResult;

/// Where the ontology schema comes from.
#[derive(Debug, Clone)]
pub enum SchemaSource {
    /// A Turtle file on disk; missing is a hard failure.
    File(PathBuf),
    /// Turtle text held in memory.
    Inline { name: String, turtle: String },
}

impl SchemaSource {
    pub fn name(&self) -> String {
        match self {
            SchemaSource::File(path) => path.display().to_string(),
            SchemaSource::Inline { name, .. } => name.clone(),
        }
    }
}

/// Parse the schema into `store`. Returns the number of new facts.
pub fn load_schema(store: &mut GraphStore, source: &SchemaSource) -> SourceResult<usize> {
    let before = store.len();
    match source {
        SchemaSource::File(path) => {
            if !path.is_file() {
                return Err(SourceError::SourceMissing { path: source.name() });
            }
            let file = File::open(path).map_err(|e| SourceError::Schema {
                origin: source.name(),
                message: e.to_string(),
            })?;
            parse_into(store, BufReader::new(file), &source.name())?;
        }
        SchemaSource::Inline { name, turtle } => {
            parse_into(store, turtle.as_bytes(), name)?;
        }
    }
    let added = store.len() - before;
    tracing::info!(schema = %source.name(), triples = added, "schema loaded");
    Ok(added)
}

fn parse_into<R: Read>(store: &mut GraphStore, reader: R, origin: &str) -> SourceResult<()> {
    for quad in RdfParser::from_format(RdfFormat::Turtle).for_reader(reader) {
        let quad = quad.map_err(|e| SourceError::Schema {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        store.insert(Triple::from(quad));
    }
    Ok(())
}
