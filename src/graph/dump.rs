//! Turtle dump of a graph, used to inspect the inference view after a build.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use oxigraph::io::{RdfFormat, RdfSerializer};

use crate::error::GraphError;
use crate::vocab::{B3_NS, B3_PREFIX};

use super::GraphStore;
use super::sparql::GraphResult;

const PREFIXES: [(&str, &str); 4] = [
    (B3_PREFIX, B3_NS),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

/// Serialize `graph` as Turtle into `writer`.
pub fn write_turtle<W: Write>(graph: &GraphStore, writer: W) -> std::io::Result<W> {
    let mut serializer = RdfSerializer::from_format(RdfFormat::Turtle);
    for (prefix, iri) in PREFIXES {
        serializer = serializer
            .with_prefix(prefix, iri)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    }
    let mut out = serializer.for_writer(writer);
    for triple in graph.iter() {
        out.serialize_triple(triple)?;
    }
    out.finish()
}

/// Write `graph` as Turtle to `path`.
pub fn dump_turtle(graph: &GraphStore, path: &Path) -> GraphResult<()> {
    let to_err = |e: std::io::Error| GraphError::Dump {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let file = File::create(path).map_err(to_err)?;
    let mut writer = write_turtle(graph, BufWriter::new(file)).map_err(to_err)?;
    writer.flush().map_err(to_err)
}
