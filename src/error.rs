//! Rich diagnostic error types for natural2sparql.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so the caller knows exactly what went
//! wrong. Row-level spreadsheet problems are deliberately absent here: they are
//! counted in [`crate::etl::LoadReport`] and never propagate.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum N2sError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Infer(#[from] InferError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Kb(#[from] KbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Service(#[from] ServiceError),
}

// ---------------------------------------------------------------------------
// Source errors (build-level, abort the whole load)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error("required source file not found: {path}")]
    #[diagnostic(
        code(n2s::source::missing),
        help(
            "The knowledge base is rebuilt from its source files on every start. \
             Check the paths under [sources] in the configuration file."
        )
    )]
    SourceMissing { path: String },

    #[error("failed to read workbook {path}: {message}")]
    #[diagnostic(
        code(n2s::source::workbook),
        help("The file exists but could not be opened as a spreadsheet (xlsx, xls, ods).")
    )]
    Workbook { path: String, message: String },

    #[error("workbook {path} has no worksheet")]
    #[diagnostic(
        code(n2s::source::empty_workbook),
        help("Data is read from the first worksheet; make sure the workbook has one.")
    )]
    EmptyWorkbook { path: String },

    #[error("failed to parse schema {origin}: {message}")]
    #[diagnostic(
        code(n2s::source::schema),
        help("The ontology schema must be valid Turtle.")
    )]
    Schema { origin: String, message: String },
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("SPARQL store error: {message}")]
    #[diagnostic(
        code(n2s::graph::sparql),
        help("The in-memory oxigraph store could not be created or loaded.")
    )]
    Sparql { message: String },

    #[error("failed to dump inference view to {path}: {message}")]
    #[diagnostic(
        code(n2s::graph::dump),
        help("The dump is diagnostic only. Check that the target directory is writable.")
    )]
    Dump { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Inference errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InferError {
    #[error("RDFS closure did not reach a fixpoint within {rounds} rounds ({added} facts derived)")]
    #[diagnostic(
        code(n2s::infer::no_fixpoint),
        help("The schema keeps producing new facts. Check it for generated IRIs or blank-node cycles.")
    )]
    NoFixpoint { rounds: usize, added: usize },
}

// ---------------------------------------------------------------------------
// Query errors (the distinguished "failure" outcome of the executor)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("SPARQL syntax error: {message}")]
    #[diagnostic(
        code(n2s::query::syntax),
        help("The query text could not be parsed. Check the template and the substituted values.")
    )]
    Syntax { message: String },

    #[error("SPARQL execution error: {message}")]
    #[diagnostic(
        code(n2s::query::execution),
        help("The query parsed but failed while being evaluated against the inference view.")
    )]
    Execution { message: String },

    #[error("query is not a SELECT query")]
    #[diagnostic(
        code(n2s::query::not_select),
        help("Only SELECT queries can project a target variable.")
    )]
    NotSelect,
}

// ---------------------------------------------------------------------------
// Knowledge base lifecycle errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum KbError {
    #[error("knowledge base already initialized (state: {state})")]
    #[diagnostic(
        code(n2s::kb::already_initialized),
        help("The knowledge base is built exactly once per process. Restart to rebuild it.")
    )]
    AlreadyInitialized { state: String },

}

// ---------------------------------------------------------------------------
// Template errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    #[error("SPARQL template not found: {id}")]
    #[diagnostic(
        code(n2s::template::not_found),
        help("Templates are stored as <id>.txt in the configured template directory.")
    )]
    NotFound { id: String },

    #[error("failed to read template {path}")]
    #[diagnostic(code(n2s::template::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Classifier errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ClassifierError {
    #[error("language processing service is not initialized: {reason}")]
    #[diagnostic(
        code(n2s::classifier::unavailable),
        help("Classifier assets could not be staged at startup. Check [classifier].assets_dir.")
    )]
    Unavailable { reason: String },

    #[error("failed to start classifier `{program}`")]
    #[diagnostic(
        code(n2s::classifier::spawn),
        help("Make sure the classifier program is installed and on PATH.")
    )]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("classifier did not answer within {timeout_secs}s and was killed")]
    #[diagnostic(code(n2s::classifier::timeout))]
    Timeout { timeout_secs: u64 },

    #[error("classifier exited with status {code}: {stderr}")]
    #[diagnostic(code(n2s::classifier::exit_status))]
    ExitStatus { code: i32, stderr: String },

    #[error("classifier exited successfully but wrote nothing to stdout")]
    #[diagnostic(code(n2s::classifier::empty_output))]
    EmptyOutput,

    #[error("classifier output is not a valid outcome: {message}")]
    #[diagnostic(
        code(n2s::classifier::decode),
        help(
            "Expected {{\"template_nome\": ..., \"mapeamentos\": {{...}}}} \
             or {{\"erro\": ...}} on stdout."
        )
    )]
    Decode { message: String },

    #[error("I/O error while talking to the classifier")]
    #[diagnostic(code(n2s::classifier::io))]
    Io {
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(n2s::config::read),
        help("Ensure the config file exists or omit --config to use the defaults.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(code(n2s::config::parse), help("Check the TOML syntax in the config file."))]
    Parse { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Orchestrator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ServiceError {
    #[error("{message}")]
    #[diagnostic(code(n2s::service::validation))]
    Validation { message: String },

    /// The classifier ran and reported a semantic failure.
    #[error("{message}")]
    #[diagnostic(code(n2s::service::classification_failed))]
    Reported { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error("query execution failed: {0}")]
    #[diagnostic(code(n2s::service::query))]
    Query(#[from] QueryError),
}

/// Convenience alias for functions returning natural2sparql results.
pub type N2sResult<T> = std::result::Result<T, N2sError>;
