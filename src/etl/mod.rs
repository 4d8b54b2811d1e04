//! ETL: turning reference spreadsheets and the ontology schema into facts.
//!
//! The load runs in a fixed order: schema, company/sector pass, then one
//! trading-session pass per trading source. Row-level problems are absorbed
//! into a [`LoadReport`]; only a missing or unreadable source aborts the load.

pub mod cell;
pub mod companies;
pub mod schema;
pub mod trading;
pub mod workbook;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::SourceError;
use crate::graph::GraphStore;

pub use cell::{Cell, SheetRow};
pub use companies::CompanyColumns;
pub use schema::SchemaSource;
pub use trading::TradingColumns;
pub use workbook::{MemorySource, TableSource, WorkbookSource};

/// Result type for source loading.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Why a row was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSkip {
    /// Company row with a blank name cell.
    MissingName,
    /// Company row with a blank ticker-list cell.
    MissingTickers,
    /// Trading row whose ticker cell is absent or not ticker-shaped.
    InvalidTicker,
    /// Trading row whose session date could not be read.
    InvalidDate,
    /// Trading row for a ticker the company pass never declared.
    UndeclaredTicker,
}

impl fmt::Display for RowSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RowSkip::MissingName => "missing company name",
            RowSkip::MissingTickers => "missing ticker list",
            RowSkip::InvalidTicker => "invalid ticker",
            RowSkip::InvalidDate => "invalid session date",
            RowSkip::UndeclaredTicker => "undeclared ticker",
        };
        f.write_str(s)
    }
}

/// Per-pass counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Source the pass read from.
    pub source: String,
    /// Data rows that produced facts.
    pub processed: usize,
    /// Skipped data rows, by reason.
    pub skipped: BTreeMap<RowSkip, usize>,
    /// New facts added by this pass.
    pub triples_added: usize,
}

impl LoadReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub(crate) fn skip(&mut self, reason: RowSkip) {
        *self.skipped.entry(reason).or_default() += 1;
    }

    /// Total number of skipped rows.
    pub fn errors(&self) -> usize {
        self.skipped.values().sum()
    }

    /// Number of rows skipped for `reason`.
    pub fn skipped_for(&self, reason: RowSkip) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} processed, {} errors, {} triples",
            self.source,
            self.processed,
            self.errors(),
            self.triples_added
        )?;
        for (reason, count) in &self.skipped {
            write!(f, "\n  {reason}: {count}")?;
        }
        Ok(())
    }
}

/// Everything the base graph is built from.
pub struct Sources {
    pub schema: SchemaSource,
    pub companies: Box<dyn TableSource>,
    pub trading: Vec<Box<dyn TableSource>>,
    pub company_columns: CompanyColumns,
    pub trading_columns: TradingColumns,
}

/// Outcome of a complete load.
#[derive(Debug)]
pub struct BaseLoad {
    pub graph: GraphStore,
    pub schema_triples: usize,
    pub reports: Vec<LoadReport>,
}

/// Build the base graph: schema, companies, then every trading source.
pub fn load_base_graph(sources: &Sources) -> SourceResult<BaseLoad> {
    let mut graph = GraphStore::new();
    let schema_triples = schema::load_schema(&mut graph, &sources.schema)?;

    let mut reports = Vec::with_capacity(1 + sources.trading.len());
    let company_rows = sources.companies.read_rows()?;
    reports.push(companies::load_companies(
        &mut graph,
        &sources.companies.name(),
        &company_rows,
        &sources.company_columns,
    ));

    for source in &sources.trading {
        let rows = source.read_rows()?;
        reports.push(trading::load_trading(
            &mut graph,
            &source.name(),
            &rows,
            &sources.trading_columns,
        ));
    }

    tracing::info!(triples = graph.len(), "base graph loaded");
    Ok(BaseLoad {
        graph,
        schema_triples,
        reports,
    })
}
