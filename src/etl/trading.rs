//! Trading-session pass: one traded-on-date fact per (ticker, date) row.

use oxigraph::model::vocab::{rdf, xsd};
use oxigraph::model::{Literal, NamedNode};
use serde::{Deserialize, Serialize};

use crate::graph::GraphStore;
use crate::normalize::is_ticker;
use crate::vocab::{self, class, prop};

use super::cell::SheetRow;
use super::{LoadReport, RowSkip};

/// Zero-based column positions in a trading-session sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingColumns {
    #[serde(default = "default_date")]
    pub date: usize,
    #[serde(default = "default_ticker")]
    pub ticker: usize,
    #[serde(default = "default_open")]
    pub open: usize,
    #[serde(default = "default_close")]
    pub close: usize,
}

fn default_date() -> usize {
    2
}
fn default_ticker() -> usize {
    4
}
fn default_open() -> usize {
    8
}
fn default_close() -> usize {
    12
}

impl Default for TradingColumns {
    fn default() -> Self {
        Self {
            date: default_date(),
            ticker: default_ticker(),
            open: default_open(),
            close: default_close(),
        }
    }
}

/// Run the trading-session pass over `rows` (the first row is the header).
///
/// Must run after the company pass: rows for tickers the company pass never
/// declared are skipped so no orphaned session facts are created.
pub fn load_trading(
    store: &mut GraphStore,
    source: &str,
    rows: &[SheetRow],
    columns: &TradingColumns,
) -> LoadReport {
    let mut report = LoadReport::new(source);
    let before = store.len();

    let rdf_type = NamedNode::from(rdf::TYPE);
    let session_class = vocab::node(class::SESSION);
    let traded_class = vocab::node(class::TRADED_FACT);
    let traded = vocab::node(prop::TRADED);
    let traded_during = vocab::node(prop::TRADED_DURING);
    let on_date = vocab::node(prop::ON_DATE);
    let opening = vocab::node(prop::OPENING_PRICE);
    let closing = vocab::node(prop::CLOSING_PRICE);

    for row in rows.iter().skip(1) {
        let ticker = match row.cell(columns.ticker).text() {
            Some(t) if is_ticker(&t) => t,
            _ => {
                report.skip(RowSkip::InvalidTicker);
                continue;
            }
        };
        let Some(date) = row.cell(columns.date).session_date() else {
            tracing::debug!(source, row = row.index, %ticker, "skipping row with unreadable session date");
            report.skip(RowSkip::InvalidDate);
            continue;
        };

        let security = vocab::security(&ticker);
        if !store.contains_resource(&security) {
            tracing::warn!(source, row = row.index, %ticker, "skipping trading row for undeclared ticker");
            report.skip(RowSkip::UndeclaredTicker);
            continue;
        }

        let fact = vocab::traded_fact(&ticker, date);
        let session = vocab::session(date);

        store.add_fact(&security, &traded, fact.clone());
        store.add_fact(&fact, &rdf_type, traded_class.clone());
        store.add_fact(&session, &rdf_type, session_class.clone());
        store.add_fact(&fact, &traded_during, session.clone());
        store.add_fact(
            &session,
            &on_date,
            Literal::new_typed_literal(date.format("%Y-%m-%d").to_string(), xsd::DATE),
        );
        store.add_numeric_fact_if_valid(&fact, &opening, row.cell(columns.open).price());
        store.add_numeric_fact_if_valid(&fact, &closing, row.cell(columns.close).price());

        report.processed += 1;
    }

    report.triples_added = store.len() - before;
    tracing::info!(
        source,
        processed = report.processed,
        errors = report.errors(),
        triples = report.triples_added,
        "trading pass complete"
    );
    report
}
