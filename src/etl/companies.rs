//! Company/sector pass: one company per row, its sector and its tickers.

use oxigraph::model::vocab::{rdf, rdfs};
use oxigraph::model::{Literal, NamedNode};
use serde::{Deserialize, Serialize};

use crate::graph::GraphStore;
use crate::normalize::{normalize_key, split_tickers};
use crate::vocab::{self, class, prop};

use super::cell::SheetRow;
use super::{LoadReport, RowSkip};

/// Zero-based column positions in the company reference sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyColumns {
    #[serde(default = "default_name")]
    pub name: usize,
    #[serde(default = "default_tickers")]
    pub tickers: usize,
    #[serde(default = "default_sector")]
    pub sector: usize,
}

fn default_name() -> usize {
    0
}
fn default_tickers() -> usize {
    1
}
fn default_sector() -> usize {
    5
}

impl Default for CompanyColumns {
    fn default() -> Self {
        Self {
            name: default_name(),
            tickers: default_tickers(),
            sector: default_sector(),
        }
    }
}

/// Run the company/sector pass over `rows` (the first row is the header).
pub fn load_companies(
    store: &mut GraphStore,
    source: &str,
    rows: &[SheetRow],
    columns: &CompanyColumns,
) -> LoadReport {
    let mut report = LoadReport::new(source);
    let before = store.len();

    let rdf_type = NamedNode::from(rdf::TYPE);
    let label = NamedNode::from(rdfs::LABEL);
    let company_class = vocab::node(class::COMPANY);
    let sector_class = vocab::node(class::SECTOR);
    let security_class = vocab::node(class::SECURITY);
    let ticker_prop = vocab::node(prop::TICKER);
    let has_security = vocab::node(prop::HAS_SECURITY);
    let represented_by = vocab::node(prop::REPRESENTED_BY);
    let in_sector = vocab::node(prop::IN_SECTOR);

    for row in rows.iter().skip(1) {
        let Some(name) = row.cell(columns.name).text() else {
            tracing::debug!(source, row = row.index, "skipping row without company name");
            report.skip(RowSkip::MissingName);
            continue;
        };
        let Some(tickers) = row.cell(columns.tickers).text() else {
            tracing::debug!(source, row = row.index, company = %name, "skipping row without tickers");
            report.skip(RowSkip::MissingTickers);
            continue;
        };

        let company = vocab::company(&normalize_key(&name));
        store.add_fact(
            &company,
            &label,
            Literal::new_language_tagged_literal_unchecked(name.as_str(), vocab::LABEL_LANG),
        );
        store.add_fact(&company, &rdf_type, company_class.clone());

        if let Some(sector_name) = row.cell(columns.sector).text() {
            let sector = vocab::sector(&normalize_key(&sector_name));
            store.add_fact(
                &sector,
                &label,
                Literal::new_language_tagged_literal_unchecked(
                    sector_name.as_str(),
                    vocab::LABEL_LANG,
                ),
            );
            store.add_fact(&sector, &rdf_type, sector_class.clone());
            store.add_fact(&company, &in_sector, sector);
        }

        for ticker in split_tickers(&tickers) {
            let security = vocab::security(&ticker);
            let code = vocab::security_code(&ticker);
            store.add_fact(&security, &rdf_type, security_class.clone());
            store.add_fact(&code, &ticker_prop, Literal::new_simple_literal(ticker.as_str()));
            store.add_fact(&company, &has_security, security.clone());
            store.add_fact(&security, &represented_by, code);
        }

        report.processed += 1;
    }

    report.triples_added = store.len() - before;
    tracing::info!(
        source,
        processed = report.processed,
        errors = report.errors(),
        triples = report.triples_added,
        "company pass complete"
    );
    report
}
