//! Table sources: spreadsheet files read through `calamine`, and in-memory rows.

use std::path::PathBuf;

use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::NaiveDate;

use crate::error::SourceError;

use super::SourceResult;
use super::cell::{Cell, SheetRow};

/// A source of spreadsheet rows (header row included).
pub trait TableSource: Send + Sync {
    /// Human-readable origin, used in logs and load reports.
    fn name(&self) -> String;

    /// Read every row of the first sheet.
    fn read_rows(&self) -> SourceResult<Vec<SheetRow>>;
}

/// First worksheet of an xlsx/xls/ods file.
#[derive(Debug, Clone)]
pub struct WorkbookSource {
    path: PathBuf,
}

impl WorkbookSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TableSource for WorkbookSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn read_rows(&self) -> SourceResult<Vec<SheetRow>> {
        if !self.path.is_file() {
            return Err(SourceError::SourceMissing { path: self.name() });
        }
        let mut workbook = open_workbook_auto(&self.path).map_err(|e| SourceError::Workbook {
            path: self.name(),
            message: e.to_string(),
        })?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| SourceError::EmptyWorkbook { path: self.name() })?
            .map_err(|e| SourceError::Workbook {
                path: self.name(),
                message: e.to_string(),
            })?;
        Ok(sheet_rows(&range))
    }
}

/// Rows of `range` indexed by absolute sheet position.
///
/// calamine trims the range to its used cells, so a sheet whose leading
/// columns are empty yields rows starting past column A. Those columns are
/// restored as empty cells so configured column indexes stay absolute.
fn sheet_rows(range: &Range<Data>) -> Vec<SheetRow> {
    let (first_row, first_col) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));
    range
        .rows()
        .enumerate()
        .map(|(i, row)| {
            let mut cells = vec![Cell::Empty; first_col];
            cells.extend(row.iter().map(to_cell));
            SheetRow::new(first_row + i, cells)
        })
        .collect()
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::DateTimeIso(s) => s
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => Cell::Date(datetime.date()),
            None => Cell::Number(dt.as_f64()),
        },
    }
}

/// Rows held in memory; useful for tests and for callers that already parsed
/// their data.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    rows: Vec<SheetRow>,
}

impl MemorySource {
    /// Build a source from raw cell rows; the first row is the header.
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(i, cells)| SheetRow::new(i, cells))
                .collect(),
        }
    }
}

impl TableSource for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn read_rows(&self) -> SourceResult<Vec<SheetRow>> {
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_workbook_is_source_missing() {
        let source = WorkbookSource::new("/definitely/not/here.xlsx");
        let err = source.read_rows().unwrap_err();
        assert!(matches!(err, SourceError::SourceMissing { .. }));
    }

    #[test]
    fn garbage_file_is_workbook_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();
        let err = WorkbookSource::new(&path).read_rows().unwrap_err();
        assert!(matches!(err, SourceError::Workbook { .. }));
    }

    #[test]
    fn calamine_values_map_to_cells() {
        assert_eq!(to_cell(&Data::Empty), Cell::Empty);
        assert_eq!(to_cell(&Data::Float(35.8)), Cell::Number(35.8));
        assert_eq!(to_cell(&Data::Int(20240102)), Cell::Number(20240102.0));
        assert_eq!(to_cell(&Data::String("PETR4".into())), Cell::from("PETR4"));
        assert_eq!(
            to_cell(&Data::DateTimeIso("2024-01-02T00:00:00".into())),
            Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
        );
    }

    #[test]
    fn leading_empty_columns_keep_absolute_indexes() {
        // Used range C1:M2, as calamine reports a sheet with A and B empty.
        let mut range = Range::new((0, 2), (1, 12));
        range.set_value((0, 2), Data::String("Data".into()));
        range.set_value((0, 4), Data::String("Ticker".into()));
        range.set_value((1, 2), Data::String("20240102".into()));
        range.set_value((1, 4), Data::String("PETR4".into()));
        range.set_value((1, 8), Data::Float(35.1));
        range.set_value((1, 12), Data::Float(35.8));

        let rows = sheet_rows(&range);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].index, 1);
        assert_eq!(rows[1].cell(0), &Cell::Empty);
        assert_eq!(rows[1].cell(2), &Cell::from("20240102"));
        assert_eq!(rows[1].cell(4), &Cell::from("PETR4"));
        assert_eq!(rows[1].cell(12), &Cell::Number(35.8));
    }

    #[test]
    fn offset_sheet_loads_through_trading_pass() {
        use crate::etl::companies::{CompanyColumns, load_companies};
        use crate::etl::trading::{TradingColumns, load_trading};
        use crate::graph::GraphStore;
        use crate::vocab;
        use oxigraph::model::{Literal, Triple};

        let mut store = GraphStore::new();
        let companies = vec![
            SheetRow::new(0, vec![Cell::from("Empresa"), Cell::from("Tickers")]),
            SheetRow::new(1, vec![Cell::from("Petrobras"), Cell::from("PETR4")]),
        ];
        load_companies(&mut store, "companies", &companies, &CompanyColumns::default());

        let mut range = Range::new((1, 2), (2, 12));
        range.set_value((1, 2), Data::String("Data".into()));
        range.set_value((2, 2), Data::String("20240102".into()));
        range.set_value((2, 4), Data::String("PETR4".into()));
        range.set_value((2, 8), Data::Float(35.1));
        range.set_value((2, 12), Data::Float(35.8));

        let report = load_trading(
            &mut store,
            "pregao",
            &sheet_rows(&range),
            &TradingColumns::default(),
        );
        assert_eq!(report.processed, 1);
        let fact = vocab::traded_fact("PETR4", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!(store.contains(&Triple::new(
            fact,
            vocab::node(vocab::prop::CLOSING_PRICE),
            Literal::new_simple_literal("35.80"),
        )));
    }

    #[test]
    fn memory_source_numbers_rows() {
        let source = MemorySource::new("mem", vec![vec![Cell::from("h")], vec![Cell::from("a")]]);
        let rows = source.read_rows().unwrap();
        assert_eq!(rows[1].index, 1);
        assert_eq!(source.name(), "mem");
    }
}
