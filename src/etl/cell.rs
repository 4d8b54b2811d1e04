//! Spreadsheet cells and rows, independent of the workbook format.
//!
//! Cells keep their native kind (number, date, text) so the loaders can apply
//! the dual parsing policies: native values are taken as-is, text is parsed.

use chrono::NaiveDate;

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    /// Formatted text of the cell, trimmed; `None` when empty or blank.
    pub fn text(&self) -> Option<String> {
        let text = match self {
            Cell::Empty => return None,
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        };
        if text.is_empty() { None } else { Some(text) }
    }

    /// Session date under the dual policy: a native date is used directly, a
    /// plain number or a text cell is read as `yyyyMMdd`.
    pub fn session_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Number(n) if n.fract() == 0.0 && *n > 0.0 => {
                parse_compact_date(&format!("{}", *n as i64))
            }
            Cell::Text(s) => parse_compact_date(s.trim()),
            _ => None,
        }
    }

    /// Price under the tolerant policy: native numbers directly, text with a
    /// decimal comma replaced by a point. Anything else is "not a number".
    pub fn price(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => s
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Cell::Date(d)
    }
}

/// Parse exactly eight ASCII digits as `yyyyMMdd`.
pub fn parse_compact_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = s[0..4].parse().ok()?;
    let month = s[4..6].parse().ok()?;
    let day = s[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// One spreadsheet row with its zero-based position in the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub index: usize,
    pub cells: Vec<Cell>,
}

impl SheetRow {
    pub fn new(index: usize, cells: Vec<Cell>) -> Self {
        Self { index, cells }
    }

    /// Cell at `column`; columns past the end of the row read as empty.
    pub fn cell(&self, column: usize) -> &Cell {
        self.cells.get(column).unwrap_or(&EMPTY)
    }
}
