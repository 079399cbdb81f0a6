//! Survey table loader for spreadsheet and CSV exports.

use anyhow::{Context, Result, bail};
use calamine::{Data, Reader, open_workbook_auto};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Header names the loader expects, matched case-insensitively.
pub const ATTENDANT: &str = "attendant";
pub const CONTACT_TYPE: &str = "contact type";
pub const OPPORTUNITY: &str = "opportunity";
pub const CSAT: &str = "csat";

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// One customer evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub attendant: String,
    pub contact_type: String,
    pub opportunity: Option<String>,
    /// `None` when the cell was empty or not numeric.
    pub csat: Option<f64>,
}

impl Response {
    pub fn new(
        attendant: &str,
        contact_type: &str,
        opportunity: Option<&str>,
        csat: Option<f64>,
    ) -> Self {
        Response {
            attendant: attendant.to_string(),
            contact_type: contact_type.to_string(),
            opportunity: opportunity.map(str::to_string),
            csat,
        }
    }
}

/// The immutable input table, in source order.
#[derive(Debug, Clone, Default)]
pub struct ResponseTable {
    pub columns: Vec<String>,
    pub records: Vec<Response>,
}

impl ResponseTable {
    pub fn new(columns: Vec<String>, records: Vec<Response>) -> Self {
        ResponseTable { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records carrying a usable score.
    pub fn scored(&self) -> impl Iterator<Item = (&Response, f64)> {
        self.records.iter().filter_map(|r| r.csat.map(|s| (r, s)))
    }

    pub fn scored_len(&self) -> usize {
        self.scored().count()
    }
}

/// Positions of the required columns within a header row.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ColumnIndex {
    attendant: usize,
    contact_type: usize,
    opportunity: usize,
    csat: usize,
}

impl ColumnIndex {
    fn resolve(headers: &[String]) -> Result<Self> {
        let find = |name: &str| -> Result<usize> {
            match headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
            {
                Some(i) => Ok(i),
                None => bail!("missing required column `{}` (found {:?})", name, headers),
            }
        };

        Ok(ColumnIndex {
            attendant: find(ATTENDANT)?,
            contact_type: find(CONTACT_TYPE)?,
            opportunity: find(OPPORTUNITY)?,
            csat: find(CSAT)?,
        })
    }
}

/// A cell as read from either source, before coercion.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn text(&self) -> Option<String> {
        match self {
            Cell::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Cell::Text(_) | Cell::Empty => None,
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    fn score(&self) -> Option<f64> {
        let value = match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Empty => None,
        };
        value.filter(|v| v.is_finite())
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Loads the survey table from `path`.
///
/// Spreadsheets are read from their first worksheet; any other extension is
/// treated as CSV. The first row must hold the column headers.
///
/// # Errors
///
/// Fails if the file cannot be opened or parsed, or a required column is absent.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_table(path: &Path) -> Result<ResponseTable> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let raw = if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
        read_spreadsheet(path)?
    } else {
        read_csv(path)?
    };

    let table = build_table(raw)?;
    info!(
        records = table.len(),
        scored = table.scored_len(),
        "Survey table loaded"
    );
    Ok(table)
}

/// Header and data rows as read from the source.
#[derive(Debug, Clone, PartialEq)]
struct RawRows {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
    /// 1-based source row number of `rows[0]`.
    first_row: usize,
}

/// Sheet row number of the first data row, given where the used range starts.
/// Ranges skip leading empty rows, so the header is not always on row 1.
fn first_data_row(range_start: Option<(u32, u32)>) -> usize {
    range_start.map_or(0, |(row, _)| row as usize) + 2
}

fn read_spreadsheet(path: &Path) -> Result<RawRows> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("opening workbook {}", path.display()))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.with_context(|| format!("reading first sheet of {}", path.display()))?,
        None => bail!("workbook {} has no worksheets", path.display()),
    };

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header) => header.iter().map(|c| c.to_string()).collect(),
        None => bail!("worksheet in {} is empty", path.display()),
    };
    let cells = rows
        .map(|row| row.iter().map(Cell::from).collect())
        .collect();

    Ok(RawRows {
        headers,
        rows: cells,
        first_row: first_data_row(range.start()),
    })
}

fn read_csv(path: &Path) -> Result<RawRows> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers = rdr.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(RawRows {
        headers,
        rows,
        first_row: 2,
    })
}

fn build_table(raw: RawRows) -> Result<ResponseTable> {
    let RawRows {
        headers,
        rows,
        first_row,
    } = raw;
    let index = ColumnIndex::resolve(&headers)?;
    let mut records = Vec::with_capacity(rows.len());
    let mut excluded = 0usize;
    let mut unattributed = 0usize;

    for (offset, row) in rows.iter().enumerate() {
        if row.iter().all(|c| *c == Cell::Empty) {
            continue;
        }

        let line = first_row + offset;
        let cell = |i: usize| row.get(i).cloned().unwrap_or(Cell::Empty);

        // Every record needs an attendant and a contact type.
        let (Some(attendant), Some(contact_type)) = (
            cell(index.attendant).text(),
            cell(index.contact_type).text(),
        ) else {
            unattributed += 1;
            debug!(row = line, "Attendant or contact type is blank, skipping");
            continue;
        };
        let opportunity = cell(index.opportunity).text();
        let csat = cell(index.csat).score();

        if csat.is_none() {
            excluded += 1;
            debug!(row = line, raw = ?cell(index.csat), "Score is not numeric, excluding");
        }

        records.push(Response {
            attendant,
            contact_type,
            opportunity,
            csat,
        });
    }

    if excluded > 0 {
        warn!(excluded, "Records without a numeric csat are excluded from aggregates");
    }
    if unattributed > 0 {
        warn!(unattributed, "Rows without an attendant or contact type were skipped");
    }

    Ok(ResponseTable::new(
        headers.into_iter().map(|h| h.trim().to_string()).collect(),
        records,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn text_row(values: &[&str]) -> Vec<Cell> {
        values
            .iter()
            .map(|v| {
                if v.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(v.to_string())
                }
            })
            .collect()
    }

    fn raw(rows: Vec<Vec<Cell>>) -> RawRows {
        RawRows {
            headers: headers(&["attendant", "contact type", "opportunity", "csat"]),
            rows,
            first_row: 2,
        }
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let index =
            ColumnIndex::resolve(&headers(&["CSAT", " Attendant ", "Contact Type", "opportunity"]))
                .unwrap();
        assert_eq!(index.csat, 0);
        assert_eq!(index.attendant, 1);
        assert_eq!(index.contact_type, 2);
        assert_eq!(index.opportunity, 3);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let err = ColumnIndex::resolve(&headers(&["attendant", "contact type", "csat"]))
            .unwrap_err()
            .to_string();
        assert!(err.contains("opportunity"));
    }

    #[test]
    fn test_non_numeric_scores_become_none() {
        let table = build_table(raw(vec![
            text_row(&["Ana", "chat", "", "4"]),
            text_row(&["Ana", "chat", "billing", "n/a"]),
            text_row(&["Bia", "phone", "billing", ""]),
            text_row(&["Bia", "phone", "", "NaN"]),
        ]))
        .unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.scored_len(), 1);
        assert_eq!(table.records[0].csat, Some(4.0));
        assert_eq!(table.records[0].opportunity, None);
        assert_eq!(table.records[1].opportunity.as_deref(), Some("billing"));
        assert_eq!(table.records[3].csat, None);
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let table = build_table(raw(vec![
            text_row(&["", "", "", ""]),
            text_row(&["Ana", "chat", "", "5"]),
        ]))
        .unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_rows_without_attendant_or_contact_type_are_skipped() {
        let table = build_table(raw(vec![
            text_row(&["", "chat", "x", "1"]),
            text_row(&["A", "chat", "x", "5"]),
            text_row(&["B", "  ", "x", "1"]),
        ]))
        .unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0], Response::new("A", "chat", Some("x"), Some(5.0)));
        assert!(table.records.iter().all(|r| !r.attendant.is_empty()));
    }

    #[test]
    fn test_first_data_row_follows_range_start() {
        assert_eq!(first_data_row(None), 2);
        assert_eq!(first_data_row(Some((0, 0))), 2);
        // Header found on sheet row 4.
        assert_eq!(first_data_row(Some((3, 1))), 5);
    }

    #[test]
    fn test_spreadsheet_cells_coerce() {
        assert_eq!(Cell::from(&Data::Int(3)).score(), Some(3.0));
        assert_eq!(Cell::from(&Data::Float(4.5)).score(), Some(4.5));
        assert_eq!(Cell::from(&Data::String(" 2 ".into())).score(), Some(2.0));
        assert_eq!(Cell::from(&Data::Empty).score(), None);
        assert_eq!(Cell::from(&Data::Bool(true)).score(), None);
    }

    #[test]
    fn test_load_csv_file() {
        let path = temp_path("csat_report_loader_test.csv");
        fs::write(
            &path,
            "attendant,contact type,opportunity,csat\nAna,chat,billing,5\nBia,phone,,2\n",
        )
        .unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(table.columns, vec!["attendant", "contact type", "opportunity", "csat"]);
        assert_eq!(table.records[1], Response::new("Bia", "phone", None, Some(2.0)));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = load_table(&temp_path("csat_report_does_not_exist.csv"));
        assert!(result.is_err());
    }
}
