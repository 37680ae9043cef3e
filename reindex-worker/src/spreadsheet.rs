//! Reading rows out of uploaded workbooks, and writing rows into new ones.
use std::fmt;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Workbook, XlsxError};

use crate::error::SpreadsheetError;

/// A single non-empty cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Whether this cell holds a usable value: empty text, zero, NaN and `false` do not.
    pub fn is_truthy(&self) -> bool {
        match self {
            Cell::Text(text) => !text.is_empty(),
            Cell::Number(number) => *number != 0.0 && !number.is_nan(),
            Cell::Bool(value) => *value,
        }
    }

    /// Render this cell the way it is used as an identifier.
    /// Integral numbers are rendered without a fractional part, so `1234.0` becomes `"1234"`.
    pub fn to_key_string(&self) -> String {
        self.to_string()
    }

    fn from_data(data: &Data) -> Option<Cell> {
        match data {
            Data::Empty => None,
            Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => {
                Some(Cell::Text(text.clone()))
            }
            Data::Int(number) => Some(Cell::Number(*number as f64)),
            Data::Float(number) => Some(Cell::Number(*number)),
            Data::Bool(value) => Some(Cell::Bool(*value)),
            Data::DateTime(date_time) => Some(Cell::Number(date_time.as_f64())),
            Data::Error(error) => Some(Cell::Text(error.to_string())),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Text(text) => write!(f, "{text}"),
            Cell::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                write!(f, "{}", *number as i64)
            }
            Cell::Number(number) => write!(f, "{number}"),
            Cell::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(text.to_owned())
    }
}

/// An ordered mapping of column name to cell, one per spreadsheet row. Empty cells are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Cell)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `column` to `cell`, keeping the column's position if it is already present.
    pub fn insert(&mut self, column: &str, cell: Cell) {
        match self.cells.iter_mut().find(|(name, _)| name == column) {
            Some((_, existing)) => *existing = cell,
            None => self.cells.push((column.to_owned(), cell)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.cells.iter().map(|(name, cell)| (name.as_str(), cell))
    }
}

impl<S: Into<String>> FromIterator<(S, Cell)> for Row {
    fn from_iter<I: IntoIterator<Item = (S, Cell)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, cell) in iter {
            row.insert(&column.into(), cell);
        }
        row
    }
}

/// An uploaded spreadsheet: its display name and raw contents.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_owned(),
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, SpreadsheetError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|error| SpreadsheetError::IoError {
                file: name.clone(),
                error,
            })?;

        Ok(Self { name, bytes })
    }
}

/// Read the first worksheet of `file` into rows.
///
/// The first row holds the column names. Columns with a blank header are ignored, as are rows with
/// no values at all. Any format calamine detects (xlsx, xlsm, xlsb, xls, ods) is accepted.
pub fn read_rows(file: &InputFile) -> Result<Vec<Row>, SpreadsheetError> {
    let parse_error = |error| SpreadsheetError::ParseError {
        file: file.name.clone(),
        error,
    };

    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(file.bytes.as_slice())).map_err(parse_error)?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SpreadsheetError::EmptyWorkbookError(file.name.clone()))?
        .map_err(parse_error)?;

    let mut sheet_rows = range.rows();

    let headers: Vec<Option<String>> = match sheet_rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|data| Cell::from_data(data).map(|cell| cell.to_key_string()))
            .collect(),
        None => return Ok(Vec::new()),
    };

    let rows = sheet_rows
        .map(|cells| {
            headers
                .iter()
                .zip(cells)
                .filter_map(|(header, data)| {
                    let header = header.as_ref()?;
                    Cell::from_data(data).map(|cell| (header.as_str(), cell))
                })
                .collect::<Row>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    Ok(rows)
}

/// Serialize `rows` as a single-sheet xlsx workbook, with `headers` as its first row.
/// Each row must list its cells in `headers` order.
pub fn write_rows(
    sheet_name: &str,
    headers: &[&str],
    rows: &[Vec<Cell>],
) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = Workbook::new();

    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;

        for (col, header) in headers.iter().enumerate() {
            worksheet.write_string(0, column_number(col)?, *header)?;
        }

        for (index, cells) in rows.iter().enumerate() {
            let row = u32::try_from(index + 1).map_err(|_| XlsxError::RowColumnLimitError)?;

            for (col, cell) in cells.iter().enumerate() {
                let col = column_number(col)?;
                match cell {
                    Cell::Text(text) => worksheet.write_string(row, col, text.as_str())?,
                    Cell::Number(number) => worksheet.write_number(row, col, *number)?,
                    Cell::Bool(value) => worksheet.write_boolean(row, col, *value)?,
                };
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn column_number(col: usize) -> Result<u16, XlsxError> {
    u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)
}
