//! Spreadsheet access layer
//!
//! The engine only talks to spreadsheets through the traits below. Two
//! backends ship with the crate: [`MemoryClient`] for in-process data and
//! [`LocalWorkbookClient`] for `.xlsx`/`.ods` files read with calamine.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod local;
pub mod memory;

pub use local::LocalWorkbookClient;
pub use memory::{MemoryClient, MemorySpreadsheet, MemoryWorksheet};

/// Opens spreadsheets by key.
pub trait SpreadsheetClient: Send + Sync {
    fn open(&self, key: &str) -> Result<Box<dyn Spreadsheet>>;
}

/// An opened spreadsheet (a workbook).
pub trait Spreadsheet: Send {
    fn title(&self) -> &str;

    /// Worksheets in display order
    fn worksheets(&self) -> Result<Vec<&dyn Worksheet>>;

    /// Look up a worksheet by its exact title
    fn worksheet(&self, title: &str) -> Result<&dyn Worksheet> {
        self.worksheets()?
            .into_iter()
            .find(|w| w.title() == title)
            .ok_or_else(|| Error::NotFound(format!("worksheet '{}'", title)))
    }
}

/// One worksheet of a spreadsheet.
pub trait Worksheet: Send + Sync {
    fn title(&self) -> &str;

    /// Read a single cell by A1 reference (e.g. `"E3"`)
    fn read_cell(&self, a1: &str) -> Result<CellValue>;

    /// Read a rectangular window as rows of text
    fn read_grid(&self, range: CellRange, options: GridOptions) -> Result<Vec<Vec<String>>>;
}

/// Cell value types
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
}

impl CellValue {
    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Get the text if this is a text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value the way an unformatted text export shows it.
    ///
    /// Whole numbers drop the fractional part, dates use `D/M/YY`.
    pub fn to_display_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Date(d) => d.format("%-d/%-m/%y").to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

/// Zero-based cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Convert column number to letter (0 -> A, 1 -> B, etc.)
    pub fn col_to_letter(mut col: u32) -> String {
        let mut result = String::new();
        loop {
            result.insert(0, (b'A' + (col % 26) as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        result
    }
}

impl FromStr for CellRef {
    type Err = Error;

    /// Parse an A1 reference, ignoring `$` anchors
    fn from_str(s: &str) -> Result<Self> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| Error::CellReference(s.to_string()))?;
        let (letters, digits) = cleaned.split_at(split);

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::CellReference(s.to_string()));
        }

        let mut col: u32 = 0;
        for ch in letters.chars() {
            col = col
                .checked_mul(26)
                .and_then(|c| c.checked_add((ch.to_ascii_uppercase() as u8 - b'A') as u32 + 1))
                .ok_or_else(|| Error::CellReference(s.to_string()))?;
        }

        let row: u32 = digits
            .parse()
            .map_err(|_| Error::CellReference(s.to_string()))?;
        if row == 0 {
            return Err(Error::CellReference(s.to_string()));
        }

        Ok(CellRef::new(row - 1, col - 1))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::col_to_letter(self.col), self.row + 1)
    }
}

/// Inclusive rectangular range such as `A3:R358`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    pub fn new(start: CellRef, end: CellRef) -> Self {
        Self { start, end }
    }

    pub fn rows(&self) -> std::ops::RangeInclusive<u32> {
        self.start.row..=self.end.row
    }

    pub fn cols(&self) -> std::ops::RangeInclusive<u32> {
        self.start.col..=self.end.col
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (a, b) = s
            .split_once(':')
            .ok_or_else(|| Error::CellReference(s.to_string()))?;
        let start: CellRef = a.parse()?;
        let end: CellRef = b.parse()?;
        if start.row > end.row || start.col > end.col {
            return Err(Error::CellReference(s.to_string()));
        }
        Ok(CellRange::new(start, end))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// How a grid window is materialized.
///
/// The default is raw text with no header row and trailing empties dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridOptions {
    /// Treat the first row as column labels and drop it
    pub header: bool,
    /// Keep empty cells at the end of each row
    pub include_trailing_empty: bool,
    /// Render numbers in full precision instead of their display form
    pub numerize: bool,
}

/// Shape a block of cell values into text rows following `options`.
///
/// Backends call this so every source honors the same window semantics.
pub(crate) fn materialize_grid(
    rows: impl Iterator<Item = Vec<CellValue>>,
    options: GridOptions,
) -> Vec<Vec<String>> {
    let mut grid: Vec<Vec<String>> = rows
        .map(|row| {
            let mut texts: Vec<String> = row
                .iter()
                .map(|value| match value {
                    CellValue::Number(n) if options.numerize => n.to_string(),
                    other => other.to_display_text(),
                })
                .collect();
            if !options.include_trailing_empty {
                while texts.last().is_some_and(|t| t.is_empty()) {
                    texts.pop();
                }
            }
            texts
        })
        .collect();

    if options.header && !grid.is_empty() {
        grid.remove(0);
    }
    grid
}
