//! In-memory spreadsheets

use super::{
    CellRange, CellRef, CellValue, GridOptions, Spreadsheet, SpreadsheetClient, Worksheet,
    materialize_grid,
};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Serves spreadsheets held in memory, keyed by spreadsheet key.
#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    spreadsheets: HashMap<String, MemorySpreadsheet>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, spreadsheet: MemorySpreadsheet) {
        self.spreadsheets.insert(key.into(), spreadsheet);
    }

    pub fn with_spreadsheet(mut self, key: impl Into<String>, spreadsheet: MemorySpreadsheet) -> Self {
        self.insert(key, spreadsheet);
        self
    }
}

impl SpreadsheetClient for MemoryClient {
    fn open(&self, key: &str) -> Result<Box<dyn Spreadsheet>> {
        self.spreadsheets
            .get(key)
            .cloned()
            .map(|s| Box::new(s) as Box<dyn Spreadsheet>)
            .ok_or_else(|| Error::NotFound(format!("spreadsheet '{}'", key)))
    }
}

/// Represents a complete workbook
#[derive(Debug, Clone, Default)]
pub struct MemorySpreadsheet {
    pub title: String,
    pub worksheets: Vec<MemoryWorksheet>,
}

impl MemorySpreadsheet {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            worksheets: Vec::new(),
        }
    }

    pub fn with_worksheet(mut self, worksheet: MemoryWorksheet) -> Self {
        self.worksheets.push(worksheet);
        self
    }
}

impl Spreadsheet for MemorySpreadsheet {
    fn title(&self) -> &str {
        &self.title
    }

    fn worksheets(&self) -> Result<Vec<&dyn Worksheet>> {
        Ok(self.worksheets.iter().map(|w| w as &dyn Worksheet).collect())
    }
}

/// Represents a worksheet as a sparse map of zero-based positions
#[derive(Debug, Clone, Default)]
pub struct MemoryWorksheet {
    pub title: String,
    pub cells: HashMap<(u32, u32), CellValue>,
}

impl MemoryWorksheet {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            cells: HashMap::new(),
        }
    }

    /// Set a cell by A1 reference
    pub fn set(&mut self, a1: &str, value: impl Into<CellValue>) -> Result<()> {
        let at: CellRef = a1.parse()?;
        let value = value.into();
        if value.is_empty() {
            self.cells.remove(&(at.row, at.col));
        } else {
            self.cells.insert((at.row, at.col), value);
        }
        Ok(())
    }

    /// Builder form of [`MemoryWorksheet::set`]
    pub fn with_cell(mut self, a1: &str, value: impl Into<CellValue>) -> Result<Self> {
        self.set(a1, value)?;
        Ok(self)
    }

    /// Get a cell at the given position
    pub fn get_cell(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    /// Get the last cell with actual data (bottom-right corner of data range)
    pub fn last_data_cell(&self) -> Option<(u32, u32)> {
        let max_row = self.cells.keys().map(|(r, _)| *r).max()?;
        let max_col = self.cells.keys().map(|(_, c)| *c).max()?;
        Some((max_row, max_col))
    }
}

impl Worksheet for MemoryWorksheet {
    fn title(&self) -> &str {
        &self.title
    }

    fn read_cell(&self, a1: &str) -> Result<CellValue> {
        let at: CellRef = a1.parse()?;
        Ok(self.get_cell(at.row, at.col).cloned().unwrap_or_default())
    }

    fn read_grid(&self, range: CellRange, options: GridOptions) -> Result<Vec<Vec<String>>> {
        // Rows past the last populated one are not materialized
        let last_row = match self.last_data_cell() {
            Some((row, _)) => row,
            None => return Ok(Vec::new()),
        };

        let rows = range.rows().take_while(|row| *row <= last_row).map(|row| {
            range
                .cols()
                .map(|col| self.get_cell(row, col).cloned().unwrap_or_default())
                .collect::<Vec<_>>()
        });
        Ok(materialize_grid(rows, options))
    }
}
