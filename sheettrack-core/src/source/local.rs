//! Local workbook backend using calamine
//!
//! A spreadsheet key resolves to `<dir>/<key>.{xlsx,xlsm,xls,ods}`. The
//! spreadsheet title comes from an optional `<key>.title` side file, falling
//! back to the file stem, mirroring how shared spreadsheets carry a display
//! title distinct from their key.

use super::memory::{MemorySpreadsheet, MemoryWorksheet};
use super::{CellValue, Spreadsheet, SpreadsheetClient};
use crate::error::{Error, Result};
use calamine::{
    Data, OdsError, Range, Reader, Sheets, XlsError, XlsbError, XlsxError, open_workbook_auto,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// Opens workbooks stored in a local directory.
#[derive(Debug, Clone)]
pub struct LocalWorkbookClient {
    dir: PathBuf,
}

impl LocalWorkbookClient {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Find the workbook file for a key
    pub fn resolve(&self, key: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", key, ext)))
            .find(|p| p.is_file())
    }

    fn title_for(&self, key: &str, path: &Path) -> String {
        let side_file = self.dir.join(format!("{}.title", key));
        match fs::read_to_string(&side_file) {
            Ok(title) if !title.trim().is_empty() => title.trim().to_string(),
            _ => path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(key)
                .to_string(),
        }
    }
}

impl SpreadsheetClient for LocalWorkbookClient {
    fn open(&self, key: &str) -> Result<Box<dyn Spreadsheet>> {
        let path = self.resolve(key).ok_or_else(|| {
            Error::NotFound(format!("spreadsheet '{}' in {}", key, self.dir.display()))
        })?;
        let title = self.title_for(key, &path);
        let spreadsheet = read_spreadsheet(&path, title)?;
        Ok(Box::new(spreadsheet))
    }
}

/// Read every worksheet of a workbook file into memory
pub fn read_spreadsheet<P: AsRef<Path>>(path: P, title: String) -> Result<MemorySpreadsheet> {
    let path = path.as_ref();
    let mut excel: Sheets<_> = open_workbook_auto(path).map_err(|e| workbook_error(path, e))?;

    let mut spreadsheet = MemorySpreadsheet::new(title);
    for sheet_name in excel.sheet_names() {
        let range = excel
            .worksheet_range(&sheet_name)
            .map_err(|e| workbook_error(path, e))?;
        spreadsheet
            .worksheets
            .push(parse_worksheet(&sheet_name, &range));
    }

    Ok(spreadsheet)
}

/// Password-protected workbooks are an access error, not a parse failure
fn workbook_error(path: &Path, err: calamine::Error) -> Error {
    match err {
        calamine::Error::Io(e) => e.into(),
        calamine::Error::Xlsx(XlsxError::Password)
        | calamine::Error::Xlsb(XlsbError::Password)
        | calamine::Error::Xls(XlsError::Password)
        | calamine::Error::Ods(OdsError::Password) => {
            Error::Authentication(format!("{} is password protected", path.display()))
        }
        other => Error::Workbook(format!("{}: {}", path.display(), other)),
    }
}

fn parse_worksheet(name: &str, range: &Range<Data>) -> MemoryWorksheet {
    let mut cells = HashMap::new();

    // calamine ranges start at the first used cell, not at A1
    if let Some((start_row, start_col)) = range.start() {
        for (rel_row, row) in range.rows().enumerate() {
            for (rel_col, data) in row.iter().enumerate() {
                let value = parse_cell_value(data);
                if !value.is_empty() {
                    cells.insert(
                        (start_row + rel_row as u32, start_col + rel_col as u32),
                        value,
                    );
                }
            }
        }
    }

    MemoryWorksheet {
        title: name.to_string(),
        cells,
    }
}

fn parse_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(_) => CellValue::Empty,
        Data::Empty => CellValue::Empty,
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => CellValue::Date(datetime.date()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
