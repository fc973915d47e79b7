//! Grid extraction
//!
//! A validated worksheet has no labelled schema. Rows are recognized by
//! position and content, top to bottom:
//!
//! - a **period header** (`1ER PERIODO` in column A or G) opens a period;
//! - the row right after a header is a **progress row** holding one
//!   percentage per parallel section in columns O..R;
//! - any later row with a title in column E is a **topic row** holding one
//!   completion date per parallel section in columns O..R;
//! - everything else is spacing or description and is ignored.

use crate::coerce::{date_from_text, percentage_from_text};
use crate::records::{ExtractedData, Paralelo, PeriodProgressRecord, TopicCompletionRecord};
use crate::source::{CellRange, CellRef, GridOptions, Worksheet};
use log::{debug, warn};
use regex::Regex;
use std::sync::OnceLock;

/// Window scanned on every worksheet
pub const DEFAULT_RANGE: &str = "A3:R358";

const COL_A: usize = 0;
const COL_D: usize = 3;
const COL_E: usize = 4;
const COL_G: usize = 6;

/// Section data columns O, P, Q, R
pub const SECTION_COLUMNS: [(Paralelo, usize); 4] = [
    (Paralelo::A, 14),
    (Paralelo::B, 15),
    (Paralelo::C, 16),
    (Paralelo::D, 17),
];

const GRID_OPTIONS: GridOptions = GridOptions {
    header: false,
    include_trailing_empty: false,
    numerize: false,
};

fn period_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The ordinal suffix is not checked against the number ("1DO" is accepted)
    RE.get_or_init(|| Regex::new(r"([0-9]+)(?:ER|DO|TO)+ PERIODO").expect("static period pattern"))
}

/// Carried between rows; local to one extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    /// 0 until the first period header is seen
    pub current_periodo: u32,
    pub expect_progress_next: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind<'a> {
    PeriodHeader(u32),
    Progress,
    Topic { number: &'a str, title: &'a str },
    Other,
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// Period number announced by a header row, if any
fn period_header(row: &[String]) -> Option<u32> {
    let label = format!(
        "{}{}",
        cell(row, COL_A).trim().to_uppercase(),
        cell(row, COL_G).trim().to_uppercase()
    );
    let caps = period_pattern().captures(&label)?;
    // Only overflow can fail here; the row still opens a period
    Some(caps[1].parse().unwrap_or_else(|_| {
        debug!("period number out of range in '{}'", label);
        u32::MAX
    }))
}

fn classify<'a>(state: &ScanState, row: &'a [String]) -> RowKind<'a> {
    if let Some(periodo) = period_header(row) {
        return RowKind::PeriodHeader(periodo);
    }
    if state.expect_progress_next {
        return RowKind::Progress;
    }
    let title = cell(row, COL_E).trim();
    if !title.is_empty() && state.current_periodo > 0 {
        return RowKind::Topic {
            number: cell(row, COL_D).trim(),
            title,
        };
    }
    RowKind::Other
}

impl ScanState {
    /// Classify one row, emit its records and advance the state
    pub fn step(&mut self, grade_level: &str, row: &[String], out: &mut ExtractedData) {
        match classify(self, row) {
            RowKind::PeriodHeader(periodo) => {
                self.current_periodo = periodo;
                self.expect_progress_next = true;
            }
            RowKind::Progress => {
                if self.current_periodo > 0 {
                    for (paralelo, col) in SECTION_COLUMNS {
                        if let Some(progress) = percentage_from_text(cell(row, col)) {
                            out.period_progress.push(PeriodProgressRecord {
                                grade_level: grade_level.to_string(),
                                periodo: self.current_periodo,
                                paralelo,
                                progress_percentage: progress,
                            });
                        }
                    }
                }
                self.expect_progress_next = false;
            }
            RowKind::Topic { number, title } => {
                for (paralelo, col) in SECTION_COLUMNS {
                    if let Some(date) = date_from_text(cell(row, col)) {
                        out.topic_completion.push(TopicCompletionRecord {
                            grade_level: grade_level.to_string(),
                            periodo: self.current_periodo,
                            paralelo,
                            tema_number: number.to_string(),
                            tema_title: title.to_string(),
                            completion_date: date,
                        });
                    }
                }
            }
            RowKind::Other => {
                self.expect_progress_next = false;
            }
        }
    }
}

/// Extract records from rows already read as text
pub fn extract_rows(grade_level: &str, rows: &[Vec<String>]) -> ExtractedData {
    let (_, data) = rows.iter().fold(
        (ScanState::default(), ExtractedData::default()),
        |(mut state, mut data), row| {
            state.step(grade_level, row, &mut data);
            (state, data)
        },
    );
    data
}

/// Reads the fixed window of a worksheet and turns it into records.
#[derive(Debug, Clone, Copy)]
pub struct GridExtractor {
    range: CellRange,
}

impl Default for GridExtractor {
    fn default() -> Self {
        Self {
            range: CellRange::new(CellRef::new(2, 0), CellRef::new(357, 17)),
        }
    }
}

impl GridExtractor {
    pub fn new(range: CellRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> CellRange {
        self.range
    }

    /// Extract both record streams from a worksheet.
    ///
    /// The worksheet title is used as the grade level. A failed grid read
    /// yields empty lists so one broken worksheet does not stop a batch.
    pub fn extract(&self, worksheet: &dyn Worksheet) -> ExtractedData {
        let grade_level = worksheet.title();
        let rows = match worksheet.read_grid(self.range, GRID_OPTIONS) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    "failed to read {} from worksheet '{}': {}",
                    self.range, grade_level, e
                );
                return ExtractedData::default();
            }
        };

        let data = extract_rows(grade_level, &rows);
        debug!(
            "worksheet '{}': {} rows scanned, {} progress and {} topic records",
            grade_level,
            rows.len(),
            data.period_progress.len(),
            data.topic_completion.len()
        );
        data
    }
}
