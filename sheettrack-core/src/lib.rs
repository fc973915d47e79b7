//! sheettrack-core: teaching progress extraction from spreadsheets
//!
//! Each teacher keeps a spreadsheet with one worksheet per grade level. This
//! library finds the worksheets that belong to the teacher, scans their
//! period blocks for progress percentages and topic completion dates, and
//! upserts the resulting records into a store.

pub mod coerce;
pub mod config;
pub mod error;
pub mod extract;
pub mod names;
pub mod orchestrator;
pub mod records;
pub mod sheet_key;
pub mod similarity;
pub mod source;
pub mod store;
pub mod validator;

pub use coerce::{parse_date, parse_percentage};
pub use config::{TeacherConfig, TrackerConfig};
pub use error::{Error, Result};
pub use extract::GridExtractor;
pub use names::{normalize, normalize_name};
pub use orchestrator::{UpdateOrchestrator, UpdateReport};
pub use records::{ExtractedData, Paralelo, PeriodProgressRecord, TopicCompletionRecord};
pub use sheet_key::extract_sheet_key;
pub use similarity::{SimilarityScorer, TokenSetScorer};
pub use source::{CellValue, LocalWorkbookClient, MemoryClient, SpreadsheetClient};
pub use store::{Catalog, MemoryStore, ProgressStore};
pub use validator::{ValidationOptions, WorksheetValidator, find_valid_worksheets};
