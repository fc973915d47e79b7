//! Worksheet validation
//!
//! A teacher's spreadsheet may hold worksheets copied from colleagues or left
//! over from templates. A worksheet is trusted only when it carries the
//! expected marker in its header cell and the name written in it matches the
//! teacher name encoded in the spreadsheet title (`NAME_extra`).

use crate::error::{Error, Result};
use crate::names::{normalize, normalize_name};
use crate::sheet_key::extract_sheet_key;
use crate::similarity::{SimilarityScorer, TokenSetScorer};
use crate::source::{Spreadsheet, SpreadsheetClient, Worksheet};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Cells and threshold used to accept a worksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    pub header_cell: String,
    pub expected_header: String,
    pub name_cell: String,
    /// Minimum score (0-100) for the names to be considered a match
    pub similarity_threshold: u8,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            header_cell: "E3".to_string(),
            expected_header: "DOCENTE".to_string(),
            name_cell: "E4".to_string(),
            similarity_threshold: 80,
        }
    }
}

/// Teacher name encoded in a spreadsheet title, normalized.
///
/// `"Lic. María López_Matemáticas 2025"` gives `"maria lopez"`.
pub fn title_teacher_name(spreadsheet_title: &str) -> String {
    let head = spreadsheet_title
        .trim()
        .split('_')
        .next()
        .unwrap_or_default()
        .trim();
    normalize_name(head)
}

/// Finds the worksheets of a spreadsheet that belong to a teacher.
pub struct WorksheetValidator<'a> {
    client: &'a dyn SpreadsheetClient,
    scorer: &'a dyn SimilarityScorer,
}

impl<'a> WorksheetValidator<'a> {
    pub fn new(client: &'a dyn SpreadsheetClient, scorer: &'a dyn SimilarityScorer) -> Self {
        Self { client, scorer }
    }

    /// Open the spreadsheet behind `sheet_url`.
    pub fn open(&self, sheet_url: &str) -> Result<(String, Box<dyn Spreadsheet>)> {
        let key = extract_sheet_key(sheet_url).ok_or_else(|| Error::InvalidReference {
            url: sheet_url.to_string(),
        })?;
        let spreadsheet = self.client.open(&key)?;
        Ok((key, spreadsheet))
    }

    /// Titles of the worksheets in `sheet_url` that pass validation, in
    /// display order. An empty list is a valid outcome.
    pub fn find_valid_worksheets(
        &self,
        sheet_url: &str,
        teacher_name: &str,
        options: &ValidationOptions,
    ) -> Result<Vec<String>> {
        let (key, spreadsheet) = self.open(sheet_url)?;
        self.validate_spreadsheet(&key, spreadsheet.as_ref(), teacher_name, options)
    }

    /// Validation over an already opened spreadsheet
    pub fn validate_spreadsheet(
        &self,
        key: &str,
        spreadsheet: &dyn Spreadsheet,
        teacher_name: &str,
        options: &ValidationOptions,
    ) -> Result<Vec<String>> {
        let title_name = title_teacher_name(spreadsheet.title());
        let expected = options.expected_header.to_uppercase();

        let wrap = |e: Error| match e {
            Error::MatchingUnavailable(_) => e,
            other => Error::Worksheet {
                key: key.to_string(),
                source: Box::new(other),
            },
        };

        let mut valid_titles = Vec::new();
        for worksheet in spreadsheet.worksheets().map_err(wrap)? {
            if let Some(score) = self
                .check_worksheet(worksheet, &title_name, &expected, options)
                .map_err(wrap)?
            {
                if score >= options.similarity_threshold {
                    valid_titles.push(worksheet.title().to_string());
                } else {
                    debug!(
                        "worksheet '{}' rejected for {}: score {} < {}",
                        worksheet.title(),
                        teacher_name,
                        score,
                        options.similarity_threshold
                    );
                }
            }
        }

        info!(
            "{}: {} valid worksheet(s) in '{}'",
            teacher_name,
            valid_titles.len(),
            spreadsheet.title()
        );
        Ok(valid_titles)
    }

    /// Similarity score of a worksheet, or `None` when it cannot be compared
    fn check_worksheet(
        &self,
        worksheet: &dyn Worksheet,
        title_name: &str,
        expected_header: &str,
        options: &ValidationOptions,
    ) -> Result<Option<u8>> {
        let header = worksheet.read_cell(&options.header_cell)?;
        match header.as_text() {
            Some(text) if text.trim().to_uppercase() == expected_header => {}
            _ => {
                debug!(
                    "worksheet '{}' skipped: {} is not '{}'",
                    worksheet.title(),
                    options.header_cell,
                    expected_header
                );
                return Ok(None);
            }
        }

        let name_value = worksheet.read_cell(&options.name_cell)?;
        match name_value.as_text() {
            Some(text) if !text.trim().is_empty() => {}
            _ => {
                debug!(
                    "worksheet '{}' skipped: {} has no name",
                    worksheet.title(),
                    options.name_cell
                );
                return Ok(None);
            }
        }

        let cell_name = normalize(&name_value);
        if title_name.is_empty() || cell_name.is_empty() {
            return Ok(None);
        }

        let score = self.scorer.score(&cell_name, title_name)?;
        debug!(
            "worksheet '{}': '{}' vs '{}' -> {}",
            worksheet.title(),
            cell_name,
            title_name,
            score
        );
        Ok(Some(score))
    }
}

/// Validate with the default token-set scorer
pub fn find_valid_worksheets(
    client: &dyn SpreadsheetClient,
    sheet_url: &str,
    teacher_name: &str,
    options: &ValidationOptions,
) -> Result<Vec<String>> {
    WorksheetValidator::new(client, &TokenSetScorer).find_valid_worksheets(
        sheet_url,
        teacher_name,
        options,
    )
}
