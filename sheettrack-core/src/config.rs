//! Configuration for update runs

use crate::extract::DEFAULT_RANGE;
use crate::similarity::{DEFAULT_SCORER, scorer_by_name};
use crate::source::CellRange;
use crate::store::Catalog;
use crate::validator::ValidationOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no config is given
pub const DEFAULT_CONFIG_FILE: &str = "sheettrack.toml";

/// Main tracker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Validate and extract teachers concurrently
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub catalog: Catalog,
    #[serde(default)]
    pub teachers: Vec<TeacherConfig>,
}

impl TrackerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: TrackerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.validation.similarity_threshold > 100 {
            anyhow::bail!(
                "Configuration error: similarity_threshold {} is above 100",
                self.validation.similarity_threshold
            );
        }

        scorer_by_name(&self.validation.scorer)
            .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

        self.extraction
            .range()
            .map_err(|e| anyhow::anyhow!("Configuration error: extraction range: {}", e))?;

        let mut seen_urls = HashSet::new();
        for teacher in &self.teachers {
            if let Some(threshold) = teacher.similarity_threshold {
                if threshold > 100 {
                    anyhow::bail!(
                        "Configuration error: similarity_threshold {} for teacher '{}' is above 100",
                        threshold,
                        teacher.full_name
                    );
                }
            }
            if !seen_urls.insert(teacher.google_sheet_url.trim()) {
                anyhow::bail!(
                    "Configuration error: duplicate google_sheet_url '{}' (teacher '{}')",
                    teacher.google_sheet_url,
                    teacher.full_name
                );
            }
        }

        Ok(())
    }

    /// Teachers marked active, in configuration order
    pub fn active_teachers(&self) -> impl Iterator<Item = &TeacherConfig> {
        self.teachers.iter().filter(|t| t.is_active)
    }
}

/// `[validation]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub header_cell: String,
    pub expected_header: String,
    pub name_cell: String,
    pub similarity_threshold: u8,
    /// Scorer name, see [`crate::similarity::available_scorers`]
    pub scorer: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let options = ValidationOptions::default();
        Self {
            header_cell: options.header_cell,
            expected_header: options.expected_header,
            name_cell: options.name_cell,
            similarity_threshold: options.similarity_threshold,
            scorer: DEFAULT_SCORER.to_string(),
        }
    }
}

impl ValidationConfig {
    /// Validation options with fallback chain: teacher -> global
    pub fn options_for(&self, teacher: Option<&TeacherConfig>) -> ValidationOptions {
        let similarity_threshold = teacher
            .and_then(|t| t.similarity_threshold)
            .unwrap_or(self.similarity_threshold);

        ValidationOptions {
            header_cell: self.header_cell.clone(),
            expected_header: self.expected_header.clone(),
            name_cell: self.name_cell.clone(),
            similarity_threshold,
        }
    }
}

/// `[extraction]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub range: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            range: DEFAULT_RANGE.to_string(),
        }
    }
}

impl ExtractionConfig {
    pub fn range(&self) -> crate::Result<CellRange> {
        self.range.parse()
    }
}

/// `[source]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory holding `<key>.xlsx` workbooks
    pub directory: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

/// One `[[teachers]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherConfig {
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub google_sheet_url: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Overrides `[validation] similarity_threshold` for this teacher
    #[serde(default)]
    pub similarity_threshold: Option<u8>,
}

fn default_active() -> bool {
    true
}
