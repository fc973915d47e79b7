//! Persistence boundary for extracted records
//!
//! Records are upserted on their natural keys. Every reference a record makes
//! (grade level, periodo of the academic year, paralelo) is resolved against a
//! [`Catalog`]; a failed lookup is returned to the caller per record.

use crate::records::{Paralelo, PeriodKey, PeriodProgressRecord, TopicCompletionRecord};
use chrono::{DateTime, NaiveDate, Utc};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Reference data records are checked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    /// The active academic year
    pub academic_year: String,
    /// Known grade level codes (e.g., "1S", "6P")
    pub grade_levels: BTreeSet<String>,
    /// Number of periodos in the academic year, numbered from 1
    pub periodos: u32,
    pub paralelos: BTreeSet<Paralelo>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            academic_year: String::new(),
            grade_levels: BTreeSet::new(),
            periodos: 6,
            paralelos: Paralelo::ALL.into_iter().collect(),
        }
    }
}

impl Catalog {
    pub fn new(academic_year: impl Into<String>) -> Self {
        Self {
            academic_year: academic_year.into(),
            ..Default::default()
        }
    }

    pub fn with_grade_levels<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grade_levels.extend(codes.into_iter().map(Into::into));
        self
    }

    /// Check every reference of a period key
    pub fn resolve(&self, academic_year: &str, key: &PeriodKey) -> Result<(), LookupError> {
        if academic_year != self.academic_year {
            return Err(LookupError::AcademicYear(academic_year.to_string()));
        }
        if !self.grade_levels.contains(&key.grade_level) {
            return Err(LookupError::GradeLevel(key.grade_level.clone()));
        }
        if key.periodo == 0 || key.periodo > self.periodos {
            return Err(LookupError::Periodo {
                periodo: key.periodo,
                academic_year: academic_year.to_string(),
            });
        }
        if !self.paralelos.contains(&key.paralelo) {
            return Err(LookupError::Paralelo(key.paralelo));
        }
        Ok(())
    }
}

/// A record references something the store does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("academic year '{0}' is not the active one")]
    AcademicYear(String),

    #[error("grade level '{0}' does not exist")]
    GradeLevel(String),

    #[error("periodo {periodo} does not exist in academic year '{academic_year}'")]
    Periodo { periodo: u32, academic_year: String },

    #[error("paralelo '{0}' does not exist")]
    Paralelo(Paralelo),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Destination of extracted records.
pub trait ProgressStore: Send {
    fn upsert_period_progress(
        &mut self,
        teacher: &str,
        academic_year: &str,
        record: &PeriodProgressRecord,
    ) -> Result<UpsertOutcome, LookupError>;

    fn upsert_topic_completion(
        &mut self,
        teacher: &str,
        academic_year: &str,
        record: &TopicCompletionRecord,
    ) -> Result<UpsertOutcome, LookupError>;
}

/// Stored period progress, one per (teacher, year, grade, periodo, paralelo)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodProgressRow {
    pub teacher: String,
    pub academic_year: String,
    pub grade_level: String,
    pub periodo: u32,
    pub paralelo: Paralelo,
    pub progress_percentage: f64,
    pub last_updated: DateTime<Utc>,
}

/// Stored topic completion, one per period key and topic number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCompletionRow {
    pub teacher: String,
    pub academic_year: String,
    pub grade_level: String,
    pub periodo: u32,
    pub paralelo: Paralelo,
    pub tema_number: String,
    pub tema_title: String,
    pub completion_date: NaiveDate,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RowKey {
    teacher: String,
    academic_year: String,
    period: PeriodKey,
}

/// Serializable view of a [`MemoryStore`]
#[derive(Debug, Serialize)]
pub struct StoreSnapshot<'a> {
    pub catalog: &'a Catalog,
    pub period_progress: Vec<&'a PeriodProgressRow>,
    pub topic_completion: Vec<&'a TopicCompletionRow>,
}

/// In-memory [`ProgressStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    catalog: Catalog,
    period_progress: BTreeMap<RowKey, PeriodProgressRow>,
    topic_completion: BTreeMap<(RowKey, String), TopicCompletionRow>,
}

impl MemoryStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            ..Default::default()
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Period progress rows ordered by key
    pub fn period_progress(&self) -> impl Iterator<Item = &PeriodProgressRow> {
        self.period_progress.values()
    }

    /// Topic completion rows ordered by key
    pub fn topic_completion(&self) -> impl Iterator<Item = &TopicCompletionRow> {
        self.topic_completion.values()
    }

    pub fn snapshot(&self) -> StoreSnapshot<'_> {
        StoreSnapshot {
            catalog: &self.catalog,
            period_progress: self.period_progress.values().collect(),
            topic_completion: self.topic_completion.values().collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    fn row_key(
        &self,
        teacher: &str,
        academic_year: &str,
        period: PeriodKey,
    ) -> Result<RowKey, LookupError> {
        self.catalog.resolve(academic_year, &period)?;
        Ok(RowKey {
            teacher: teacher.to_string(),
            academic_year: academic_year.to_string(),
            period,
        })
    }
}

impl ProgressStore for MemoryStore {
    fn upsert_period_progress(
        &mut self,
        teacher: &str,
        academic_year: &str,
        record: &PeriodProgressRecord,
    ) -> Result<UpsertOutcome, LookupError> {
        let key = self.row_key(teacher, academic_year, record.key())?;
        let now = Utc::now();

        if let Some(row) = self.period_progress.get_mut(&key) {
            row.progress_percentage = record.progress_percentage;
            row.last_updated = now;
            trace!("updated progress {:?}", key);
            return Ok(UpsertOutcome::Updated);
        }

        let row = PeriodProgressRow {
            teacher: key.teacher.clone(),
            academic_year: key.academic_year.clone(),
            grade_level: record.grade_level.clone(),
            periodo: record.periodo,
            paralelo: record.paralelo,
            progress_percentage: record.progress_percentage,
            last_updated: now,
        };
        trace!("created progress {:?}", key);
        self.period_progress.insert(key, row);
        Ok(UpsertOutcome::Created)
    }

    fn upsert_topic_completion(
        &mut self,
        teacher: &str,
        academic_year: &str,
        record: &TopicCompletionRecord,
    ) -> Result<UpsertOutcome, LookupError> {
        let topic_key = record.key();
        let key = (
            self.row_key(teacher, academic_year, topic_key.period)?,
            topic_key.tema_number,
        );
        let now = Utc::now();

        if let Some(row) = self.topic_completion.get_mut(&key) {
            row.tema_title = record.tema_title.clone();
            row.completion_date = record.completion_date;
            row.last_updated = now;
            return Ok(UpsertOutcome::Updated);
        }

        let row = TopicCompletionRow {
            teacher: teacher.to_string(),
            academic_year: academic_year.to_string(),
            grade_level: record.grade_level.clone(),
            periodo: record.periodo,
            paralelo: record.paralelo,
            tema_number: record.tema_number.clone(),
            tema_title: record.tema_title.clone(),
            completion_date: record.completion_date,
            last_updated: now,
        };
        self.topic_completion.insert(key, row);
        Ok(UpsertOutcome::Created)
    }
}
