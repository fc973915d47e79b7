//! Update runs over all configured teachers
//!
//! For each active teacher the orchestrator opens the teacher's spreadsheet,
//! keeps the worksheets that pass validation, extracts their records and
//! upserts them into a [`ProgressStore`]. Failures are reported per teacher
//! and per worksheet; the run only stops when name matching is unavailable.

use crate::config::{TeacherConfig, TrackerConfig, ValidationConfig};
use crate::error::{Error, Result};
use crate::extract::GridExtractor;
use crate::records::ExtractedData;
use crate::similarity::{SimilarityScorer, TokenSetScorer, scorer_by_name};
use crate::source::SpreadsheetClient;
use crate::store::{ProgressStore, UpsertOutcome};
use crate::validator::WorksheetValidator;
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::ops::AddAssign;

/// Records written to the store, by kind and outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertCounts {
    pub progress_created: usize,
    pub progress_updated: usize,
    pub topics_created: usize,
    pub topics_updated: usize,
}

impl UpsertCounts {
    pub fn total(&self) -> usize {
        self.progress_created + self.progress_updated + self.topics_created + self.topics_updated
    }
}

impl AddAssign for UpsertCounts {
    fn add_assign(&mut self, other: Self) {
        self.progress_created += other.progress_created;
        self.progress_updated += other.progress_updated;
        self.topics_created += other.topics_created;
        self.topics_updated += other.topics_updated;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorksheetStatus {
    Updated,
    NoData,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorksheetReport {
    pub title: String,
    pub status: WorksheetStatus,
    pub counts: UpsertCounts,
    /// Records rejected by the store
    pub lookup_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorksheetReport {
    fn new(title: String, status: WorksheetStatus) -> Self {
        Self {
            title,
            status,
            counts: UpsertCounts::default(),
            lookup_errors: Vec::new(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeacherStatus {
    Processed,
    NoValidWorksheets,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeacherReport {
    pub teacher: String,
    pub sheet_url: String,
    pub status: TeacherStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub worksheets: Vec<WorksheetReport>,
}

impl TeacherReport {
    fn new(teacher: &TeacherConfig, status: TeacherStatus) -> Self {
        Self {
            teacher: teacher.full_name.clone(),
            sheet_url: teacher.google_sheet_url.clone(),
            status,
            error: None,
            worksheets: Vec::new(),
        }
    }

    pub fn counts(&self) -> UpsertCounts {
        let mut counts = UpsertCounts::default();
        for worksheet in &self.worksheets {
            counts += worksheet.counts;
        }
        counts
    }
}

/// Outcome of an update run
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateReport {
    pub academic_year: String,
    pub teachers: Vec<TeacherReport>,
}

impl UpdateReport {
    pub fn counts(&self) -> UpsertCounts {
        let mut counts = UpsertCounts::default();
        for teacher in &self.teachers {
            counts += teacher.counts();
        }
        counts
    }

    pub fn failed_teachers(&self) -> usize {
        self.teachers
            .iter()
            .filter(|t| t.status == TeacherStatus::Failed)
            .count()
    }

    pub fn lookup_errors(&self) -> usize {
        self.teachers
            .iter()
            .flat_map(|t| &t.worksheets)
            .map(|w| w.lookup_errors.len())
            .sum()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_teachers() > 0
    }
}

/// Worksheet records fetched for a teacher, not yet stored
struct Harvested {
    title: String,
    data: Result<ExtractedData>,
}

/// Drives validation, extraction and upserts for a list of teachers.
pub struct UpdateOrchestrator<'a> {
    client: &'a dyn SpreadsheetClient,
    scorer: Box<dyn SimilarityScorer>,
    validation: ValidationConfig,
    extractor: GridExtractor,
    academic_year: String,
    parallel: bool,
}

impl<'a> UpdateOrchestrator<'a> {
    pub fn new(client: &'a dyn SpreadsheetClient, academic_year: impl Into<String>) -> Self {
        Self {
            client,
            scorer: Box::new(TokenSetScorer),
            validation: ValidationConfig::default(),
            extractor: GridExtractor::default(),
            academic_year: academic_year.into(),
            parallel: false,
        }
    }

    /// Orchestrator set up from the validation, extraction and catalog sections
    pub fn from_config(config: &TrackerConfig, client: &'a dyn SpreadsheetClient) -> Result<Self> {
        let scorer = scorer_by_name(&config.validation.scorer)?;
        let extractor = GridExtractor::new(config.extraction.range()?);
        Ok(Self::new(client, config.catalog.academic_year.clone())
            .with_scorer(scorer)
            .with_validation(config.validation.clone())
            .with_extractor(extractor)
            .parallel(config.parallel))
    }

    pub fn with_scorer(mut self, scorer: Box<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_extractor(mut self, extractor: GridExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run an update over the active teachers.
    ///
    /// Only [`Error::MatchingUnavailable`] and a missing academic year abort
    /// the run; every other failure ends up in the report. Records of
    /// teachers processed before an abort stay in the store.
    pub fn run(
        &self,
        teachers: &[TeacherConfig],
        store: &mut dyn ProgressStore,
    ) -> Result<UpdateReport> {
        if self.academic_year.trim().is_empty() {
            return Err(Error::Config("no active academic year configured".to_string()));
        }

        let active: Vec<&TeacherConfig> = teachers.iter().filter(|t| t.is_active).collect();
        info!(
            "Updating {} active teacher(s) for academic year {}",
            active.len(),
            self.academic_year
        );

        let mut report = UpdateReport {
            academic_year: self.academic_year.clone(),
            teachers: Vec::with_capacity(active.len()),
        };

        if self.parallel {
            let harvests: Vec<_> = active.par_iter().map(|t| self.harvest(t)).collect();
            for (teacher, harvest) in active.iter().zip(harvests) {
                report.teachers.push(self.apply(teacher, harvest, store)?);
            }
        } else {
            for teacher in &active {
                let harvest = self.harvest(teacher);
                report.teachers.push(self.apply(teacher, harvest, store)?);
            }
        }

        let counts = report.counts();
        info!(
            "Update finished: {} record(s) written, {} lookup error(s), {} failed teacher(s)",
            counts.total(),
            report.lookup_errors(),
            report.failed_teachers()
        );
        Ok(report)
    }

    /// Validate and extract the worksheets of one teacher
    fn harvest(&self, teacher: &TeacherConfig) -> Result<Vec<Harvested>> {
        info!("Processing teacher: {}", teacher.full_name);
        let validator = WorksheetValidator::new(self.client, self.scorer.as_ref());
        let options = self.validation.options_for(Some(teacher));

        let (key, spreadsheet) = validator.open(&teacher.google_sheet_url)?;
        let titles = validator.validate_spreadsheet(
            &key,
            spreadsheet.as_ref(),
            &teacher.full_name,
            &options,
        )?;

        Ok(titles
            .into_iter()
            .map(|title| {
                let data = spreadsheet
                    .worksheet(&title)
                    .map(|worksheet| self.extractor.extract(worksheet));
                Harvested { title, data }
            })
            .collect())
    }

    fn apply(
        &self,
        teacher: &TeacherConfig,
        harvest: Result<Vec<Harvested>>,
        store: &mut dyn ProgressStore,
    ) -> Result<TeacherReport> {
        let worksheets = match harvest {
            Ok(worksheets) => worksheets,
            Err(e) if !e.is_per_teacher() => return Err(e),
            Err(e) => {
                let message = error_chain(&e);
                warn!("Error processing teacher {}: {}", teacher.full_name, message);
                let mut report = TeacherReport::new(teacher, TeacherStatus::Failed);
                report.error = Some(message);
                return Ok(report);
            }
        };

        if worksheets.is_empty() {
            info!("No valid worksheets found for teacher {}", teacher.full_name);
            return Ok(TeacherReport::new(teacher, TeacherStatus::NoValidWorksheets));
        }

        let mut report = TeacherReport::new(teacher, TeacherStatus::Processed);
        for harvested in worksheets {
            report
                .worksheets
                .push(self.apply_worksheet(teacher, harvested, store));
        }
        Ok(report)
    }

    fn apply_worksheet(
        &self,
        teacher: &TeacherConfig,
        harvested: Harvested,
        store: &mut dyn ProgressStore,
    ) -> WorksheetReport {
        let Harvested { title, data } = harvested;
        let data = match data {
            Ok(data) => data,
            Err(e) => {
                let message = error_chain(&e);
                warn!(
                    "Error reading worksheet '{}' of {}: {}",
                    title, teacher.full_name, message
                );
                let mut report = WorksheetReport::new(title, WorksheetStatus::Failed);
                report.error = Some(message);
                return report;
            }
        };

        if data.is_empty() {
            info!("No data extracted from worksheet '{}'", title);
            return WorksheetReport::new(title, WorksheetStatus::NoData);
        }

        let mut report = WorksheetReport::new(title, WorksheetStatus::Updated);
        let teacher_name = teacher.full_name.as_str();

        for record in &data.period_progress {
            match store.upsert_period_progress(teacher_name, &self.academic_year, record) {
                Ok(UpsertOutcome::Created) => report.counts.progress_created += 1,
                Ok(UpsertOutcome::Updated) => report.counts.progress_updated += 1,
                Err(e) => {
                    let message = format!(
                        "progress {} periodo {} paralelo {}: {}",
                        record.grade_level, record.periodo, record.paralelo, e
                    );
                    warn!("{}: {}", teacher_name, message);
                    report.lookup_errors.push(message);
                }
            }
        }

        for record in &data.topic_completion {
            match store.upsert_topic_completion(teacher_name, &self.academic_year, record) {
                Ok(UpsertOutcome::Created) => report.counts.topics_created += 1,
                Ok(UpsertOutcome::Updated) => report.counts.topics_updated += 1,
                Err(e) => {
                    let message = format!(
                        "topic '{}' {} periodo {} paralelo {}: {}",
                        record.tema_number, record.grade_level, record.periodo, record.paralelo, e
                    );
                    warn!("{}: {}", teacher_name, message);
                    report.lookup_errors.push(message);
                }
            }
        }

        info!(
            "Worksheet '{}': {} record(s) written, {} rejected",
            report.title,
            report.counts.total(),
            report.lookup_errors.len()
        );
        report
    }
}

/// An error and its sources on one line
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Paralelo;
    use crate::source::{MemoryClient, MemorySpreadsheet, MemoryWorksheet};
    use crate::store::{Catalog, MemoryStore};

    const YEAR: &str = "2025-2026";

    fn url(key: &str) -> String {
        format!("https://docs.google.com/spreadsheets/d/{}/edit", key)
    }

    fn teacher(name: &str, key: &str) -> TeacherConfig {
        TeacherConfig {
            full_name: name.to_string(),
            email: None,
            google_sheet_url: url(key),
            is_active: true,
            similarity_threshold: None,
        }
    }

    fn tracked_worksheet(title: &str, name: &str) -> MemoryWorksheet {
        MemoryWorksheet::new(title)
            .with_cell("E3", "DOCENTE")
            .unwrap()
            .with_cell("E4", name)
            .unwrap()
            .with_cell("A5", "1ER PERIODO")
            .unwrap()
            .with_cell("O6", "90%")
            .unwrap()
            .with_cell("P6", "85%")
            .unwrap()
            .with_cell("D7", "3")
            .unwrap()
            .with_cell("E7", "Fracciones")
            .unwrap()
            .with_cell("O7", "6/3/25")
            .unwrap()
    }

    fn client() -> MemoryClient {
        MemoryClient::new()
            .with_spreadsheet(
                "KEY1",
                MemorySpreadsheet::new("María López_Matemáticas")
                    .with_worksheet(tracked_worksheet("1S", "Lic. Maria Lopez"))
                    .with_worksheet(tracked_worksheet("2S", "Juan Perez")),
            )
            .with_spreadsheet(
                "KEY2",
                MemorySpreadsheet::new("Juan Perez_Lengua")
                    .with_worksheet(tracked_worksheet("2S", "Juan Pérez"))
                    .with_worksheet(
                        MemoryWorksheet::new("3S")
                            .with_cell("E3", "DOCENTE")
                            .unwrap()
                            .with_cell("E4", "Juan Perez")
                            .unwrap(),
                    ),
            )
            .with_spreadsheet(
                "KEY3",
                MemorySpreadsheet::new("Ana Ruiz")
                    .with_worksheet(tracked_worksheet("1S", "Pedro Ruiz Gomez")),
            )
    }

    fn store() -> MemoryStore {
        MemoryStore::new(Catalog::new(YEAR).with_grade_levels(["1S", "2S", "3S"]))
    }

    fn rows(store: &MemoryStore) -> Vec<(String, String, u32, Paralelo, f64)> {
        store
            .period_progress()
            .map(|r| {
                (
                    r.teacher.clone(),
                    r.grade_level.clone(),
                    r.periodo,
                    r.paralelo,
                    r.progress_percentage,
                )
            })
            .collect()
    }

    #[test]
    fn test_run_creates_then_updates() {
        let client = client();
        let teachers = vec![teacher("María López", "KEY1"), teacher("Juan Pérez", "KEY2")];
        let orchestrator = UpdateOrchestrator::new(&client, YEAR);
        let mut store = store();

        let report = orchestrator.run(&teachers, &mut store).unwrap();
        assert_eq!(report.teachers.len(), 2);
        assert!(!report.has_failures());

        let maria = &report.teachers[0];
        assert_eq!(maria.status, TeacherStatus::Processed);
        assert_eq!(maria.worksheets.len(), 1);
        assert_eq!(maria.worksheets[0].title, "1S");
        assert_eq!(
            maria.counts(),
            UpsertCounts {
                progress_created: 2,
                topics_created: 1,
                ..Default::default()
            }
        );

        let juan = &report.teachers[1];
        let statuses: Vec<_> = juan.worksheets.iter().map(|w| w.status).collect();
        assert_eq!(statuses, vec![WorksheetStatus::Updated, WorksheetStatus::NoData]);

        assert_eq!(store.period_progress().count(), 4);
        assert_eq!(store.topic_completion().count(), 2);

        let again = orchestrator.run(&teachers, &mut store).unwrap();
        assert_eq!(
            again.counts(),
            UpsertCounts {
                progress_updated: 4,
                topics_updated: 2,
                ..Default::default()
            }
        );
        assert_eq!(store.period_progress().count(), 4);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let client = client();
        let teachers = vec![
            teacher("María López", "KEY1"),
            teacher("Ana Ruiz", "KEY3"),
            teacher("Juan Pérez", "KEY2"),
        ];

        let mut sequential = store();
        UpdateOrchestrator::new(&client, YEAR)
            .run(&teachers, &mut sequential)
            .unwrap();

        let mut parallel = store();
        let report = UpdateOrchestrator::new(&client, YEAR)
            .parallel(true)
            .run(&teachers, &mut parallel)
            .unwrap();

        assert_eq!(rows(&sequential), rows(&parallel));
        let names: Vec<_> = report.teachers.iter().map(|t| t.teacher.as_str()).collect();
        assert_eq!(names, vec!["María López", "Ana Ruiz", "Juan Pérez"]);
        assert_eq!(report.teachers[1].status, TeacherStatus::NoValidWorksheets);
    }

    #[test]
    fn test_teacher_failures_do_not_stop_the_run() {
        let client = client();
        let mut broken_url = teacher("Sin Hoja", "KEY1");
        broken_url.google_sheet_url = "https://example.com/sheet".to_string();
        let mut inactive = teacher("Inactiva", "KEY2");
        inactive.is_active = false;
        let teachers = vec![
            broken_url,
            teacher("Perdido", "MISSING"),
            inactive,
            teacher("María López", "KEY1"),
        ];

        let mut store = store();
        let report = UpdateOrchestrator::new(&client, YEAR)
            .run(&teachers, &mut store)
            .unwrap();

        assert_eq!(report.teachers.len(), 3);
        assert_eq!(report.failed_teachers(), 2);
        assert!(report.has_failures());
        assert!(
            report.teachers[0]
                .error
                .as_deref()
                .unwrap()
                .contains("example.com")
        );
        assert_eq!(report.teachers[2].status, TeacherStatus::Processed);
        assert_eq!(store.period_progress().count(), 2);
    }

    #[test]
    fn test_lookup_errors_are_reported() {
        let client = client();
        let teachers = vec![teacher("María López", "KEY1")];
        let mut store = MemoryStore::new(Catalog {
            paralelos: [Paralelo::A].into_iter().collect(),
            ..Catalog::new(YEAR).with_grade_levels(["1S"])
        });

        let report = UpdateOrchestrator::new(&client, YEAR)
            .run(&teachers, &mut store)
            .unwrap();
        let worksheet = &report.teachers[0].worksheets[0];
        assert_eq!(worksheet.counts.progress_created, 1);
        assert_eq!(worksheet.counts.topics_created, 1);
        assert_eq!(worksheet.lookup_errors.len(), 1);
        assert!(worksheet.lookup_errors[0].contains("paralelo B"));
        assert_eq!(report.lookup_errors(), 1);
        assert!(!report.has_failures());
    }

    struct OfflineScorer;

    impl SimilarityScorer for OfflineScorer {
        fn name(&self) -> &str {
            "offline"
        }

        fn score(&self, _a: &str, _b: &str) -> Result<u8> {
            Err(Error::MatchingUnavailable("offline".to_string()))
        }
    }

    #[test]
    fn test_unavailable_matching_aborts() {
        let client = client();
        let teachers = vec![teacher("María López", "KEY1"), teacher("Juan Pérez", "KEY2")];
        let mut store = store();

        for parallel in [false, true] {
            let err = UpdateOrchestrator::new(&client, YEAR)
                .with_scorer(Box::new(OfflineScorer))
                .parallel(parallel)
                .run(&teachers, &mut store)
                .unwrap_err();
            assert!(matches!(err, Error::MatchingUnavailable(_)));
        }
        assert_eq!(store.period_progress().count(), 0);
    }

    #[test]
    fn test_missing_academic_year() {
        let client = client();
        let err = UpdateOrchestrator::new(&client, " ")
            .run(&[teacher("María López", "KEY1")], &mut store())
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_config() {
        let client = client();
        let mut config = TrackerConfig::default();
        config.catalog = Catalog::new(YEAR).with_grade_levels(["1S", "2S"]);
        config.teachers = vec![teacher("María López", "KEY1")];
        config.validation.scorer = "token_sort".to_string();
        config.extraction.range = "A3:R6".to_string();

        let orchestrator = UpdateOrchestrator::from_config(&config, &client).unwrap();
        let mut store = MemoryStore::new(config.catalog.clone());
        let report = orchestrator.run(&config.teachers, &mut store).unwrap();
        // Topic row 7 lies outside the configured window
        assert_eq!(
            report.counts(),
            UpsertCounts {
                progress_created: 2,
                ..Default::default()
            }
        );

        config.validation.scorer = "soundex".to_string();
        assert!(matches!(
            UpdateOrchestrator::from_config(&config, &client),
            Err(Error::MatchingUnavailable(_))
        ));
    }

    #[test]
    fn test_error_chain() {
        let err = Error::Worksheet {
            key: "KEY1".to_string(),
            source: Box::new(Error::NotFound("worksheet 2S".to_string())),
        };
        assert_eq!(
            error_chain(&err),
            "error processing worksheets in sheet KEY1: not found: worksheet 2S"
        );
    }
}
