//! Records produced by grid extraction

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parallel section of a grade level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Paralelo {
    A,
    B,
    C,
    D,
}

impl Paralelo {
    pub const ALL: [Paralelo; 4] = [Paralelo::A, Paralelo::B, Paralelo::C, Paralelo::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            Paralelo::A => "A",
            Paralelo::B => "B",
            Paralelo::C => "C",
            Paralelo::D => "D",
        }
    }
}

impl fmt::Display for Paralelo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Paralelo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Paralelo::A),
            "B" => Ok(Paralelo::B),
            "C" => Ok(Paralelo::C),
            "D" => Ok(Paralelo::D),
            other => Err(format!("unknown paralelo '{}'", other)),
        }
    }
}

/// Completion percentage of one period for one parallel section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodProgressRecord {
    pub grade_level: String,
    pub periodo: u32,
    pub paralelo: Paralelo,
    pub progress_percentage: f64,
}

impl PeriodProgressRecord {
    pub fn key(&self) -> PeriodKey {
        PeriodKey {
            grade_level: self.grade_level.clone(),
            periodo: self.periodo,
            paralelo: self.paralelo,
        }
    }
}

/// A topic finished by one parallel section on a given date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCompletionRecord {
    pub grade_level: String,
    pub periodo: u32,
    pub paralelo: Paralelo,
    /// Topic code from column D, possibly blank
    pub tema_number: String,
    pub tema_title: String,
    pub completion_date: NaiveDate,
}

impl TopicCompletionRecord {
    /// The title is not part of the key
    pub fn key(&self) -> TopicKey {
        TopicKey {
            period: PeriodKey {
                grade_level: self.grade_level.clone(),
                periodo: self.periodo,
                paralelo: self.paralelo,
            },
            tema_number: self.tema_number.clone(),
        }
    }
}

/// Natural key of a period progress record within one worksheet scan
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    pub grade_level: String,
    pub periodo: u32,
    pub paralelo: Paralelo,
}

/// Natural key of a topic completion record within one worksheet scan
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicKey {
    pub period: PeriodKey,
    pub tema_number: String,
}

/// Everything extracted from one worksheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub period_progress: Vec<PeriodProgressRecord>,
    pub topic_completion: Vec<TopicCompletionRecord>,
}

impl ExtractedData {
    pub fn is_empty(&self) -> bool {
        self.period_progress.is_empty() && self.topic_completion.is_empty()
    }

    pub fn len(&self) -> usize {
        self.period_progress.len() + self.topic_completion.len()
    }
}
