//! Record sources feeding the engine. The engine itself never performs I/O;
//! callers pick a source, load a [`RecordSet`] and hand its slices over.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::models::{
    AssignmentRecord, AttendanceMark, LessonOccurrence, Student, SubmissionRecord,
    SurveyAnswerRecord, SurveyQuestion, SurveyResponse,
};
use crate::scope::Scope;

#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub students: Vec<Student>,
    pub lessons: Vec<LessonOccurrence>,
    pub marks: Vec<AttendanceMark>,
    pub assignments: Vec<AssignmentRecord>,
    pub submissions: Vec<SubmissionRecord>,
    pub questions: Vec<SurveyQuestion>,
    pub responses: Vec<SurveyResponse>,
    pub answers: Vec<SurveyAnswerRecord>,
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Loads every record relevant to `scope`. Sources may return more than
    /// the scope asks for; the engine filters again.
    async fn load(&self, scope: &Scope) -> anyhow::Result<RecordSet>;
}

/// Reads a directory of CSV exports, one file per record kind. Missing files
/// load as empty sets.
pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read<T: DeserializeOwned>(&self, file_name: &str) -> anyhow::Result<Vec<T>> {
        let path = self.dir.join(file_name);
        if !path.exists() {
            debug!(path = %path.display(), "csv file missing, treating as empty");
            return Ok(Vec::new());
        }
        read_csv(&path)
    }
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<T>().enumerate() {
        // Header is line 1.
        let row = result.with_context(|| format!("{} line {}", path.display(), index + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

#[async_trait]
impl RecordSource for CsvSource {
    async fn load(&self, _scope: &Scope) -> anyhow::Result<RecordSet> {
        let records = RecordSet {
            students: self.read("students.csv")?,
            lessons: self.read("lessons.csv")?,
            marks: self.read("attendance.csv")?,
            assignments: self.read("assignments.csv")?,
            submissions: self.read("submissions.csv")?,
            questions: self.read("questions.csv")?,
            responses: self.read("responses.csv")?,
            answers: self.read("answers.csv")?,
        };
        info!(
            dir = %self.dir.display(),
            students = records.students.len(),
            lessons = records.lessons.len(),
            marks = records.marks.len(),
            submissions = records.submissions.len(),
            answers = records.answers.len(),
            "csv records loaded"
        );
        Ok(records)
    }
}
