use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{AssignmentRecord, LessonOccurrence, Student, SurveyResponse};

/// Filter describing which records belong to one computation. `None` on a
/// field means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Scope {
    pub group_id: Option<String>,
    pub subject_id: Option<String>,
    pub teacher_id: Option<String>,
    pub period_id: Option<String>,
    pub since: Option<NaiveDate>,
}

fn matches(filter: &Option<String>, value: &str) -> bool {
    filter.as_deref().map_or(true, |wanted| wanted == value)
}

impl Scope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches_lesson(&self, lesson: &LessonOccurrence) -> bool {
        matches(&self.group_id, &lesson.group_id)
            && matches(&self.subject_id, &lesson.subject_id)
            && matches(&self.teacher_id, &lesson.teacher_id)
            && self.since.map_or(true, |since| lesson.date >= since)
    }

    pub fn matches_assignment(&self, assignment: &AssignmentRecord) -> bool {
        matches(&self.group_id, &assignment.group_id)
            && matches(&self.subject_id, &assignment.subject_id)
            && matches(&self.teacher_id, &assignment.teacher_id)
    }

    pub fn matches_response(&self, response: &SurveyResponse) -> bool {
        matches(&self.subject_id, &response.subject_id)
            && matches(&self.teacher_id, &response.teacher_id)
            && matches(&self.period_id, &response.period_id)
    }

    pub fn matches_student(&self, student: &Student) -> bool {
        matches(&self.group_id, &student.group_id)
    }

    pub fn label(&self) -> String {
        let mut parts = Vec::new();
        if let Some(group) = &self.group_id {
            parts.push(format!("group {group}"));
        }
        if let Some(subject) = &self.subject_id {
            parts.push(format!("subject {subject}"));
        }
        if let Some(teacher) = &self.teacher_id {
            parts.push(format!("teacher {teacher}"));
        }
        if let Some(period) = &self.period_id {
            parts.push(format!("period {period}"));
        }
        if parts.is_empty() {
            "all records".to_string()
        } else {
            parts.join(", ")
        }
    }
}

pub fn cutoff_date(since_days: i64) -> NaiveDate {
    Utc::now().date_naive() - Duration::days(since_days.max(1))
}
