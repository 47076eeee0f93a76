use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::attendance::AttendanceBucket;
use crate::grade::LetterGrade;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub full_name: String,
    pub group_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonOccurrence {
    pub id: String,
    pub group_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub date: NaiveDate,
}

/// A recorded presence mark. A lesson without a mark for a student means
/// "not yet recorded", never "absent".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceMark {
    pub lesson_id: String,
    pub student_id: String,
    pub present: bool,
}

fn default_max_score() -> f64 {
    100.0
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub subject_id: String,
    pub group_id: String,
    pub teacher_id: String,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub assignment_id: String,
    pub student_id: String,
    pub score: Option<f64>,
    pub is_checked: bool,
    pub checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: String,
    pub student_id: String,
    pub teacher_id: String,
    pub subject_id: String,
    pub period_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyAnswerRecord {
    pub response_id: String,
    pub question_id: String,
    pub value: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceStat {
    pub student_id: String,
    pub student_name: String,
    pub total_lessons: usize,
    pub attended_lessons: usize,
    pub missed_lessons: usize,
    pub attendance_rate: f64,
    pub bucket: AttendanceBucket,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceCohort {
    pub stats: Vec<AttendanceStat>,
    pub average_attendance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupAttendance {
    pub group_id: String,
    pub student_count: usize,
    pub average_attendance: f64,
    pub stats: Vec<AttendanceStat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonAttendance {
    pub lesson_id: String,
    pub date: NaiveDate,
    pub recorded: usize,
    pub present: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalGradeView {
    pub student_id: String,
    pub total_score: f64,
    pub letter_grade: LetterGrade,
    pub graded_count: usize,
    pub pending_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionRating {
    pub question_id: String,
    pub text: String,
    pub average: f64,
    pub answer_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeacherRatingView {
    pub teacher_id: String,
    pub subject_id: String,
    pub total_responses: usize,
    pub average_rating: f64,
    pub question_ratings: Vec<QuestionRating>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketShare {
    pub bucket: AttendanceBucket,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionSummary {
    pub total_students: usize,
    pub buckets: Vec<BucketShare>,
    pub total_missed: usize,
    pub total_lessons: usize,
    pub average_attendance: f64,
}
