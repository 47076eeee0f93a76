use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::{
    AssignmentRecord, AttendanceMark, LessonOccurrence, Student, SubmissionRecord,
    SurveyAnswerRecord, SurveyQuestion, SurveyResponse,
};
use crate::scope::Scope;
use crate::source::{RecordSet, RecordSource};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed record source. Filtering by scope happens in SQL so only
/// the relevant slice crosses the wire.
pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSource for PgSource {
    async fn load(&self, scope: &Scope) -> anyhow::Result<RecordSet> {
        let records = RecordSet {
            students: fetch_students(&self.pool, scope).await?,
            lessons: fetch_lessons(&self.pool, scope).await?,
            marks: fetch_marks(&self.pool, scope).await?,
            assignments: fetch_assignments(&self.pool, scope).await?,
            submissions: fetch_submissions(&self.pool, scope).await?,
            questions: fetch_questions(&self.pool).await?,
            responses: fetch_responses(&self.pool, scope).await?,
            answers: fetch_answers(&self.pool, scope).await?,
        };
        info!(
            students = records.students.len(),
            lessons = records.lessons.len(),
            marks = records.marks.len(),
            submissions = records.submissions.len(),
            answers = records.answers.len(),
            "postgres records loaded"
        );
        Ok(records)
    }
}

/// Students of groups that hold at least one in-scope lesson or assignment.
pub async fn fetch_students(pool: &PgPool, scope: &Scope) -> anyhow::Result<Vec<Student>> {
    let query = format!(
        "SELECT st.id, st.full_name, st.group_id \
         FROM academic.students st \
         WHERE ($1::text IS NULL OR st.group_id = $1) \
         AND (EXISTS (SELECT 1 FROM academic.lessons l \
                      WHERE l.group_id = st.group_id AND {LESSON_FILTER}) \
              OR EXISTS (SELECT 1 FROM academic.assignments a \
                         WHERE a.group_id = st.group_id AND {ASSIGNMENT_FILTER})) \
         ORDER BY st.full_name"
    );
    let rows = sqlx::query(&query)
        .bind(scope.group_id.as_deref())
        .bind(scope.subject_id.as_deref())
        .bind(scope.teacher_id.as_deref())
        .bind(scope.since)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| Student {
            id: row.get("id"),
            full_name: row.get("full_name"),
            group_id: row.get("group_id"),
        })
        .collect())
}

const LESSON_FILTER: &str = "($1::text IS NULL OR l.group_id = $1) \
     AND ($2::text IS NULL OR l.subject_id = $2) \
     AND ($3::text IS NULL OR l.teacher_id = $3) \
     AND ($4::date IS NULL OR l.date >= $4)";

fn lesson_from_row(row: &PgRow) -> LessonOccurrence {
    LessonOccurrence {
        id: row.get("id"),
        group_id: row.get("group_id"),
        subject_id: row.get("subject_id"),
        teacher_id: row.get("teacher_id"),
        date: row.get("date"),
    }
}

pub async fn fetch_lessons(pool: &PgPool, scope: &Scope) -> anyhow::Result<Vec<LessonOccurrence>> {
    let query = format!(
        "SELECT l.id, l.group_id, l.subject_id, l.teacher_id, l.date \
         FROM academic.lessons l WHERE {LESSON_FILTER} ORDER BY l.date"
    );
    let rows = sqlx::query(&query)
        .bind(scope.group_id.as_deref())
        .bind(scope.subject_id.as_deref())
        .bind(scope.teacher_id.as_deref())
        .bind(scope.since)
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(lesson_from_row).collect())
}

pub async fn fetch_marks(pool: &PgPool, scope: &Scope) -> anyhow::Result<Vec<AttendanceMark>> {
    let query = format!(
        "SELECT m.lesson_id, m.student_id, m.present \
         FROM academic.attendance_marks m \
         JOIN academic.lessons l ON l.id = m.lesson_id \
         WHERE {LESSON_FILTER}"
    );
    let rows = sqlx::query(&query)
        .bind(scope.group_id.as_deref())
        .bind(scope.subject_id.as_deref())
        .bind(scope.teacher_id.as_deref())
        .bind(scope.since)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| AttendanceMark {
            lesson_id: row.get("lesson_id"),
            student_id: row.get("student_id"),
            present: row.get("present"),
        })
        .collect())
}

const ASSIGNMENT_FILTER: &str = "($1::text IS NULL OR a.group_id = $1) \
     AND ($2::text IS NULL OR a.subject_id = $2) \
     AND ($3::text IS NULL OR a.teacher_id = $3)";

pub async fn fetch_assignments(
    pool: &PgPool,
    scope: &Scope,
) -> anyhow::Result<Vec<AssignmentRecord>> {
    let query = format!(
        "SELECT a.id, a.title, a.subject_id, a.group_id, a.teacher_id, a.max_score, a.is_active \
         FROM academic.assignments a WHERE {ASSIGNMENT_FILTER}"
    );
    let rows = sqlx::query(&query)
        .bind(scope.group_id.as_deref())
        .bind(scope.subject_id.as_deref())
        .bind(scope.teacher_id.as_deref())
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| AssignmentRecord {
            id: row.get("id"),
            title: row.get("title"),
            subject_id: row.get("subject_id"),
            group_id: row.get("group_id"),
            teacher_id: row.get("teacher_id"),
            max_score: row.get("max_score"),
            is_active: row.get("is_active"),
        })
        .collect())
}

pub async fn fetch_submissions(
    pool: &PgPool,
    scope: &Scope,
) -> anyhow::Result<Vec<SubmissionRecord>> {
    let query = format!(
        "SELECT s.assignment_id, s.student_id, s.score, s.is_checked, s.checked_at \
         FROM academic.submissions s \
         JOIN academic.assignments a ON a.id = s.assignment_id \
         WHERE {ASSIGNMENT_FILTER}"
    );
    let rows = sqlx::query(&query)
        .bind(scope.group_id.as_deref())
        .bind(scope.subject_id.as_deref())
        .bind(scope.teacher_id.as_deref())
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| SubmissionRecord {
            assignment_id: row.get("assignment_id"),
            student_id: row.get("student_id"),
            score: row.get("score"),
            is_checked: row.get("is_checked"),
            checked_at: row.get("checked_at"),
        })
        .collect())
}

pub async fn fetch_questions(pool: &PgPool) -> anyhow::Result<Vec<SurveyQuestion>> {
    let rows = sqlx::query(
        "SELECT id, text, sort_order FROM academic.survey_questions ORDER BY sort_order",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| SurveyQuestion {
            id: row.get("id"),
            text: row.get("text"),
            order: row.get("sort_order"),
        })
        .collect())
}

const RESPONSE_FILTER: &str = "($1::text IS NULL OR r.subject_id = $1) \
     AND ($2::text IS NULL OR r.teacher_id = $2) \
     AND ($3::text IS NULL OR r.period_id = $3) \
     AND ($4::text IS NULL OR EXISTS (SELECT 1 FROM academic.students st \
                                      WHERE st.id = r.student_id AND st.group_id = $4))";

pub async fn fetch_responses(pool: &PgPool, scope: &Scope) -> anyhow::Result<Vec<SurveyResponse>> {
    let query = format!(
        "SELECT r.id, r.student_id, r.teacher_id, r.subject_id, r.period_id \
         FROM academic.survey_responses r WHERE {RESPONSE_FILTER}"
    );
    let rows = sqlx::query(&query)
        .bind(scope.subject_id.as_deref())
        .bind(scope.teacher_id.as_deref())
        .bind(scope.period_id.as_deref())
        .bind(scope.group_id.as_deref())
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| SurveyResponse {
            id: row.get("id"),
            student_id: row.get("student_id"),
            teacher_id: row.get("teacher_id"),
            subject_id: row.get("subject_id"),
            period_id: row.get("period_id"),
        })
        .collect())
}

pub async fn fetch_answers(
    pool: &PgPool,
    scope: &Scope,
) -> anyhow::Result<Vec<SurveyAnswerRecord>> {
    let query = format!(
        "SELECT a.response_id, a.question_id, a.value \
         FROM academic.survey_answers a \
         JOIN academic.survey_responses r ON r.id = a.response_id \
         WHERE {RESPONSE_FILTER}"
    );
    let rows = sqlx::query(&query)
        .bind(scope.subject_id.as_deref())
        .bind(scope.teacher_id.as_deref())
        .bind(scope.period_id.as_deref())
        .bind(scope.group_id.as_deref())
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| SurveyAnswerRecord {
            response_id: row.get("response_id"),
            question_id: row.get("question_id"),
            value: row.get("value"),
        })
        .collect())
}
