use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::error::{Result, ValidationError};
use crate::grade::{classify, normalize};
use crate::models::{AssignmentRecord, FinalGradeView, Student, SubmissionRecord};
use crate::scope::Scope;

fn in_scope_assignments<'a>(
    assignments: &'a [AssignmentRecord],
    scope: &Scope,
) -> Result<HashMap<&'a str, &'a AssignmentRecord>> {
    let mut by_id = HashMap::new();
    for assignment in assignments.iter().filter(|a| scope.matches_assignment(a)) {
        if !assignment.max_score.is_finite() || assignment.max_score <= 0.0 {
            return Err(ValidationError::InvalidMaxScore {
                assignment_id: assignment.id.clone(),
                max_score: assignment.max_score,
            });
        }
        by_id.insert(assignment.id.as_str(), assignment);
    }
    Ok(by_id)
}

fn validated_score(submission: &SubmissionRecord, assignment: &AssignmentRecord) -> Result<f64> {
    let score = submission.score.ok_or_else(|| ValidationError::MissingScore {
        assignment_id: submission.assignment_id.clone(),
        student_id: submission.student_id.clone(),
    })?;
    if !score.is_finite() || score < 0.0 || score > assignment.max_score {
        return Err(ValidationError::ScoreOutOfRange {
            assignment_id: submission.assignment_id.clone(),
            student_id: submission.student_id.clone(),
            score,
            max_score: assignment.max_score,
        });
    }
    Ok(score)
}

fn final_grade(
    submissions: &[SubmissionRecord],
    assignments: &HashMap<&str, &AssignmentRecord>,
    student_id: &str,
) -> Result<FinalGradeView> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    let mut pending_count = 0usize;

    for submission in submissions.iter().filter(|s| s.student_id == student_id) {
        let Some(assignment) = assignments.get(submission.assignment_id.as_str()) else {
            debug!(
                assignment_id = %submission.assignment_id,
                student_id,
                "submission without an in-scope assignment skipped"
            );
            continue;
        };
        if !submission.is_checked {
            pending_count += 1;
            continue;
        }
        if !seen.insert(submission.assignment_id.as_str()) {
            return Err(ValidationError::DuplicateSubmission {
                assignment_id: submission.assignment_id.clone(),
                student_id: student_id.to_string(),
            });
        }
        let score = validated_score(submission, assignment)?;
        normalized.push(normalize(score, assignment.max_score));
    }

    let total_score = if normalized.is_empty() {
        0.0
    } else {
        normalized.iter().sum::<f64>() / normalized.len() as f64
    };

    Ok(FinalGradeView {
        student_id: student_id.to_string(),
        total_score,
        letter_grade: classify(total_score),
        graded_count: normalized.len(),
        pending_count,
    })
}

/// Mean of the student's checked, normalized submission scores for the
/// assignments in scope, classified into a letter grade. Unchecked
/// submissions are pending, not zero; no checked work yields a total of 0.
pub fn compute_final_score(
    submissions: &[SubmissionRecord],
    assignments: &[AssignmentRecord],
    student_id: &str,
    scope: &Scope,
) -> Result<FinalGradeView> {
    let by_id = in_scope_assignments(assignments, scope)?;
    final_grade(submissions, &by_id, student_id)
}

/// Final grades for every student in scope: roster students whose group has
/// at least one in-scope assignment, in roster order, followed by students
/// missing from the roster who hold a submission on an in-scope assignment,
/// ordered by id.
pub fn compute_final_scores(
    submissions: &[SubmissionRecord],
    assignments: &[AssignmentRecord],
    roster: &[Student],
    scope: &Scope,
) -> Result<Vec<FinalGradeView>> {
    let by_id = in_scope_assignments(assignments, scope)?;
    let groups: HashSet<&str> = by_id.values().map(|a| a.group_id.as_str()).collect();

    let mut student_ids: Vec<&str> = roster
        .iter()
        .filter(|student| {
            scope.matches_student(student) && groups.contains(student.group_id.as_str())
        })
        .map(|student| student.id.as_str())
        .collect();

    let on_roster: HashSet<&str> = roster.iter().map(|student| student.id.as_str()).collect();
    let extra: BTreeSet<&str> = submissions
        .iter()
        .filter(|s| by_id.contains_key(s.assignment_id.as_str()))
        .map(|s| s.student_id.as_str())
        .filter(|id| !on_roster.contains(id))
        .collect();
    student_ids.extend(extra);

    student_ids
        .into_iter()
        .map(|student_id| final_grade(submissions, &by_id, student_id))
        .collect()
}
