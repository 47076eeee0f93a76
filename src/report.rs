use std::collections::BTreeMap;
use std::fmt::Write;

use crate::assignments::compute_final_scores;
use crate::attendance::{aggregate_attendance, aggregate_by_group, lesson_attendance};
use crate::distribution::summarize;
use crate::error::Result;
use crate::grade::{display_round, LetterGrade};
use crate::models::FinalGradeView;
use crate::ratings::aggregate_ratings;
use crate::scope::Scope;
use crate::source::RecordSet;

pub fn grade_mix(grades: &[FinalGradeView]) -> BTreeMap<LetterGrade, usize> {
    let mut mix = BTreeMap::new();
    for view in grades {
        *mix.entry(view.letter_grade).or_insert(0) += 1;
    }
    mix
}

/// Renders a markdown report of attendance, final grades and teacher
/// ratings for one scope.
pub fn build_report(scope: &Scope, records: &RecordSet) -> Result<String> {
    let cohort = aggregate_attendance(&records.marks, &records.lessons, &records.students, scope)?;
    let groups = aggregate_by_group(&records.marks, &records.lessons, &records.students, scope)?;
    let distribution = summarize(&cohort.stats);
    let grades = compute_final_scores(
        &records.submissions,
        &records.assignments,
        &records.students,
        scope,
    )?;
    let ratings = aggregate_ratings(
        &records.responses,
        &records.answers,
        &records.questions,
        &records.students,
        scope,
    )?;

    let names: BTreeMap<&str, &str> = records
        .students
        .iter()
        .map(|s| (s.id.as_str(), s.full_name.as_str()))
        .collect();

    let mut output = String::new();

    let _ = writeln!(output, "# Academic Performance Report");
    let _ = writeln!(output, "Generated for {}", scope.label());
    if let Some(since) = scope.since {
        let _ = writeln!(output, "Lessons since {since}");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance Distribution");

    if distribution.total_students == 0 {
        let _ = writeln!(output, "No students in this scope.");
    } else {
        let _ = writeln!(
            output,
            "Average attendance {}% across {} students ({} of {} recorded lessons missed)",
            display_round(distribution.average_attendance),
            distribution.total_students,
            distribution.total_missed,
            distribution.total_lessons
        );
        for share in &distribution.buckets {
            let _ = writeln!(
                output,
                "- {}: {} students ({}%)",
                share.bucket,
                share.count,
                display_round(share.percentage)
            );
        }
    }

    if groups.len() > 1 {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Attendance by Group");
        for group in &groups {
            let _ = writeln!(
                output,
                "- {}: {}% across {} students",
                group.group_id,
                display_round(group.average_attendance),
                group.student_count
            );
        }
    }

    let mut lowest = cohort.stats.clone();
    lowest.sort_by(|a, b| a.attendance_rate.total_cmp(&b.attendance_rate));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Lowest Attendance");

    if lowest.is_empty() {
        let _ = writeln!(output, "No attendance recorded for this scope.");
    } else {
        for stat in lowest.iter().take(10) {
            let _ = writeln!(
                output,
                "- {}: {}% ({} of {} lessons attended)",
                stat.student_name,
                display_round(stat.attendance_rate),
                stat.attended_lessons,
                stat.total_lessons
            );
        }
    }

    let lessons = lesson_attendance(&records.marks, &records.lessons, scope);
    if !lessons.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Lessons");
        for lesson in &lessons {
            let _ = writeln!(
                output,
                "- {} ({}): {} of {} recorded present",
                lesson.date, lesson.lesson_id, lesson.present, lesson.recorded
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Final Grades");

    if grades.is_empty() {
        let _ = writeln!(output, "No students in this scope.");
    } else {
        for (grade, count) in grade_mix(&grades).iter().rev() {
            let _ = writeln!(output, "- {grade}: {count} students");
        }
        let _ = writeln!(output);
        for view in &grades {
            let name = names.get(view.student_id.as_str()).copied().unwrap_or(view.student_id.as_str());
            let _ = writeln!(
                output,
                "- {}: {:.1} ({}), {} graded, {} pending",
                name, view.total_score, view.letter_grade, view.graded_count, view.pending_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Teacher Ratings");

    if ratings.is_empty() {
        let _ = writeln!(output, "No survey responses for this scope.");
    } else {
        for rating in &ratings {
            let _ = writeln!(
                output,
                "- {} / {}: {:.1} of 10 from {} responses",
                rating.teacher_id, rating.subject_id, rating.average_rating, rating.total_responses
            );
            for question in &rating.question_ratings {
                let _ = writeln!(
                    output,
                    "  - {}: {:.1} ({} answers)",
                    question.text, question.average, question.answer_count
                );
            }
        }
    }

    Ok(output)
}
