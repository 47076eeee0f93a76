use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, ValidationError};
use crate::models::{
    AttendanceCohort, AttendanceMark, AttendanceStat, GroupAttendance, LessonAttendance,
    LessonOccurrence, Student,
};
use crate::scope::Scope;

/// Attendance bands. These thresholds are separate from the letter-grade
/// bands in [`crate::grade`] and must stay that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceBucket {
    Poor,
    Satisfactory,
    Good,
    Excellent,
}

impl AttendanceBucket {
    pub const ALL: [AttendanceBucket; 4] = [
        AttendanceBucket::Excellent,
        AttendanceBucket::Good,
        AttendanceBucket::Satisfactory,
        AttendanceBucket::Poor,
    ];

    pub fn from_rate(rate: f64) -> Self {
        match rate {
            r if r >= 90.0 => AttendanceBucket::Excellent,
            r if r >= 75.0 => AttendanceBucket::Good,
            r if r >= 60.0 => AttendanceBucket::Satisfactory,
            _ => AttendanceBucket::Poor,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttendanceBucket::Excellent => "excellent (>=90%)",
            AttendanceBucket::Good => "good (75-90%)",
            AttendanceBucket::Satisfactory => "satisfactory (60-75%)",
            AttendanceBucket::Poor => "poor (<60%)",
        }
    }
}

impl fmt::Display for AttendanceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn attendance_rate(attended: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        attended as f64 / total as f64 * 100.0
    }
}

pub fn mean_rate(stats: &[AttendanceStat]) -> f64 {
    if stats.is_empty() {
        0.0
    } else {
        stats.iter().map(|s| s.attendance_rate).sum::<f64>() / stats.len() as f64
    }
}

/// Reduces presence marks into one [`AttendanceStat`] per student in scope.
///
/// Students come from the roster, limited to groups that have at least one
/// in-scope lesson, plus anyone holding a mark on an in-scope lesson. Only
/// recorded marks count toward a student's total; an enrolled student with no
/// marks gets rate 0 and still enters the cohort average.
pub fn aggregate_attendance(
    marks: &[AttendanceMark],
    lessons: &[LessonOccurrence],
    roster: &[Student],
    scope: &Scope,
) -> Result<AttendanceCohort> {
    let in_scope: HashSet<&str> = lessons
        .iter()
        .filter(|lesson| scope.matches_lesson(lesson))
        .map(|lesson| lesson.id.as_str())
        .collect();
    let groups = lesson_groups(lessons, scope);

    let mut seen = HashSet::new();
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut skipped = 0usize;
    for mark in marks {
        if !in_scope.contains(mark.lesson_id.as_str()) {
            skipped += 1;
            continue;
        }
        if !seen.insert((mark.lesson_id.as_str(), mark.student_id.as_str())) {
            return Err(ValidationError::DuplicateMark {
                lesson_id: mark.lesson_id.clone(),
                student_id: mark.student_id.clone(),
            });
        }
        let entry = counts.entry(mark.student_id.as_str()).or_insert((0, 0));
        entry.0 += 1;
        if mark.present {
            entry.1 += 1;
        }
    }
    if skipped > 0 {
        debug!(skipped, "attendance marks outside scope or without a known lesson");
    }

    let mut names: HashMap<&str, &str> = roster
        .iter()
        .filter(|student| {
            scope.matches_student(student) && groups.contains(student.group_id.as_str())
        })
        .map(|student| (student.id.as_str(), student.full_name.as_str()))
        .collect();
    for &student_id in counts.keys() {
        names.entry(student_id).or_insert(student_id);
    }

    let mut stats: Vec<AttendanceStat> = names
        .into_iter()
        .map(|(student_id, name)| {
            let (total, attended) = counts.get(student_id).copied().unwrap_or((0, 0));
            let rate = attendance_rate(attended, total);
            AttendanceStat {
                student_id: student_id.to_string(),
                student_name: name.to_string(),
                total_lessons: total,
                attended_lessons: attended,
                missed_lessons: total - attended,
                attendance_rate: rate,
                bucket: AttendanceBucket::from_rate(rate),
            }
        })
        .collect();
    stats.sort_by(|a, b| {
        a.student_name
            .cmp(&b.student_name)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });

    let average_attendance = mean_rate(&stats);
    info!(
        students = stats.len(),
        lessons = in_scope.len(),
        average_attendance,
        "attendance aggregated"
    );

    Ok(AttendanceCohort {
        stats,
        average_attendance,
    })
}

/// Groups holding at least one in-scope lesson.
fn lesson_groups<'a>(lessons: &'a [LessonOccurrence], scope: &Scope) -> BTreeSet<&'a str> {
    lessons
        .iter()
        .filter(|lesson| scope.matches_lesson(lesson))
        .map(|lesson| lesson.group_id.as_str())
        .collect()
}

/// Splits the cohort by group and aggregates each group separately.
pub fn aggregate_by_group(
    marks: &[AttendanceMark],
    lessons: &[LessonOccurrence],
    roster: &[Student],
    scope: &Scope,
) -> Result<Vec<GroupAttendance>> {
    lesson_groups(lessons, scope)
        .into_iter()
        .map(|group_id| {
            let group_scope = Scope {
                group_id: Some(group_id.to_string()),
                ..scope.clone()
            };
            let cohort = aggregate_attendance(marks, lessons, roster, &group_scope)?;
            Ok(GroupAttendance {
                group_id: group_id.to_string(),
                student_count: cohort.stats.len(),
                average_attendance: cohort.average_attendance,
                stats: cohort.stats,
            })
        })
        .collect()
}

/// Per-lesson counts of recorded and present marks, ordered by date.
pub fn lesson_attendance(
    marks: &[AttendanceMark],
    lessons: &[LessonOccurrence],
    scope: &Scope,
) -> Vec<LessonAttendance> {
    let mut per_lesson: HashMap<&str, (usize, usize)> = HashMap::new();
    for mark in marks {
        let entry = per_lesson.entry(mark.lesson_id.as_str()).or_insert((0, 0));
        entry.0 += 1;
        if mark.present {
            entry.1 += 1;
        }
    }

    let mut rows: Vec<LessonAttendance> = lessons
        .iter()
        .filter(|lesson| scope.matches_lesson(lesson))
        .map(|lesson| {
            let (recorded, present) = per_lesson.get(lesson.id.as_str()).copied().unwrap_or((0, 0));
            LessonAttendance {
                lesson_id: lesson.id.clone(),
                date: lesson.date,
                recorded,
                present,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.lesson_id.cmp(&b.lesson_id)));
    rows
}
