use std::fs;
use std::path::Path;

use academic_aggregates::assignments::compute_final_score;
use academic_aggregates::attendance::{aggregate_attendance, AttendanceBucket};
use academic_aggregates::distribution::summarize;
use academic_aggregates::grade::LetterGrade;
use academic_aggregates::ratings::aggregate_ratings;
use academic_aggregates::report::build_report;
use academic_aggregates::source::{CsvSource, RecordSource};
use academic_aggregates::Scope;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write fixture");
}

fn fixture_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path();

    write(
        path,
        "students.csv",
        "id,full_name,group_id\n\
         s1,Anna Ivanova,g1\n\
         s2,Boris Petrov,g1\n\
         s3,Vera Sokolova,g2\n",
    );
    write(
        path,
        "lessons.csv",
        "id,group_id,subject_id,teacher_id,date\n\
         l1,g1,math,t1,2025-09-01\n\
         l2,g1,math,t1,2025-09-08\n\
         l3,g2,math,t1,2025-09-02\n",
    );
    write(
        path,
        "attendance.csv",
        "lesson_id,student_id,present\n\
         l1,s1,true\n\
         l2,s1,false\n\
         l3,s3,true\n",
    );
    write(
        path,
        "assignments.csv",
        "id,title,subject_id,group_id,teacher_id,max_score,is_active\n\
         a1,Quiz,math,g1,t1,100,true\n\
         a2,Homework,math,g1,t1,100,true\n",
    );
    write(
        path,
        "submissions.csv",
        "assignment_id,student_id,score,is_checked,checked_at\n\
         a1,s1,90,true,2025-09-10T12:00:00Z\n\
         a2,s1,60,false,\n",
    );
    write(
        path,
        "questions.csv",
        "id,text,order\n\
         q1,Explains clearly,1\n",
    );
    write(
        path,
        "responses.csv",
        "id,student_id,teacher_id,subject_id,period_id\n\
         r1,s1,t1,math,autumn\n\
         r2,s2,t1,math,autumn\n\
         r3,s3,t1,math,autumn\n",
    );
    write(
        path,
        "answers.csv",
        "response_id,question_id,value\n\
         r1,q1,8\n\
         r2,q1,6\n\
         r3,q1,10\n",
    );

    dir
}

#[tokio::test]
async fn csv_records_flow_through_every_aggregator() {
    let dir = fixture_dir();
    let records = CsvSource::new(dir.path())
        .load(&Scope::all())
        .await
        .expect("load csv records");

    assert_eq!(records.students.len(), 3);
    assert!(records.submissions[1].score.is_some());
    assert!(records.submissions[1].checked_at.is_none());

    let scope = Scope {
        group_id: Some("g1".to_string()),
        ..Scope::default()
    };
    let cohort = aggregate_attendance(&records.marks, &records.lessons, &records.students, &scope)
        .expect("attendance");
    assert_eq!(cohort.stats.len(), 2);
    let anna = &cohort.stats[0];
    assert_eq!(anna.student_name, "Anna Ivanova");
    assert!((anna.attendance_rate - 50.0).abs() < 1e-9);
    assert_eq!(anna.bucket, AttendanceBucket::Poor);
    assert_eq!(cohort.stats[1].total_lessons, 0);

    let summary = summarize(&cohort.stats);
    assert_eq!(summary.total_students, 2);
    assert_eq!(summary.total_lessons, 2);
    assert_eq!(summary.total_missed, 1);

    let grade = compute_final_score(&records.submissions, &records.assignments, "s1", &scope)
        .expect("final score");
    assert!((grade.total_score - 90.0).abs() < 1e-9);
    assert_eq!(grade.letter_grade, LetterGrade::Excellent);

    let ratings = aggregate_ratings(
        &records.responses,
        &records.answers,
        &records.questions,
        &records.students,
        &Scope::all(),
    )
    .expect("ratings");
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0].total_responses, 3);
    assert!((ratings[0].question_ratings[0].average - 8.0).abs() < 1e-9);

    let report = build_report(&scope, &records).expect("report");
    assert!(report.contains("Anna Ivanova"));
    assert!(report.contains("t1 / math: 7.0 of 10 from 2 responses"));
}

#[tokio::test]
async fn missing_files_load_as_empty() {
    let dir = tempfile::tempdir().expect("temp dir");
    let records = CsvSource::new(dir.path())
        .load(&Scope::all())
        .await
        .expect("load empty dir");

    assert!(records.students.is_empty());
    assert!(records.answers.is_empty());
}

#[tokio::test]
async fn malformed_rows_report_their_line() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(
        dir.path(),
        "answers.csv",
        "response_id,question_id,value\n\
         r1,q1,8\n\
         r2,q1,not-a-number\n",
    );

    let err = CsvSource::new(dir.path())
        .load(&Scope::all())
        .await
        .expect_err("non-numeric answer should fail");
    assert!(format!("{err:#}").contains("line 3"));
}
