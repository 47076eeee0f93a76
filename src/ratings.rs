use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info};

use crate::error::{Result, ValidationError};
use crate::models::{
    QuestionRating, Student, SurveyAnswerRecord, SurveyQuestion, SurveyResponse,
    TeacherRatingView,
};
use crate::scope::Scope;

pub const MAX_ANSWER: i32 = 10;

#[derive(Default)]
struct PairTotals<'a> {
    responses: usize,
    sum: i64,
    count: usize,
    per_question: HashMap<&'a str, (i64, usize)>,
}

fn mean(sum: i64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Reduces survey answers into one rating view per (teacher, subject) pair.
///
/// Answers pointing at a response or question outside the supplied data are
/// skipped. Questions nobody answered are left out of `question_ratings`.
/// A group filter is resolved through the roster: responses from students
/// outside the group, or missing from the roster, are left out.
pub fn aggregate_ratings(
    responses: &[SurveyResponse],
    answers: &[SurveyAnswerRecord],
    questions: &[SurveyQuestion],
    roster: &[Student],
    scope: &Scope,
) -> Result<Vec<TeacherRatingView>> {
    let question_by_id: HashMap<&str, &SurveyQuestion> =
        questions.iter().map(|q| (q.id.as_str(), q)).collect();
    let group_of: HashMap<&str, &str> = roster
        .iter()
        .map(|s| (s.id.as_str(), s.group_id.as_str()))
        .collect();
    let in_group = |response: &SurveyResponse| match scope.group_id.as_deref() {
        None => true,
        Some(group) => group_of.get(response.student_id.as_str()) == Some(&group),
    };

    let mut pair_of_response: HashMap<&str, (&str, &str)> = HashMap::new();
    let mut totals: BTreeMap<(&str, &str), PairTotals<'_>> = BTreeMap::new();
    for response in responses.iter().filter(|r| scope.matches_response(r) && in_group(*r)) {
        let pair = (response.teacher_id.as_str(), response.subject_id.as_str());
        if pair_of_response.insert(response.id.as_str(), pair).is_none() {
            totals.entry(pair).or_default().responses += 1;
        }
    }

    let mut seen = HashSet::new();
    let mut skipped = 0usize;
    for answer in answers {
        if !(0..=MAX_ANSWER).contains(&answer.value) {
            return Err(ValidationError::AnswerOutOfRange {
                response_id: answer.response_id.clone(),
                question_id: answer.question_id.clone(),
                value: answer.value,
            });
        }
        if !seen.insert((answer.response_id.as_str(), answer.question_id.as_str())) {
            return Err(ValidationError::DuplicateAnswer {
                response_id: answer.response_id.clone(),
                question_id: answer.question_id.clone(),
            });
        }

        let Some(pair) = pair_of_response.get(answer.response_id.as_str()) else {
            skipped += 1;
            continue;
        };
        if !question_by_id.contains_key(answer.question_id.as_str()) {
            skipped += 1;
            continue;
        }

        let entry = totals.entry(*pair).or_default();
        entry.sum += i64::from(answer.value);
        entry.count += 1;
        let question = entry
            .per_question
            .entry(answer.question_id.as_str())
            .or_insert((0, 0));
        question.0 += i64::from(answer.value);
        question.1 += 1;
    }
    if skipped > 0 {
        debug!(skipped, "survey answers without an in-scope response or question");
    }

    let views: Vec<TeacherRatingView> = totals
        .into_iter()
        .map(|((teacher_id, subject_id), pair)| {
            let mut question_ratings: Vec<(&SurveyQuestion, QuestionRating)> = pair
                .per_question
                .iter()
                .filter_map(|(question_id, &(sum, count))| {
                    let question = question_by_id.get(question_id)?;
                    Some((
                        *question,
                        QuestionRating {
                            question_id: question.id.clone(),
                            text: question.text.clone(),
                            average: mean(sum, count),
                            answer_count: count,
                        },
                    ))
                })
                .collect();
            question_ratings.sort_by(|(a, _), (b, _)| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

            TeacherRatingView {
                teacher_id: teacher_id.to_string(),
                subject_id: subject_id.to_string(),
                total_responses: pair.responses,
                average_rating: mean(pair.sum, pair.count),
                question_ratings: question_ratings.into_iter().map(|(_, rating)| rating).collect(),
            }
        })
        .collect();

    info!(pairs = views.len(), "teacher ratings aggregated");
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(id: &str, teacher: &str, subject: &str) -> SurveyResponse {
        SurveyResponse {
            id: id.to_string(),
            student_id: format!("student-{id}"),
            teacher_id: teacher.to_string(),
            subject_id: subject.to_string(),
            period_id: "2025-autumn".to_string(),
        }
    }

    fn answer(response_id: &str, question_id: &str, value: i32) -> SurveyAnswerRecord {
        SurveyAnswerRecord {
            response_id: response_id.to_string(),
            question_id: question_id.to_string(),
            value,
        }
    }

    fn question(id: &str, order: i32) -> SurveyQuestion {
        SurveyQuestion {
            id: id.to_string(),
            text: format!("Question {id}"),
            order,
        }
    }

    #[test]
    fn question_rating_is_mean_across_responses() {
        let responses = vec![
            response("r1", "t1", "math"),
            response("r2", "t1", "math"),
            response("r3", "t1", "math"),
        ];
        let answers = vec![answer("r1", "q1", 8), answer("r2", "q1", 6), answer("r3", "q1", 10)];
        let questions = vec![question("q1", 1)];

        let views = aggregate_ratings(&responses, &answers, &questions, &[], &Scope::all()).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].total_responses, 3);
        assert!((views[0].question_ratings[0].average - 8.0).abs() < 1e-9);
        assert!((views[0].average_rating - 8.0).abs() < 1e-9);
    }

    #[test]
    fn pairs_are_kept_apart_and_sorted() {
        let responses = vec![response("r1", "t2", "math"), response("r2", "t1", "physics")];
        let answers = vec![answer("r1", "q1", 4), answer("r2", "q1", 9)];
        let questions = vec![question("q1", 1)];

        let views = aggregate_ratings(&responses, &answers, &questions, &[], &Scope::all()).unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].teacher_id, "t1");
        assert!((views[0].average_rating - 9.0).abs() < 1e-9);
        assert_eq!(views[1].teacher_id, "t2");
        assert!((views[1].average_rating - 4.0).abs() < 1e-9);
    }

    #[test]
    fn unanswered_questions_are_omitted() {
        let responses = vec![response("r1", "t1", "math")];
        let answers = vec![answer("r1", "q2", 7)];
        let questions = vec![question("q1", 1), question("q2", 2)];

        let views = aggregate_ratings(&responses, &answers, &questions, &[], &Scope::all()).unwrap();
        assert_eq!(views[0].question_ratings.len(), 1);
        assert_eq!(views[0].question_ratings[0].question_id, "q2");
    }

    #[test]
    fn question_ratings_follow_question_order() {
        let responses = vec![response("r1", "t1", "math")];
        let answers = vec![answer("r1", "qa", 3), answer("r1", "qb", 5)];
        let questions = vec![question("qa", 2), question("qb", 1)];

        let views = aggregate_ratings(&responses, &answers, &questions, &[], &Scope::all()).unwrap();
        let ids: Vec<_> = views[0].question_ratings.iter().map(|q| q.question_id.as_str()).collect();
        assert_eq!(ids, vec!["qb", "qa"]);
    }

    #[test]
    fn orphan_answers_are_ignored() {
        let responses = vec![response("r1", "t1", "math")];
        let answers = vec![
            answer("r1", "q1", 6),
            answer("missing", "q1", 0),
            answer("r1", "unknown", 0),
        ];
        let questions = vec![question("q1", 1)];

        let views = aggregate_ratings(&responses, &answers, &questions, &[], &Scope::all()).unwrap();
        assert!((views[0].average_rating - 6.0).abs() < 1e-9);
    }

    #[test]
    fn response_order_does_not_change_average() {
        let mut responses = vec![
            response("r1", "t1", "math"),
            response("r2", "t1", "math"),
            response("r3", "t1", "math"),
        ];
        let answers = vec![
            answer("r1", "q1", 3),
            answer("r2", "q1", 7),
            answer("r3", "q1", 10),
            answer("r3", "q2", 1),
        ];
        let questions = vec![question("q1", 1), question("q2", 2)];

        let forward = aggregate_ratings(&responses, &answers, &questions, &[], &Scope::all()).unwrap();
        responses.reverse();
        let backward = aggregate_ratings(&responses, &answers, &questions, &[], &Scope::all()).unwrap();
        assert!((forward[0].average_rating - backward[0].average_rating).abs() < 1e-9);
        assert!((forward[0].average_rating - 5.25).abs() < 1e-9);
    }

    #[test]
    fn responses_without_answers_still_count() {
        let responses = vec![response("r1", "t1", "math"), response("r2", "t1", "math")];
        let answers = vec![answer("r1", "q1", 9)];
        let questions = vec![question("q1", 1)];

        let views = aggregate_ratings(&responses, &answers, &questions, &[], &Scope::all()).unwrap();
        assert_eq!(views[0].total_responses, 2);
        assert!((views[0].average_rating - 9.0).abs() < 1e-9);
    }

    #[test]
    fn scope_filters_by_period() {
        let mut spring = response("r2", "t1", "math");
        spring.period_id = "2026-spring".to_string();
        let responses = vec![response("r1", "t1", "math"), spring];
        let answers = vec![answer("r1", "q1", 2), answer("r2", "q1", 10)];
        let scope = Scope {
            period_id: Some("2026-spring".to_string()),
            ..Scope::default()
        };

        let views = aggregate_ratings(&responses, &answers, &[question("q1", 1)], &[], &scope).unwrap();
        assert_eq!(views[0].total_responses, 1);
        assert!((views[0].average_rating - 10.0).abs() < 1e-9);
    }

    #[test]
    fn group_scope_resolves_students_through_roster() {
        let mut r1 = response("r1", "t1", "math");
        r1.student_id = "s1".to_string();
        let mut r2 = response("r2", "t1", "math");
        r2.student_id = "s3".to_string();
        let mut r3 = response("r3", "t1", "math");
        r3.student_id = "unknown".to_string();
        let roster = vec![
            Student {
                id: "s1".to_string(),
                full_name: "Anna".to_string(),
                group_id: "g1".to_string(),
            },
            Student {
                id: "s3".to_string(),
                full_name: "Vera".to_string(),
                group_id: "g2".to_string(),
            },
        ];
        let answers = vec![answer("r1", "q1", 10), answer("r2", "q1", 0), answer("r3", "q1", 2)];
        let scope = Scope {
            group_id: Some("g1".to_string()),
            ..Scope::default()
        };

        let views = aggregate_ratings(
            &[r1.clone(), r2.clone(), r3.clone()],
            &answers,
            &[question("q1", 1)],
            &roster,
            &scope,
        )
        .unwrap();
        assert_eq!(views[0].total_responses, 1);
        assert!((views[0].average_rating - 10.0).abs() < 1e-9);

        let all = aggregate_ratings(&[r1, r2, r3], &answers, &[question("q1", 1)], &roster, &Scope::all())
            .unwrap();
        assert_eq!(all[0].total_responses, 3);
    }

    #[test]
    fn out_of_range_answer_is_rejected() {
        let err = aggregate_ratings(
            &[response("r1", "t1", "math")],
            &[answer("r1", "q1", 11)],
            &[question("q1", 1)],
            &[],
            &Scope::all(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::AnswerOutOfRange { value: 11, .. }));
    }

    #[test]
    fn duplicate_answer_is_rejected() {
        let err = aggregate_ratings(
            &[response("r1", "t1", "math")],
            &[answer("r1", "q1", 5), answer("r1", "q1", 6)],
            &[question("q1", 1)],
            &[],
            &Scope::all(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateAnswer { .. }));
    }
}
