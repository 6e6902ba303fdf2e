//! Scores a single submitted answer against an exercise's answer key.
//!
//! Choice-style exercises (single-choice, multiple-choice, true-false) compare exactly.
//! Free-text exercises (fill-in-blank, translation) compare after `normalize_free_text`.

use std::collections::HashSet;

use crate::model::{AnswerValue, Exercise, ExerciseKind, OutcomeStatus, QuestionOutcome};

/// Correctness and points for one exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub status: OutcomeStatus,
    pub points_earned: u32,
}

impl Evaluation {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.status == OutcomeStatus::Correct
    }

    fn graded(correct: bool, points: u32) -> Self {
        if correct {
            Self {
                status: OutcomeStatus::Correct,
                points_earned: points,
            }
        } else {
            Self::incorrect()
        }
    }

    fn incorrect() -> Self {
        Self {
            status: OutcomeStatus::Incorrect,
            points_earned: 0,
        }
    }

    fn ungraded() -> Self {
        Self {
            status: OutcomeStatus::Ungraded,
            points_earned: 0,
        }
    }
}

/// Evaluate `answer` against `exercise`. A missing answer is incorrect.
///
/// Never fails: unknown exercise types and mismatched answer shapes score as incorrect.
#[must_use]
pub fn evaluate(exercise: &Exercise, answer: Option<&AnswerValue>) -> Evaluation {
    if matches!(exercise.kind, ExerciseKind::Essay) {
        return Evaluation::ungraded();
    }
    if matches!(exercise.kind, ExerciseKind::Unknown) {
        tracing::warn!(
            exercise_id = %exercise.id,
            "exercise has an unknown type; scoring as incorrect"
        );
        return Evaluation::incorrect();
    }
    let Some(answer) = answer else {
        return Evaluation::incorrect();
    };

    let correct = match (&exercise.kind, answer) {
        (ExerciseKind::SingleChoice { correct, .. }, AnswerValue::Text(value)) => value == correct,
        (ExerciseKind::SingleChoice { correct, .. }, AnswerValue::Choices(values)) => {
            values.len() == 1 && &values[0] == correct
        }
        (ExerciseKind::TrueFalse { correct }, AnswerValue::Flag(value)) => value == correct,
        (ExerciseKind::TrueFalse { correct }, AnswerValue::Text(value)) => {
            value.as_str() == if *correct { "true" } else { "false" }
        }
        (ExerciseKind::MultipleChoice { correct, .. }, AnswerValue::Choices(values)) => {
            same_set(values, correct)
        }
        (ExerciseKind::FillInBlank { blanks }, AnswerValue::Blanks(values)) => {
            blanks.iter().all(|blank| {
                values
                    .get(&blank.position)
                    .is_some_and(|value| matches_any(value, blank.accepted()))
            })
        }
        (ExerciseKind::FillInBlank { blanks }, AnswerValue::Text(value)) if blanks.len() == 1 => {
            matches_any(value, blanks[0].accepted())
        }
        (ExerciseKind::Translation { accepted }, AnswerValue::Text(value)) => {
            matches_any(value, accepted.iter().map(String::as_str))
        }
        _ => false,
    };

    Evaluation::graded(correct, exercise.points)
}

/// Evaluate and render the per-question detail line.
#[must_use]
pub fn outcome_for(exercise: &Exercise, answer: Option<&AnswerValue>) -> QuestionOutcome {
    let evaluation = evaluate(exercise, answer);
    QuestionOutcome {
        exercise_id: exercise.id.clone(),
        status: evaluation.status,
        user_answer: answer.map(AnswerValue::display),
        correct_answer: exercise.correct_answer_display(),
        explanation: exercise.explanation.clone(),
        points_earned: evaluation.points_earned,
    }
}

/// Canonical form used for free-text comparison.
///
/// Trims, lowercases, collapses whitespace runs to one space, and drops trailing
/// `.`, `!` and `?`.
#[must_use]
pub fn normalize_free_text(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(['.', '!', '?'])
        .trim_end()
        .to_lowercase()
}

fn matches_any<'a>(value: &str, accepted: impl IntoIterator<Item = &'a str>) -> bool {
    let value = normalize_free_text(value);
    accepted
        .into_iter()
        .any(|candidate| normalize_free_text(candidate) == value)
}

/// Same size after de-duplication and every submitted value is correct.
fn same_set(submitted: &[String], correct: &[String]) -> bool {
    let submitted: HashSet<&str> = submitted.iter().map(String::as_str).collect();
    let correct: HashSet<&str> = correct.iter().map(String::as_str).collect();
    submitted.len() == correct.len() && submitted.iter().all(|v| correct.contains(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Blank, ExerciseId};

    fn exercise(kind: ExerciseKind) -> Exercise {
        Exercise::new(ExerciseId::new("q"), "prompt", kind)
            .unwrap()
            .with_points(3)
    }

    fn multi() -> Exercise {
        exercise(ExerciseKind::MultipleChoice {
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct: vec!["a".into(), "b".into(), "c".into()],
        })
    }

    #[test]
    fn single_choice_is_exact_and_case_sensitive() {
        let ex = exercise(ExerciseKind::SingleChoice {
            options: vec!["Paris".into(), "Rome".into()],
            correct: "Paris".into(),
        });
        let hit = evaluate(&ex, Some(&AnswerValue::text("Paris")));
        assert!(hit.is_correct());
        assert_eq!(hit.points_earned, 3);
        assert!(!evaluate(&ex, Some(&AnswerValue::text("paris"))).is_correct());
        assert!(!evaluate(&ex, Some(&AnswerValue::text("Paris "))).is_correct());
    }

    #[test]
    fn true_false_accepts_flags_and_canonical_text() {
        let ex = exercise(ExerciseKind::TrueFalse { correct: false });
        assert!(evaluate(&ex, Some(&AnswerValue::Flag(false))).is_correct());
        assert!(evaluate(&ex, Some(&AnswerValue::text("false"))).is_correct());
        assert!(!evaluate(&ex, Some(&AnswerValue::text("False"))).is_correct());
        assert!(!evaluate(&ex, Some(&AnswerValue::Flag(true))).is_correct());
    }

    #[test]
    fn multiple_choice_accepts_every_permutation() {
        let ex = multi();
        let perms = [
            ["a", "b", "c"],
            ["a", "c", "b"],
            ["b", "a", "c"],
            ["b", "c", "a"],
            ["c", "a", "b"],
            ["c", "b", "a"],
        ];
        for perm in perms {
            assert!(
                evaluate(&ex, Some(&AnswerValue::choices(perm))).is_correct(),
                "{perm:?}"
            );
        }
    }

    #[test]
    fn multiple_choice_rejects_subsets_and_supersets() {
        let ex = multi();
        assert!(!evaluate(&ex, Some(&AnswerValue::choices(["a", "b"]))).is_correct());
        assert!(!evaluate(&ex, Some(&AnswerValue::choices(["a", "b", "c", "d"]))).is_correct());
        assert!(!evaluate(&ex, Some(&AnswerValue::choices(Vec::<String>::new()))).is_correct());
        assert!(!evaluate(&ex, Some(&AnswerValue::choices(["a", "b", "d"]))).is_correct());
    }

    #[test]
    fn multiple_choice_does_not_count_duplicates_twice() {
        let ex = multi();
        assert!(!evaluate(&ex, Some(&AnswerValue::choices(["a", "a", "b"]))).is_correct());
        assert!(evaluate(&ex, Some(&AnswerValue::choices(["a", "b", "c", "c"]))).is_correct());
    }

    #[test]
    fn fill_in_blank_uses_alternatives_and_free_text_policy() {
        let ex = exercise(ExerciseKind::FillInBlank {
            blanks: vec![
                Blank::new(0, "colour").with_alternative("color"),
                Blank::new(1, "grey"),
            ],
        });
        let answer = AnswerValue::blanks([(0, " Color "), (1, "GREY")]);
        assert!(evaluate(&ex, Some(&answer)).is_correct());

        let missing = AnswerValue::blanks([(0, "color")]);
        assert!(!evaluate(&ex, Some(&missing)).is_correct());

        let wrong = AnswerValue::blanks([(0, "colour"), (1, "gray")]);
        assert!(!evaluate(&ex, Some(&wrong)).is_correct());
    }

    #[test]
    fn single_blank_accepts_plain_text() {
        let ex = exercise(ExerciseKind::FillInBlank {
            blanks: vec![Blank::new(0, "went").with_alternative("walked")],
        });
        assert!(evaluate(&ex, Some(&AnswerValue::text("Walked"))).is_correct());
    }

    #[test]
    fn translation_ignores_case_spacing_and_trailing_punctuation() {
        let ex = exercise(ExerciseKind::Translation {
            accepted: vec!["I am hungry.".into(), "I'm hungry".into()],
        });
        assert!(evaluate(&ex, Some(&AnswerValue::text("i  am HUNGRY"))).is_correct());
        assert!(evaluate(&ex, Some(&AnswerValue::text("I'm hungry!"))).is_correct());
        assert!(!evaluate(&ex, Some(&AnswerValue::text("Im hungry"))).is_correct());
    }

    #[test]
    fn essays_are_ungraded() {
        let ex = exercise(ExerciseKind::Essay);
        let eval = evaluate(&ex, Some(&AnswerValue::text("My summer holiday...")));
        assert_eq!(eval.status, OutcomeStatus::Ungraded);
        assert_eq!(eval.points_earned, 0);
    }

    #[test]
    fn unknown_types_and_shape_mismatches_are_incorrect() {
        let unknown = exercise(ExerciseKind::Unknown);
        assert_eq!(
            evaluate(&unknown, Some(&AnswerValue::text("x"))).status,
            OutcomeStatus::Incorrect
        );

        let tf = exercise(ExerciseKind::TrueFalse { correct: true });
        assert!(!evaluate(&tf, Some(&AnswerValue::choices(["true"]))).is_correct());
        assert!(!evaluate(&tf, None).is_correct());
    }

    #[test]
    fn outcome_carries_answer_key_and_user_answer() {
        let ex = exercise(ExerciseKind::TrueFalse { correct: true }).with_explanation("Because.");
        let outcome = outcome_for(&ex, Some(&AnswerValue::Flag(false)));
        assert_eq!(outcome.status, OutcomeStatus::Incorrect);
        assert_eq!(outcome.user_answer.as_deref(), Some("false"));
        assert_eq!(outcome.correct_answer.as_deref(), Some("true"));
        assert_eq!(outcome.explanation.as_deref(), Some("Because."));
    }

    #[test]
    fn normalization_collapses_and_strips() {
        assert_eq!(normalize_free_text("  Hello   World?! "), "hello world");
        assert_eq!(normalize_free_text("Ok ."), "ok");
    }
}
