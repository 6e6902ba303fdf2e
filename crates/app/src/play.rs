use std::io::{BufRead, Write};
use std::time::Instant;

use lesson_core::model::{
    AnswerValue, Blank, Exercise, ExerciseKind, LessonId, OutcomeStatus, UserId,
};
use services::{AppServices, AttemptSession, MergeReport, ProgressError};

/// How many times a failed submit is retried before the attempt is given up.
const SUBMIT_ATTEMPTS: u32 = 3;

enum Step {
    Answer(AnswerValue),
    Skip,
    Back,
    Finish,
    Quit,
}

/// Run one attempt against stdin-like `input`, writing prompts to `out`.
///
/// Returns `None` when the learner quits; the attempt is then discarded.
///
/// # Errors
///
/// Returns an error if the lesson cannot be started, terminal IO fails, or the
/// result could not be stored after retries.
pub async fn play(
    app: &AppServices,
    user: &UserId,
    lesson_id: &LessonId,
    mut input: impl BufRead,
    mut out: impl Write,
) -> Result<Option<MergeReport>, Box<dyn std::error::Error>> {
    let attempts = app.attempts();
    let mut session = attempts.start(lesson_id).await?;
    writeln!(
        out,
        "{} ({} exercises). Commands: :back :finish :quit, empty line skips.",
        session.lesson().title,
        session.lesson().len()
    )?;

    let mut last_tick = Instant::now();
    while let Some(exercise) = session.current_exercise().cloned() {
        let progress = session.progress();
        writeln!(out)?;
        writeln!(
            out,
            "[{}/{}] {}",
            progress.current_index + 1,
            progress.total,
            exercise.prompt
        )?;
        print_choices(&exercise, &mut out)?;
        write!(out, "> ")?;
        out.flush()?;

        let mut line = String::new();
        let eof = input.read_line(&mut line)? == 0;
        session.tick(last_tick.elapsed());
        last_tick = Instant::now();

        let step = if eof { Step::Finish } else { parse_step(&exercise.kind, &line) };
        match step {
            Step::Answer(value) => {
                attempts.answer_current(&mut session, value)?;
                if !advance(&mut session)? {
                    break;
                }
            }
            Step::Skip => {
                if !advance(&mut session)? {
                    break;
                }
            }
            Step::Back => {
                if session.previous().is_err() {
                    writeln!(out, "already at the first exercise")?;
                }
            }
            Step::Finish => break,
            Step::Quit => {
                writeln!(out, "attempt discarded")?;
                return Ok(None);
            }
        }
    }

    let report = submit_with_retry(app, user, &mut session).await?;
    print_report(&session, &report, &mut out)?;
    Ok(Some(report))
}

/// Move to the next exercise; `false` once the last one is done.
fn advance(session: &mut AttemptSession) -> Result<bool, services::SessionError> {
    match session.next() {
        Ok(_) => Ok(true),
        Err(services::SessionError::AtLastExercise) => Ok(false),
        Err(err) => Err(err),
    }
}

async fn submit_with_retry(
    app: &AppServices,
    user: &UserId,
    session: &mut AttemptSession,
) -> Result<MergeReport, ProgressError> {
    let attempts = app.attempts();
    let mut result = attempts.finish_and_submit(user, session).await;
    for _ in 1..SUBMIT_ATTEMPTS {
        match &result {
            Err(err) if err.is_retryable() => {
                result = attempts.submit_pending(user, session).await;
            }
            _ => break,
        }
    }
    result
}

fn parse_step(kind: &ExerciseKind, line: &str) -> Step {
    match line.trim() {
        "" => Step::Skip,
        ":back" => Step::Back,
        ":finish" => Step::Finish,
        ":quit" => Step::Quit,
        raw => Step::Answer(parse_answer(kind, raw)),
    }
}

/// Map terminal input onto the answer shape the exercise expects.
///
/// Choice exercises accept either the option text or its 1-based number.
pub fn parse_answer(kind: &ExerciseKind, raw: &str) -> AnswerValue {
    match kind {
        ExerciseKind::TrueFalse { .. } => match raw.to_ascii_lowercase().as_str() {
            "t" | "true" | "y" | "yes" => AnswerValue::Flag(true),
            "f" | "false" | "n" | "no" => AnswerValue::Flag(false),
            _ => AnswerValue::text(raw),
        },
        ExerciseKind::SingleChoice { options, .. } => AnswerValue::Text(pick(options, raw)),
        ExerciseKind::MultipleChoice { options, .. } => AnswerValue::Choices(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| pick(options, s))
                .collect(),
        ),
        ExerciseKind::FillInBlank { blanks } if blanks.len() > 1 => {
            let mut positions: Vec<&Blank> = blanks.iter().collect();
            positions.sort_by_key(|b| b.position);
            AnswerValue::Blanks(
                positions
                    .iter()
                    .zip(raw.split('|'))
                    .map(|(blank, value)| (blank.position, value.trim().to_string()))
                    .collect(),
            )
        }
        _ => AnswerValue::text(raw),
    }
}

fn pick(options: &[String], raw: &str) -> String {
    raw.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i))
        .cloned()
        .unwrap_or_else(|| raw.to_string())
}

fn print_choices(exercise: &Exercise, out: &mut impl Write) -> std::io::Result<()> {
    match &exercise.kind {
        ExerciseKind::SingleChoice { options, .. }
        | ExerciseKind::MultipleChoice { options, .. } => {
            for (i, option) in options.iter().enumerate() {
                writeln!(out, "  {}. {option}", i + 1)?;
            }
            if matches!(exercise.kind, ExerciseKind::MultipleChoice { .. }) {
                writeln!(out, "  (separate several answers with commas)")?;
            }
        }
        ExerciseKind::TrueFalse { .. } => writeln!(out, "  true / false")?,
        ExerciseKind::FillInBlank { blanks } if blanks.len() > 1 => {
            writeln!(out, "  ({} blanks, separate with |)", blanks.len())?;
        }
        _ => {}
    }
    Ok(())
}

fn print_report(
    session: &AttemptSession,
    report: &MergeReport,
    out: &mut impl Write,
) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Score: {}%", report.score)?;
    if let Some(result) = session.result() {
        for outcome in result.outcomes() {
            let mark = match outcome.status {
                OutcomeStatus::Correct => "ok",
                OutcomeStatus::Incorrect => "x ",
                OutcomeStatus::Ungraded => "--",
            };
            write!(
                out,
                "  {mark} {}: {}",
                outcome.exercise_id,
                outcome.user_answer.as_deref().unwrap_or("(no answer)")
            )?;
            match (&outcome.status, &outcome.correct_answer) {
                (OutcomeStatus::Incorrect, Some(key)) => writeln!(out, " (expected {key})")?,
                _ => writeln!(out)?,
            }
        }
    }
    if report.newly_completed {
        writeln!(out, "Lesson completed!")?;
    }
    for achievement in &report.new_achievements {
        writeln!(out, "Achievement unlocked: {achievement}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::{ExerciseId, Lesson};
    use lesson_core::time::fixed_clock;
    use services::ServiceSettings;

    async fn app_with_lesson() -> AppServices {
        let app = AppServices::in_memory(fixed_clock(), ServiceSettings::default());
        let lesson = Lesson::new(
            LessonId::new("colours"),
            "Colours",
            None,
            vec![
                Exercise::new(
                    ExerciseId::new("q1"),
                    "Pick the colour of the sky",
                    ExerciseKind::SingleChoice {
                        options: vec!["green".into(), "blue".into()],
                        correct: "blue".into(),
                    },
                )
                .unwrap(),
                Exercise::new(
                    ExerciseId::new("q2"),
                    "Grass is green.",
                    ExerciseKind::TrueFalse { correct: true },
                )
                .unwrap(),
            ],
        )
        .unwrap();
        app.import_lesson(&lesson).await.unwrap();
        app
    }

    #[tokio::test]
    async fn scripted_attempt_is_merged() {
        let app = app_with_lesson().await;
        let user = UserId::new("ana");
        let mut out = Vec::new();

        let report = play(
            &app,
            &user,
            &LessonId::new("colours"),
            "2\nyes\n".as_bytes(),
            &mut out,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(report.score, 100);
        assert!(report.newly_completed);
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Score: 100%"));
    }

    #[tokio::test]
    async fn quitting_discards_the_attempt() {
        let app = app_with_lesson().await;
        let user = UserId::new("ana");
        let report = play(
            &app,
            &user,
            &LessonId::new("colours"),
            ":quit\n".as_bytes(),
            Vec::new(),
        )
        .await
        .unwrap();
        assert!(report.is_none());
        assert!(app.progress().document(&user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn skipped_exercises_count_as_wrong() {
        let app = app_with_lesson().await;
        let report = play(
            &app,
            &UserId::new("ben"),
            &LessonId::new("colours"),
            "\n:back\n1\n".as_bytes(),
            Vec::new(),
        )
        .await
        .unwrap()
        .unwrap();
        // back to q1, answered wrong, then input ends
        assert_eq!(report.score, 0);
    }

    #[test]
    fn choice_numbers_map_to_option_text() {
        let kind = ExerciseKind::MultipleChoice {
            options: vec!["red".into(), "green".into(), "blue".into()],
            correct: vec!["red".into(), "blue".into()],
        };
        assert_eq!(parse_answer(&kind, "1, blue"), AnswerValue::choices(["red", "blue"]));

        let single = ExerciseKind::SingleChoice {
            options: vec!["a".into()],
            correct: "a".into(),
        };
        assert_eq!(parse_answer(&single, "7"), AnswerValue::text("7"));
    }

    #[test]
    fn true_false_accepts_short_forms() {
        let kind = ExerciseKind::TrueFalse { correct: true };
        assert_eq!(parse_answer(&kind, "Y"), AnswerValue::Flag(true));
        assert_eq!(parse_answer(&kind, "no"), AnswerValue::Flag(false));
    }

    #[test]
    fn blanks_split_on_pipes_in_position_order() {
        let kind = ExerciseKind::FillInBlank {
            blanks: vec![Blank::new(2, "is"), Blank::new(0, "There")],
        };
        assert_eq!(
            parse_answer(&kind, "there | is"),
            AnswerValue::blanks([(0, "there"), (2, "is")])
        );
    }
}
