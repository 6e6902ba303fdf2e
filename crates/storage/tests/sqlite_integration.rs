use lesson_core::model::{
    Blank, Exercise, ExerciseId, ExerciseKind, Lesson, LessonId, ProgressDocument, Skill, UserId,
};
use lesson_core::time::fixed_now;
use storage::repository::{LessonRepository, ProgressRepository, StorageError};
use storage::sqlite::SqliteRepository;

async fn repo(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn lesson() -> Lesson {
    Lesson::new(
        LessonId::new("present-perfect-1"),
        "Present perfect",
        Some(Skill::Grammar),
        vec![
            Exercise::new(
                ExerciseId::new("q1"),
                "She ___ (live) here since 2019.",
                ExerciseKind::FillInBlank {
                    blanks: vec![Blank::new(0, "has lived").with_alternative("'s lived")],
                },
            )
            .unwrap()
            .with_points(2),
            Exercise::new(ExerciseId::new("q2"), "Describe your week.", ExerciseKind::Essay)
                .unwrap(),
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_progress_uses_compare_and_swap() {
    let repo = repo("memdb_progress_cas").await;
    let user = UserId::new("learner-42");

    assert!(repo.load_progress(&user).await.unwrap().is_none());

    let mut doc = ProgressDocument::new(user.clone(), 5, fixed_now());
    assert_eq!(repo.save_progress(&doc, None).await.unwrap(), 1);
    assert!(matches!(
        repo.save_progress(&doc, None).await,
        Err(StorageError::Conflict)
    ));

    doc.streak = 4;
    doc.completed_lessons.push(LessonId::new("l1"));
    assert_eq!(repo.save_progress(&doc, Some(1)).await.unwrap(), 2);

    // a writer holding revision 1 loses
    assert!(matches!(
        repo.save_progress(&doc, Some(1)).await,
        Err(StorageError::Conflict)
    ));

    let loaded = repo.load_progress(&user).await.unwrap().unwrap();
    assert_eq!(loaded.revision, 2);
    assert_eq!(loaded.document, doc);
}

#[tokio::test]
async fn sqlite_lessons_round_trip() {
    let repo = repo("memdb_lessons").await;
    let lesson = lesson();

    repo.upsert_lesson(&lesson).await.unwrap();
    let fetched = repo.get_lesson(&lesson.id).await.unwrap();
    assert_eq!(fetched, lesson);

    let mut renamed = lesson.clone();
    renamed.title = "Present perfect (revised)".into();
    repo.upsert_lesson(&renamed).await.unwrap();
    let listed = repo.list_lessons(10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Present perfect (revised)");

    assert!(matches!(
        repo.get_lesson(&LessonId::new("missing")).await,
        Err(StorageError::NotFound)
    ));
}
