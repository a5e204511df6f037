use chrono::Duration;
use std::sync::Arc;

use tutor_core::catalog::page_ids;
use tutor_core::model::{AchievementId, Question, QuestionId, QuizSection, SectionId};
use tutor_core::time::{fixed_clock, fixed_now};
use tutor_services::{ErrorKind, NoopSink, TutorConfig, TutorError, TutorService};
use tutor_storage::{InMemoryRepository, SnapshotRepository, Storage};

fn quiz() -> QuizSection {
    let question = Question::new(
        QuestionId::new("r1").unwrap(),
        "Which command records a snapshot?",
        vec!["git commit".into(), "git status".into()],
        0,
        "commit records a snapshot",
    )
    .unwrap();
    QuizSection::new(SectionId::new("recap").unwrap(), "Recap", "", vec![question]).unwrap()
}

fn tutor(repo: &InMemoryRepository) -> TutorService {
    let storage = Storage {
        snapshots: Arc::new(repo.clone()),
    };
    TutorService::new(
        TutorConfig::standard(vec![quiz()]).unwrap(),
        &storage,
        Arc::new(NoopSink),
        fixed_clock(),
    )
}

#[tokio::test]
async fn saved_session_restores_progress_and_badges() {
    let repo = InMemoryRepository::new();
    let mut service = tutor(&repo);
    let mut session = service.start_session().unwrap();

    service
        .progress()
        .visit_page(&mut session, page_ids::CONCEPTS)
        .unwrap();
    service
        .progress()
        .complete_page(&mut session, page_ids::CONCEPTS)
        .unwrap();
    service
        .progress()
        .record_time_spent(&mut session, page_ids::CONCEPTS, Duration::minutes(12))
        .unwrap();
    service.quizzes().start(&mut session, "recap").unwrap();
    service.quizzes().submit_answer(&mut session, 0).unwrap();
    service.quizzes().advance(&mut session).unwrap();

    let mut later = fixed_clock();
    later.advance(Duration::hours(1));
    service.set_clock(later);
    let snapshot = service.save(&session).await.unwrap();
    assert_eq!(snapshot.saved_at, fixed_now() + Duration::hours(1));
    assert_eq!(repo.len().unwrap(), 1);

    let restored = service.restore(session.learner_id()).await.unwrap();
    assert_eq!(restored.progress(), session.progress());
    assert_eq!(restored.achievements(), session.achievements());
    assert!(restored.quiz().is_none());
    assert!(restored.achievements().is_unlocked(AchievementId::ConceptExplorer));
    assert!(restored.achievements().is_unlocked(AchievementId::QuizMaster));
    assert_eq!(
        restored
            .progress()
            .page(page_ids::CONCEPTS)
            .unwrap()
            .time_spent(),
        Duration::minutes(12)
    );
}

#[tokio::test]
async fn restored_session_keeps_accumulating() {
    let repo = InMemoryRepository::new();
    let service = tutor(&repo);
    let mut session = service.start_session().unwrap();
    service
        .progress()
        .visit_page(&mut session, page_ids::HOME)
        .unwrap();
    service.save(&session).await.unwrap();

    let mut restored = service.restore(session.learner_id()).await.unwrap();
    service
        .progress()
        .visit_page(&mut restored, page_ids::HOME)
        .unwrap();
    assert_eq!(
        restored.progress().page(page_ids::HOME).unwrap().visit_count(),
        2
    );
    let first_steps = restored
        .achievements()
        .unlocked_at(AchievementId::FirstSteps);
    assert_eq!(first_steps, Some(fixed_now()));
}

#[tokio::test]
async fn forget_removes_snapshot() {
    let repo = InMemoryRepository::new();
    let service = tutor(&repo);
    let session = service.start_session().unwrap();
    service.save(&session).await.unwrap();

    service.forget(session.learner_id()).await.unwrap();
    assert!(repo.is_empty().unwrap());
    assert!(
        repo.load_snapshot(session.learner_id())
            .await
            .unwrap()
            .is_none()
    );

    let err = service.restore(session.learner_id()).await.unwrap_err();
    assert!(matches!(err, TutorError::SnapshotNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::Storage);
}
