//! Session controller: start, navigation, pause and resume.

use tcm_lib::error::AppError;
use tcm_lib::models::{NavigationTarget, SessionStatus, StartSessionRequest};

use super::test_helpers::*;

#[actix_rt::test]
async fn test_start_opens_first_case() {
    let world = World::new();
    let (suite, cases) = world.seed_suite(&[2, 3, 1]).await;

    let snapshot = world.start(suite.id).await;

    assert_eq!(snapshot.session.status, SessionStatus::InProgress);
    assert_eq!(snapshot.session.test_cases_total, 3);
    assert_eq!(snapshot.session.test_cases_completed, 0);
    assert_eq!(snapshot.session.progress_percentage, 0);
    assert_eq!(snapshot.session.current_index, 0);
    assert_eq!(snapshot.cases.len(), 3);
    assert_eq!(snapshot.cases[1].title, "Case 2");

    let current = snapshot.current_execution.expect("first execution opened");
    assert_eq!(current.case, cases[0].case_ref());
    assert_eq!(world.db.executions_of(snapshot.session.id).len(), 1);
}

#[actix_rt::test]
async fn test_start_rejects_empty_suite() {
    let world = World::new();
    let (suite, _) = world.seed_suite(&[]).await;

    let err = world
        .services
        .sessions
        .start(&world.user, suite.id, StartSessionRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[actix_rt::test]
async fn test_navigation_creates_one_execution_per_case() {
    let world = World::new();
    let (suite, cases) = world.seed_suite(&[1, 1, 1]).await;
    let session_id = world.start(suite.id).await.session.id;
    let sessions = &world.services.sessions;

    let snap = sessions
        .navigate(&world.user, session_id, NavigationTarget::Next)
        .await
        .unwrap();
    assert_eq!(snap.session.current_index, 1);
    assert_eq!(
        snap.current_execution.unwrap().case,
        cases[1].case_ref()
    );

    sessions
        .navigate(&world.user, session_id, NavigationTarget::Previous)
        .await
        .unwrap();
    sessions
        .navigate(&world.user, session_id, NavigationTarget::Index { index: 1 })
        .await
        .unwrap();

    // Revisiting reuses the existing rows
    assert_eq!(world.db.executions_of(session_id).len(), 2);
}

#[actix_rt::test]
async fn test_navigation_out_of_range() {
    let world = World::new();
    let (suite, _) = world.seed_suite(&[1, 1]).await;
    let session_id = world.start(suite.id).await.session.id;

    let err = world
        .services
        .sessions
        .navigate(&world.user, session_id, NavigationTarget::Previous)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = world
        .services
        .sessions
        .navigate(&world.user, session_id, NavigationTarget::Index { index: 2 })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(world.db.session(session_id).current_index, 0);
}

#[actix_rt::test]
async fn test_pause_blocks_work_and_resume_keeps_position() {
    let world = World::new();
    let (suite, _) = world.seed_suite(&[2, 2, 2]).await;
    let snapshot = world.start(suite.id).await;
    let session_id = snapshot.session.id;
    let sessions = &world.services.sessions;

    sessions
        .navigate(&world.user, session_id, NavigationTarget::Index { index: 2 })
        .await
        .unwrap();
    let paused = sessions.pause(&world.user, session_id).await.unwrap();
    assert_eq!(paused.status, SessionStatus::Paused);

    let err = sessions
        .navigate(&world.user, session_id, NavigationTarget::Next)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let execution_id = snapshot.current_execution.unwrap().id;
    let err = world
        .services
        .executor
        .toggle_step(&world.user, execution_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Pausing twice is not a transition
    assert!(sessions.pause(&world.user, session_id).await.is_err());

    let resumed = sessions.resume(&world.user, session_id).await.unwrap();
    assert_eq!(resumed.session.status, SessionStatus::InProgress);
    assert_eq!(resumed.session.current_index, 2);
    assert!(resumed.current_execution.is_some());
}

#[actix_rt::test]
async fn test_other_users_cannot_see_session() {
    let world = World::new();
    let (suite, _) = world.seed_suite(&[1]).await;
    let session_id = world.start(suite.id).await.session.id;

    let err = world
        .services
        .sessions
        .get(&world.stranger(), session_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}
