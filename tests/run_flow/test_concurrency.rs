//! Interleaved requests against one session.
//!
//! The in-memory store gives way to the scheduler after every session and
//! execution read, so joined requests read before either of them writes.

use std::sync::atomic::Ordering;

use futures_util::future::join;
use tcm_lib::error::AppError;
use tcm_lib::models::{
    AddSuiteCaseRequest, ExecutionStatus, NavigationTarget, Outcome, Priority, SessionStatus,
    StartSessionRequest,
};

use super::test_helpers::*;

/// A world whose store yields on reads, with a manual-advance session over
/// `cases` one-step cases.
async fn interleaved_run(cases: usize) -> (World, tcm_lib::models::SessionSnapshot) {
    let world = World::new();
    let (suite, _) = world.seed_suite(&vec![1; cases]).await;
    let snapshot = world
        .services
        .sessions
        .start(
            &world.user,
            suite.id,
            StartSessionRequest {
                name: None,
                auto_advance: Some(false),
            },
        )
        .await
        .unwrap();
    world.db.yield_on_read.store(true, Ordering::SeqCst);
    (world, snapshot)
}

fn assert_counters_match_executions(world: &World, session_id: uuid::Uuid) {
    let session = world.db.session(session_id);
    let executions = world.db.executions_of(session_id);
    let count = |s: ExecutionStatus| executions.iter().filter(|e| e.status == s).count() as i32;
    assert_eq!(session.passed_cases, count(ExecutionStatus::Passed));
    assert_eq!(session.failed_cases, count(ExecutionStatus::Failed));
    assert_eq!(session.blocked_cases, count(ExecutionStatus::Blocked));
    assert_eq!(session.skipped_cases, count(ExecutionStatus::Skipped));
    assert_eq!(
        session.test_cases_completed,
        executions.iter().filter(|e| e.status.is_terminal()).count() as i32
    );
}

#[actix_rt::test]
async fn test_parallel_finalize_of_different_cases_counts_both() {
    let (world, snapshot) = interleaved_run(2).await;
    let session_id = snapshot.session.id;
    let first = snapshot.current_execution.unwrap().id;
    let second = world
        .services
        .sessions
        .navigate(&world.user, session_id, NavigationTarget::Next)
        .await
        .unwrap()
        .current_execution
        .unwrap()
        .id;
    let executor = &world.services.executor;

    let (a, b) = join(
        executor.finalize(&world.user, first, finalize_req(Outcome::Passed, None)),
        executor.finalize(&world.user, second, finalize_req(Outcome::Failed, Some("500 on save"))),
    )
    .await;
    a.unwrap();
    b.unwrap();

    let session = world.db.session(session_id);
    assert_eq!(session.test_cases_completed, 2);
    assert_eq!(session.passed_cases, 1);
    assert_eq!(session.failed_cases, 1);
    assert_eq!(session.progress_percentage, 100);
    assert_eq!(session.status, SessionStatus::Completed);
    assert!(session.actual_end.is_some());
    assert_counters_match_executions(&world, session_id);
}

#[actix_rt::test]
async fn test_navigation_during_finalize_keeps_counters() {
    let (world, snapshot) = interleaved_run(3).await;
    let session_id = snapshot.session.id;
    let first = snapshot.current_execution.unwrap().id;

    let (done, moved) = join(
        world
            .services
            .executor
            .finalize(&world.user, first, finalize_req(Outcome::Passed, None)),
        world
            .services
            .sessions
            .navigate(&world.user, session_id, NavigationTarget::Next),
    )
    .await;
    done.unwrap();
    moved.unwrap();

    let session = world.db.session(session_id);
    assert_eq!(session.test_cases_completed, 1);
    assert_eq!(session.passed_cases, 1);
    assert_eq!(session.progress_percentage, 33);
    assert_eq!(session.current_index, 1);
    assert_eq!(session.status, SessionStatus::InProgress);
    assert_counters_match_executions(&world, session_id);
}

#[actix_rt::test]
async fn test_pause_during_finalize_leaves_consistent_session() {
    let (world, snapshot) = interleaved_run(2).await;
    let session_id = snapshot.session.id;
    let first = snapshot.current_execution.unwrap().id;

    let (done, paused) = join(
        world
            .services
            .executor
            .finalize(&world.user, first, finalize_req(Outcome::Passed, None)),
        world.services.sessions.pause(&world.user, session_id),
    )
    .await;
    assert!(done.is_ok() || paused.is_ok());

    let session = world.db.session(session_id);
    match done {
        Ok(_) => assert_eq!(session.passed_cases, 1),
        Err(e) => {
            assert!(matches!(e, AppError::Conflict(_)));
            assert_eq!(session.test_cases_completed, 0);
        }
    }
    match paused {
        Ok(_) => assert_eq!(session.status, SessionStatus::Paused),
        Err(e) => assert!(matches!(e, AppError::Conflict(_))),
    }
    assert_counters_match_executions(&world, session_id);
}

#[actix_rt::test]
async fn test_parallel_pause_changes_status_once() {
    let (world, snapshot) = interleaved_run(2).await;
    let session_id = snapshot.session.id;
    let sessions = &world.services.sessions;

    let (a, b) = join(
        sessions.pause(&world.user, session_id),
        sessions.pause(&world.user, session_id),
    )
    .await;

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert!(matches!(a.err().or(b.err()), Some(AppError::Conflict(_))));
    assert_eq!(world.db.session(session_id).status, SessionStatus::Paused);
}

#[actix_rt::test]
async fn test_suite_edit_does_not_change_running_session() {
    let world = World::new();
    let (suite, cases) = world.seed_suite(&[1, 1]).await;
    let snapshot = world.start(suite.id).await;
    let session_id = snapshot.session.id;

    // A new case jumps to the front of the suite mid-run
    let late = world
        .services
        .catalog
        .create_test_case(&world.user, suite.project_id, regular_case("Late addition", 1))
        .await
        .unwrap();
    let (test_case_id, platform_test_case_id) = late.case_ref().to_columns();
    world
        .services
        .catalog
        .add_case(
            &world.user,
            suite.id,
            AddSuiteCaseRequest {
                test_case_id,
                platform_test_case_id,
                sequence_order: Some(-1),
                priority: Priority::High,
                estimated_duration_minutes: None,
            },
        )
        .await
        .unwrap();

    let snap = world.services.sessions.get(&world.user, session_id).await.unwrap();
    assert_eq!(snap.session.test_cases_total, 2);
    assert_eq!(
        snap.session.case_order,
        vec![cases[0].case_ref(), cases[1].case_ref()]
    );
    assert_eq!(snap.cases.len(), 2);
    assert_eq!(snap.cases[0].case, cases[0].case_ref());
    assert_eq!(
        snap.current_execution.as_ref().unwrap().case,
        cases[0].case_ref()
    );

    let executor = &world.services.executor;
    let done = executor
        .finalize(
            &world.user,
            snap.current_execution.unwrap().id,
            finalize_req(Outcome::Passed, None),
        )
        .await
        .unwrap();
    let second = done.next_execution.expect("second original case");
    assert_eq!(second.case, cases[1].case_ref());
    let done = executor
        .finalize(&world.user, second.id, finalize_req(Outcome::Passed, None))
        .await
        .unwrap();
    assert_eq!(done.session.status, SessionStatus::Completed);
    assert_eq!(done.session.progress_percentage, 100);
    assert!(
        world
            .db
            .executions_of(session_id)
            .iter()
            .all(|e| e.case != late.case_ref())
    );

    // The next run picks the new case up first
    let next_run = world.start(suite.id).await;
    assert_eq!(next_run.session.test_cases_total, 3);
    assert_eq!(
        next_run.current_execution.unwrap().case,
        late.case_ref()
    );
}
