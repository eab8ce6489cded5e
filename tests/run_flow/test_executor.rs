//! Per-test executor: steps, finalization, auto-advance and reset.

use std::sync::atomic::Ordering;

use tcm_lib::error::AppError;
use tcm_lib::models::{
    ExecutionStatus, NavigationTarget, Outcome, ResetRequest, SessionStatus,
    StartSessionRequest,
};

use super::test_helpers::*;

#[actix_rt::test]
async fn test_two_case_run() {
    let world = World::new();
    let (suite, cases) = world.seed_suite(&[2, 1]).await;
    let snapshot = world.start(suite.id).await;
    let executor = &world.services.executor;
    let first = snapshot.current_execution.unwrap();

    executor.toggle_step(&world.user, first.id, 1).await.unwrap();
    let first = executor.toggle_step(&world.user, first.id, 2).await.unwrap();
    assert_eq!(first.completed_steps, vec![1, 2]);

    let done = executor
        .finalize(&world.user, first.id, finalize_req(Outcome::Passed, None))
        .await
        .unwrap();
    assert_eq!(done.execution.status, ExecutionStatus::Passed);
    assert_eq!(done.session.test_cases_completed, 1);
    assert_eq!(done.session.progress_percentage, 50);
    assert_eq!(done.session.current_index, 1);
    let second = done.next_execution.expect("auto-advanced");
    assert_eq!(second.case, cases[1].case_ref());

    // A failure without a reason changes nothing
    let err = executor
        .finalize(&world.user, second.id, finalize_req(Outcome::Failed, Some("  ")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(world.db.session(done.session.id).test_cases_completed, 1);

    let done = executor
        .finalize(
            &world.user,
            second.id,
            finalize_req(Outcome::Failed, Some("Total is wrong")),
        )
        .await
        .unwrap();
    assert_eq!(done.execution.failure_reason.as_deref(), Some("Total is wrong"));
    assert_eq!(done.session.status, SessionStatus::Completed);
    assert_eq!(done.session.progress_percentage, 100);
    assert_eq!(done.session.passed_cases, 1);
    assert_eq!(done.session.failed_cases, 1);
    assert!(done.session.actual_end.is_some());
    assert!(done.next_execution.is_none());
}

#[actix_rt::test]
async fn test_counters_match_finalized_executions() {
    let world = World::new();
    let (suite, _) = world.seed_suite(&[1, 1, 1, 1, 1]).await;
    let session_id = world.start(suite.id).await.session.id;
    let executor = &world.services.executor;
    let outcomes = [
        (Outcome::Failed, Some("broken")),
        (Outcome::Passed, None),
        (Outcome::Blocked, Some("env down")),
        (Outcome::Skipped, Some("not in scope")),
        (Outcome::Passed, None),
    ];

    let mut last_progress = 0;
    for (outcome, reason) in outcomes {
        let snap = world.services.sessions.get(&world.user, session_id).await.unwrap();
        let current = snap.current_execution.expect("an open case");
        let done = executor
            .finalize(&world.user, current.id, finalize_req(outcome, reason))
            .await
            .unwrap();

        let executions = world.db.executions_of(session_id);
        let terminal = |s: ExecutionStatus| executions.iter().filter(|e| e.status == s).count() as i32;
        let session = world.db.session(session_id);
        assert_eq!(session.passed_cases, terminal(ExecutionStatus::Passed));
        assert_eq!(session.failed_cases, terminal(ExecutionStatus::Failed));
        assert_eq!(session.blocked_cases, terminal(ExecutionStatus::Blocked));
        assert_eq!(session.skipped_cases, terminal(ExecutionStatus::Skipped));
        assert_eq!(
            session.test_cases_completed,
            executions.iter().filter(|e| e.status.is_terminal()).count() as i32
        );

        assert!(done.session.progress_percentage >= last_progress);
        assert!(
            done.session.progress_percentage < 100
                || done.session.test_cases_completed == done.session.test_cases_total
        );
        last_progress = done.session.progress_percentage;
    }
    assert_eq!(world.db.session(session_id).status, SessionStatus::Completed);
}

#[actix_rt::test]
async fn test_blocked_and_skipped_reasons_land_in_notes() {
    let world = World::new();
    let (suite, _) = world.seed_suite(&[1, 1]).await;
    let snapshot = world.start(suite.id).await;
    let executor = &world.services.executor;
    let first = snapshot.current_execution.unwrap();

    executor
        .set_notes(&world.user, first.id, Some("Tried twice".to_string()))
        .await
        .unwrap();
    let err = executor
        .finalize(&world.user, first.id, finalize_req(Outcome::Blocked, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let done = executor
        .finalize(&world.user, first.id, finalize_req(Outcome::Blocked, Some("VPN down")))
        .await
        .unwrap();
    assert_eq!(
        done.execution.execution_notes.as_deref(),
        Some("Tried twice\n\nBlocked: VPN down")
    );
    assert!(done.execution.failure_reason.is_none());
}

#[actix_rt::test]
async fn test_finalized_execution_is_read_only() {
    let world = World::new();
    let (suite, _) = world.seed_suite(&[2, 1]).await;
    let snapshot = world.start(suite.id).await;
    let executor = &world.services.executor;
    let first = snapshot.current_execution.unwrap();

    executor
        .finalize(&world.user, first.id, finalize_req(Outcome::Passed, None))
        .await
        .unwrap();

    let err = executor.toggle_step(&world.user, first.id, 1).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let err = executor
        .mark_step_failed(&world.user, first.id, 1, "late")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let err = executor
        .finalize(&world.user, first.id, finalize_req(Outcome::Passed, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    assert_eq!(world.db.session(first.session_id).test_cases_completed, 1);
}

#[actix_rt::test]
async fn test_step_tracking() {
    let world = World::new();
    let (suite, _) = world.seed_suite(&[3]).await;
    let snapshot = world.start(suite.id).await;
    let executor = &world.services.executor;
    let id = snapshot.current_execution.unwrap().id;

    let err = executor.toggle_step(&world.user, id, 4).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    let err = executor
        .mark_step_failed(&world.user, id, 4, "no such step")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert!(world.db.executions_of(snapshot.session.id)[0].failed_steps.is_empty());

    executor.toggle_step(&world.user, id, 3).await.unwrap();
    executor.toggle_step(&world.user, id, 1).await.unwrap();
    let e = executor.toggle_step(&world.user, id, 3).await.unwrap();
    assert_eq!(e.completed_steps, vec![1]);

    executor.mark_step_failed(&world.user, id, 2, "first").await.unwrap();
    let e = executor.mark_step_failed(&world.user, id, 2, "second").await.unwrap();
    assert_eq!(e.failed_steps.len(), 1);
    assert_eq!(e.failed_steps[0].reason, "second");

    let err = executor.mark_step_failed(&world.user, id, 2, " ").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let e = executor.clear_step_failure(&world.user, id, 2).await.unwrap();
    assert!(e.failed_steps.is_empty());
}

#[actix_rt::test]
async fn test_failed_commit_writes_nothing() {
    let world = World::new();
    let (suite, _) = world.seed_suite(&[1, 1]).await;
    let snapshot = world.start(suite.id).await;
    let id = snapshot.current_execution.unwrap().id;

    world.db.fail_commit.store(true, Ordering::SeqCst);
    let err = world
        .services
        .executor
        .finalize(&world.user, id, finalize_req(Outcome::Passed, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));

    let session = world.db.session(snapshot.session.id);
    assert_eq!(session.test_cases_completed, 0);
    assert_eq!(session.passed_cases, 0);
    let executions = world.db.executions_of(snapshot.session.id);
    assert_eq!(executions[0].status, ExecutionStatus::InProgress);

    // Retry once storage recovers
    world.db.fail_commit.store(false, Ordering::SeqCst);
    world
        .services
        .executor
        .finalize(&world.user, id, finalize_req(Outcome::Passed, None))
        .await
        .unwrap();
    assert_eq!(world.db.session(snapshot.session.id).test_cases_completed, 1);
}

#[actix_rt::test]
async fn test_concurrent_finalize_counts_once() {
    let world = World::new();
    let (suite, _) = world.seed_suite(&[1, 1]).await;
    let snapshot = world.start(suite.id).await;
    let id = snapshot.current_execution.unwrap().id;
    let executor = &world.services.executor;

    let (a, b) = futures_util::future::join(
        executor.finalize(&world.user, id, finalize_req(Outcome::Passed, None)),
        executor.finalize(&world.user, id, finalize_req(Outcome::Passed, None)),
    )
    .await;

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert!(matches!(a.err().or(b.err()), Some(AppError::Conflict(_))));
    assert_eq!(world.db.session(snapshot.session.id).test_cases_completed, 1);
}

#[actix_rt::test]
async fn test_reset_requires_confirmation() {
    let world = World::new();
    let (suite, _) = world.seed_suite(&[1]).await;
    let snapshot = world.start(suite.id).await;
    let id = snapshot.current_execution.unwrap().id;

    let err = world
        .services
        .executor
        .reset(&world.user, id, ResetRequest { confirm: false })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[actix_rt::test]
async fn test_reset_rolls_back_counters_and_reopens_session() {
    let world = World::new();
    let (suite, _) = world.seed_suite(&[2]).await;
    let snapshot = world.start(suite.id).await;
    let executor = &world.services.executor;
    let id = snapshot.current_execution.unwrap().id;

    executor.toggle_step(&world.user, id, 1).await.unwrap();
    executor
        .finalize(&world.user, id, finalize_req(Outcome::Failed, Some("crash")))
        .await
        .unwrap();
    assert_eq!(world.db.session(snapshot.session.id).status, SessionStatus::Completed);

    let reset = executor
        .reset(&world.user, id, ResetRequest { confirm: true })
        .await
        .unwrap();
    assert_eq!(reset.rolled_back, Some(Outcome::Failed));
    assert_eq!(reset.execution.status, ExecutionStatus::InProgress);
    assert!(reset.execution.completed_steps.is_empty());
    assert!(reset.execution.failure_reason.is_none());
    assert_eq!(reset.session.status, SessionStatus::InProgress);
    assert_eq!(reset.session.test_cases_completed, 0);
    assert_eq!(reset.session.failed_cases, 0);
    assert_eq!(reset.session.progress_percentage, 0);
    assert!(reset.session.actual_end.is_none());

    // Editable again
    executor.toggle_step(&world.user, id, 2).await.unwrap();
}

#[actix_rt::test]
async fn test_completed_session_is_browsable_but_locked() {
    let world = World::new();
    let (suite, _) = world.seed_suite(&[1, 1]).await;
    let snapshot = world.start(suite.id).await;
    let executor = &world.services.executor;
    let first = snapshot.current_execution.unwrap();

    let done = executor
        .finalize(&world.user, first.id, finalize_req(Outcome::Passed, None))
        .await
        .unwrap();
    let second = done.next_execution.unwrap();
    executor
        .finalize(&world.user, second.id, finalize_req(Outcome::Skipped, Some("n/a")))
        .await
        .unwrap();

    let snap = world
        .services
        .sessions
        .navigate(&world.user, snapshot.session.id, NavigationTarget::Index { index: 0 })
        .await
        .unwrap();
    assert_eq!(snap.current_execution.unwrap().id, first.id);

    let err = executor
        .set_notes(&world.user, first.id, Some("later".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[actix_rt::test]
async fn test_manual_advance_when_auto_advance_off() {
    let world = World::new();
    let (suite, _) = world.seed_suite(&[1, 1]).await;
    let snapshot = world
        .services
        .sessions
        .start(
            &world.user,
            suite.id,
            StartSessionRequest {
                name: Some("Manual".to_string()),
                auto_advance: Some(false),
            },
        )
        .await
        .unwrap();
    assert_eq!(snapshot.session.name, "Manual");

    let done = world
        .services
        .executor
        .finalize(
            &world.user,
            snapshot.current_execution.unwrap().id,
            finalize_req(Outcome::Passed, None),
        )
        .await
        .unwrap();
    assert!(done.next_execution.is_none());
    assert_eq!(done.session.current_index, 0);
}
