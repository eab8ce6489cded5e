//! Reporting aggregator over real run data.

use chrono::{Duration, Utc};
use tcm_lib::error::AppError;
use tcm_lib::models::{Outcome, ReportFilter, Suite};
use uuid::Uuid;

use super::test_helpers::*;

/// Two sessions of a three-case suite: one complete, one two-thirds done.
async fn seeded_runs(world: &World) -> (Suite, Uuid) {
    let (suite, _) = world.seed_suite(&[1, 1, 1]).await;
    let executor = &world.services.executor;

    let first = world.start(suite.id).await;
    let mut current = first.current_execution.unwrap();
    for (outcome, reason) in [
        (Outcome::Failed, Some("first crash")),
        (Outcome::Passed, None),
        (Outcome::Failed, Some("layout")),
    ] {
        let done = executor
            .finalize(&world.user, current.id, finalize_req(outcome, reason))
            .await
            .unwrap();
        match done.next_execution {
            Some(next) => current = next,
            None => break,
        }
    }

    let second = world.start(suite.id).await;
    let mut current = second.current_execution.unwrap();
    for (outcome, reason) in [
        (Outcome::Failed, Some("second crash")),
        (Outcome::Passed, None),
    ] {
        let done = executor
            .finalize(&world.user, current.id, finalize_req(outcome, reason))
            .await
            .unwrap();
        current = done.next_execution.unwrap();
    }

    (suite, first.session.id)
}

#[actix_rt::test]
async fn test_suite_stats() {
    let world = World::new();
    let (suite, _) = seeded_runs(&world).await;

    let stats = world
        .services
        .reporting
        .suite_stats(
            &world.user,
            &ReportFilter {
                suite_id: Some(suite.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(stats.sessions_total, 2);
    assert_eq!(stats.sessions_completed, 1);
    assert_eq!(stats.sessions_in_progress, 1);
    assert_eq!(stats.executions.total, 5);
    assert_eq!(stats.executions.passed, 2);
    assert_eq!(stats.executions.failed, 3);
    assert_eq!(stats.executions.pass_rate, 40.0);
}

#[actix_rt::test]
async fn test_failure_frequency_ranks_and_limits() {
    let world = World::new();
    seeded_runs(&world).await;
    let reporting = &world.services.reporting;

    let rows = reporting
        .failure_frequency(&world.user, &ReportFilter::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].title, "Case 1");
    assert_eq!(rows[0].failures, 2);
    assert_eq!(rows[0].failure_rate, 100.0);
    assert_eq!(rows[0].last_failure_reason.as_deref(), Some("second crash"));
    assert_eq!(rows[1].title, "Case 3");

    let rows = reporting
        .failure_frequency(
            &world.user,
            &ReportFilter {
                limit: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[actix_rt::test]
async fn test_case_performance() {
    let world = World::new();
    seeded_runs(&world).await;

    let rows = world
        .services
        .reporting
        .case_performance(&world.user, &ReportFilter::default())
        .await
        .unwrap();
    let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Case 1", "Case 2", "Case 3"]);
    assert_eq!(rows[1].runs.passed, 2);
    assert_eq!(rows[1].runs.pass_rate, 100.0);
    assert_eq!(rows[2].runs.total, 1);
}

#[actix_rt::test]
async fn test_daily_trends_respect_date_range() {
    let world = World::new();
    let (_, first_session) = seeded_runs(&world).await;

    let old = world.db.executions_of(first_session)[0].id;
    world.db.backdate_execution(old, Utc::now() - Duration::days(3));

    let reporting = &world.services.reporting;
    let all = reporting
        .daily_trends(&world.user, &ReportFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all.iter().map(|d| d.runs.total).sum::<i64>(), 5);

    let recent = reporting
        .daily_trends(
            &world.user,
            &ReportFilter {
                from_date: Some(Utc::now() - Duration::days(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].runs.total, 4);
}

#[actix_rt::test]
async fn test_reports_are_scoped_to_owner() {
    let world = World::new();
    let (suite, _) = seeded_runs(&world).await;
    let reporting = &world.services.reporting;

    let err = reporting
        .suite_stats(
            &world.stranger(),
            &ReportFilter {
                suite_id: Some(suite.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let stats = reporting
        .suite_stats(&world.stranger(), &ReportFilter::default())
        .await
        .unwrap();
    assert_eq!(stats.sessions_total, 0);
    assert_eq!(stats.executions.total, 0);
}
