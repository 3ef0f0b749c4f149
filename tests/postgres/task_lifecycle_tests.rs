//! `PostgreSQL` integration tests for task storage, transition commits and
//! history paging.

use std::sync::Arc;

use civicworks::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{
        Department, HistoryQuery, InvalidInputError, MAX_DEPARTMENT_CHARS, TaskStatus,
        TaskVersion,
    },
    ports::{TaskFilter, TaskRepository, TaskRepositoryError},
    services::{
        PipelineOrchestrator, StructuredComplaint, TaskLifecycleError, TransitionTaskRequest,
    },
};
use rstest::rstest;

use crate::postgres::helpers::{BoxError, PostgresEngine, engine};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_created_task_round_trips(
    #[future] engine: Result<PostgresEngine, BoxError>,
) -> Result<(), BoxError> {
    let ctx = engine.await?;
    let created = ctx.create("roads").await?;
    ctx.create("water").await?;

    let found = ctx.repository.find_by_id(created.id()).await?;
    let roads = ctx
        .service
        .list_tasks(&TaskFilter::default().with_department(Department::new("roads")?))
        .await?;

    assert_eq!(found.as_ref(), Some(&created));
    assert_eq!(roads, vec![created]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_duplicate_task_is_rejected(
    #[future] engine: Result<PostgresEngine, BoxError>,
) -> Result<(), BoxError> {
    let ctx = engine.await?;
    let created = ctx.create("roads").await?;

    let result = ctx.repository.store(&created).await;

    assert!(
        matches!(result, Err(TaskRepositoryError::DuplicateTask(id)) if id == created.id()),
        "expected a duplicate error, got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_transition_persists_task_and_history(
    #[future] engine: Result<PostgresEngine, BoxError>,
) -> Result<(), BoxError> {
    let ctx = engine.await?;
    let task = ctx.create("roads").await?;

    let assigned = ctx
        .drive(task.id(), &[TaskStatus::Triaged, TaskStatus::Assigned])
        .await?;

    let stored = ctx.service.find_by_id(task.id()).await?;
    assert_eq!(stored, assigned);
    assert_eq!(stored.version(), TaskVersion::new(2));
    let trail = ctx.service.audit().full_history(task.id()).await?;
    let moves: Vec<_> = trail.iter().map(|entry| (entry.from(), entry.to())).collect();
    assert_eq!(
        moves,
        vec![
            (TaskStatus::Received, TaskStatus::Triaged),
            (TaskStatus::Triaged, TaskStatus::Assigned),
        ]
    );
    ctx.service.verify_history(task.id()).await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_stale_version_is_a_conflict(
    #[future] engine: Result<PostgresEngine, BoxError>,
) -> Result<(), BoxError> {
    let ctx = engine.await?;
    let task = ctx.create("roads").await?;
    let winner = ctx.commit_for(&task, TaskStatus::Triaged)?;
    let stale = ctx.commit_for(&task, TaskStatus::Rejected)?;

    ctx.repository.commit_transition(&winner).await?;
    let result = ctx.repository.commit_transition(&stale).await;

    assert!(
        matches!(
            result,
            Err(TaskRepositoryError::VersionConflict { task_id, expected })
                if task_id == task.id() && expected == TaskVersion::INITIAL
        ),
        "expected a version conflict, got {result:?}"
    );
    let stored = ctx.service.find_by_id(task.id()).await?;
    assert_eq!(stored.status(), TaskStatus::Triaged);
    let trail = ctx.service.audit().full_history(task.id()).await?;
    assert_eq!(trail, vec![winner.history]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_commit_for_unknown_task_is_not_found(
    #[future] engine: Result<PostgresEngine, BoxError>,
) -> Result<(), BoxError> {
    let ctx = engine.await?;
    let elsewhere = PipelineOrchestrator::new(
        Arc::new(InMemoryTaskRepository::new()),
        Arc::clone(&ctx.clock),
    );
    let unknown = elsewhere
        .create_task(StructuredComplaint::new("roads", "pothole", "Elm St"))
        .await?;
    let commit = ctx.commit_for(&unknown, TaskStatus::Triaged)?;

    let result = ctx.repository.commit_transition(&commit).await;

    assert!(
        matches!(result, Err(TaskRepositoryError::NotFound(id)) if id == unknown.id()),
        "expected not found, got {result:?}"
    );
    let page = ctx
        .repository
        .history(unknown.id(), HistoryQuery::first_page())
        .await?;
    assert!(page.entries.is_empty(), "no history may be written");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_history_pages_break_timestamp_ties_by_sequence(
    #[future] engine: Result<PostgresEngine, BoxError>,
) -> Result<(), BoxError> {
    let ctx = engine.await?;
    let task = ctx.create("roads").await?;
    let other = ctx.create("water").await?;
    let path = [
        TaskStatus::Triaged,
        TaskStatus::Assigned,
        TaskStatus::InProgress,
        TaskStatus::Resolved,
        TaskStatus::Closed,
    ];
    // The clock never moves, so every entry shares one timestamp.
    ctx.drive(task.id(), &path).await?;
    ctx.drive(other.id(), &[TaskStatus::Triaged]).await?;

    let mut sequences = Vec::new();
    let mut query = HistoryQuery::first_page().with_limit(2);
    loop {
        let page = ctx.service.history(task.id(), query).await?;
        sequences.extend(page.entries.iter().map(|entry| entry.sequence()));
        match page.next_cursor {
            Some(cursor) => query = HistoryQuery::after(cursor).with_limit(2),
            None => break,
        }
    }

    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_recent_activity_is_newest_first(
    #[future] engine: Result<PostgresEngine, BoxError>,
) -> Result<(), BoxError> {
    let ctx = engine.await?;
    let first = ctx.create("roads").await?;
    let second = ctx.create("water").await?;
    ctx.drive(first.id(), &[TaskStatus::Triaged]).await?;
    ctx.clock.advance(chrono::TimeDelta::minutes(5));
    ctx.drive(second.id(), &[TaskStatus::Rejected]).await?;

    let recent = ctx.service.recent_activity(10).await?;

    let order: Vec<_> = recent.iter().map(|entry| entry.task_id()).collect();
    assert_eq!(order, vec![second.id(), first.id()]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_oversized_department_is_rejected_before_storage(
    #[future] engine: Result<PostgresEngine, BoxError>,
) -> Result<(), BoxError> {
    let ctx = engine.await?;
    let complaint = StructuredComplaint::new(
        "x".repeat(MAX_DEPARTMENT_CHARS + 1),
        "pothole",
        "5th Ave",
    );

    let result = ctx.pipeline.create_task(complaint).await;

    assert!(
        matches!(
            result,
            Err(TaskLifecycleError::InvalidInput(InvalidInputError::FieldTooLong {
                field: "department",
                ..
            }))
        ),
        "expected a width error, got {result:?}"
    );
    let stored = ctx.service.list_tasks(&TaskFilter::default()).await?;
    assert!(stored.is_empty(), "nothing may reach the table");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_racing_commits_have_one_winner(
    #[future] engine: Result<PostgresEngine, BoxError>,
) -> Result<(), BoxError> {
    let ctx = engine.await?;
    let task = ctx.create("roads").await?;
    let triage = ctx.commit_for(&task, TaskStatus::Triaged)?;
    let reject = ctx.commit_for(&task, TaskStatus::Rejected)?;

    let (triaged, rejected) = tokio::join!(
        ctx.repository.commit_transition(&triage),
        ctx.repository.commit_transition(&reject),
    );

    let conflicts = [&triaged, &rejected]
        .into_iter()
        .filter(|result| matches!(result, Err(TaskRepositoryError::VersionConflict { .. })))
        .count();
    assert_eq!(conflicts, 1, "got {triaged:?} and {rejected:?}");
    let winner = if triaged.is_ok() { triage } else { reject };
    let stored = ctx.service.find_by_id(task.id()).await?;
    assert_eq!(stored, winner.task);
    let trail = ctx.service.audit().full_history(task.id()).await?;
    assert_eq!(trail, vec![winner.history]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_racing_transitions_apply_once(
    #[future] engine: Result<PostgresEngine, BoxError>,
) -> Result<(), BoxError> {
    let ctx = engine.await?;
    let task = ctx.create("roads").await?;
    let request = || TransitionTaskRequest::new(task.id(), TaskStatus::Triaged, "ops1");

    let (first, second, third) = tokio::join!(
        ctx.service.transition(request()),
        ctx.service.transition(request()),
        ctx.service.transition(request()),
    );

    let results = [first, second, third];
    let successes = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(successes, 1, "got {results:?}");
    assert!(
        results.iter().all(|result| matches!(
            result,
            Ok(_)
                | Err(
                    TaskLifecycleError::ConcurrentModification(_)
                        | TaskLifecycleError::IllegalTransition { .. }
                )
        )),
        "losers must see a conflict or the new status: {results:?}"
    );
    let stored = ctx.service.find_by_id(task.id()).await?;
    assert_eq!(stored.version(), TaskVersion::new(1));
    let trail = ctx.service.audit().full_history(task.id()).await?;
    assert_eq!(trail.len(), 1);
    Ok(())
}
