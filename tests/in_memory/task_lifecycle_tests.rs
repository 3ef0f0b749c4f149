//! In-memory integration tests for task lifecycle operations.

use std::sync::Arc;

use chrono::TimeDelta;
use civicworks::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{ALL_STATUSES, HistoryEntry, TaskStatus},
    ports::TaskRepository,
    services::{StructuredComplaint, TaskLifecycleError, TransitionTaskRequest},
};
use rstest::rstest;

use super::helpers::{Engine, ManualClock, clock, engine, path_to, t0};

type MemoryEngine = Engine<InMemoryTaskRepository>;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn complaint_creates_received_task_with_deadline(engine: MemoryEngine) -> eyre::Result<()> {
    let complaint = StructuredComplaint::new("roads", "pothole", "5th Ave");

    let task = engine.pipeline.create_task(complaint).await?;

    eyre::ensure!(task.status() == TaskStatus::Received, "unexpected status");
    eyre::ensure!(
        task.deadline() == Some(t0() + TimeDelta::hours(24)),
        "deadline should follow the Received service level"
    );
    let stored = engine.repository.find_by_id(task.id()).await?;
    eyre::ensure!(stored.as_ref() == Some(&task), "task should be persisted");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn assigned_task_moves_to_in_progress_with_audit_entry(
    engine: MemoryEngine,
) -> eyre::Result<()> {
    let task = engine.create("roads").await?;
    engine
        .drive(task.id(), &[TaskStatus::Triaged, TaskStatus::Assigned])
        .await?;
    engine.clock.advance(TimeDelta::hours(3));

    let request = TransitionTaskRequest::new(task.id(), TaskStatus::InProgress, "ops1")
        .with_remark("crew dispatched");
    let updated = engine.service.transition(request).await?;

    let now = t0() + TimeDelta::hours(3);
    eyre::ensure!(updated.status() == TaskStatus::InProgress, "status not updated");
    eyre::ensure!(
        updated.deadline() == Some(now + TimeDelta::hours(72)),
        "deadline not recomputed for InProgress"
    );
    let history = engine.service.audit().full_history(task.id()).await?;
    let last = history
        .last()
        .ok_or_else(|| eyre::eyre!("history should not be empty"))?;
    eyre::ensure!(
        (last.from(), last.to()) == (TaskStatus::Assigned, TaskStatus::InProgress),
        "unexpected edge in history"
    );
    eyre::ensure!(last.changed_by().as_str() == "ops1", "actor not recorded");
    eyre::ensure!(last.remark().as_str() == "crew dispatched", "remark not recorded");
    eyre::ensure!(history.len() == 3, "expected three entries, found {}", history.len());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closed_task_cannot_jump_back_to_in_progress(engine: MemoryEngine) -> eyre::Result<()> {
    let task = engine.create("roads").await?;
    let closed = engine.drive(task.id(), &path_to(TaskStatus::Closed)).await?;
    let history_before = engine.service.audit().full_history(task.id()).await?;

    let request = TransitionTaskRequest::new(task.id(), TaskStatus::InProgress, "ops1");
    let result = engine.service.transition(request).await;

    eyre::ensure!(
        matches!(result, Err(TaskLifecycleError::IllegalTransition { .. })),
        "expected IllegalTransition, got {result:?}"
    );
    eyre::ensure!(
        engine.service.find_by_id(task.id()).await? == closed,
        "task changed after rejected transition"
    );
    eyre::ensure!(
        engine.service.audit().full_history(task.id()).await? == history_before,
        "history changed after rejected transition"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn every_illegal_pair_is_rejected_without_side_effects(
    #[from(clock)] shared_clock: Arc<ManualClock>,
) -> eyre::Result<()> {
    for from in ALL_STATUSES {
        for target in ALL_STATUSES
            .into_iter()
            .filter(|target| !from.can_transition_to(*target))
        {
            let engine = Engine::new(
                Arc::new(InMemoryTaskRepository::new()),
                Arc::clone(&shared_clock),
            );
            let task = engine.create("roads").await?;
            let before = engine.drive(task.id(), &path_to(from)).await?;
            engine.clock.advance(TimeDelta::hours(100));
            let breaches_before = engine.service.detector().breaches().await?;

            let request = TransitionTaskRequest::new(task.id(), target, "ops1");
            let result = engine.service.transition(request).await;

            eyre::ensure!(
                matches!(
                    result,
                    Err(TaskLifecycleError::IllegalTransition { from: f, to: t, .. })
                        if f == from && t == target
                ),
                "{from} -> {target} should be illegal, got {result:?}"
            );
            eyre::ensure!(
                engine.service.find_by_id(task.id()).await? == before,
                "{from} -> {target} mutated the task"
            );
            let history = engine.service.audit().full_history(task.id()).await?;
            eyre::ensure!(
                history.len() == path_to(from).len(),
                "{from} -> {target} changed the history length"
            );
            eyre::ensure!(
                engine.service.detector().breaches().await? == breaches_before,
                "{from} -> {target} changed the breach set"
            );
        }
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn history_forms_an_unbroken_chain_from_received(engine: MemoryEngine) -> eyre::Result<()> {
    let task = engine.create("water").await?;
    let path = [
        TaskStatus::Triaged,
        TaskStatus::Assigned,
        TaskStatus::InProgress,
        TaskStatus::Resolved,
        TaskStatus::Assigned,
        TaskStatus::InProgress,
        TaskStatus::Resolved,
        TaskStatus::Closed,
        TaskStatus::Assigned,
    ];
    for status in path {
        engine.clock.advance(TimeDelta::minutes(90));
        engine.drive(task.id(), &[status]).await?;
    }

    let history = engine.service.audit().full_history(task.id()).await?;
    let mut expected_from = TaskStatus::Received;
    for entry in &history {
        eyre::ensure!(
            entry.from() == expected_from,
            "entry {} starts from {}, expected {expected_from}",
            entry.sequence(),
            entry.from()
        );
        expected_from = entry.to();
    }
    eyre::ensure!(
        history
            .windows(2)
            .all(|pair| matches!(pair, [a, b] if a.recorded_at() <= b.recorded_at())),
        "history is not in timestamp order"
    );
    let sequences: Vec<u64> = history.iter().map(HistoryEntry::sequence).collect();
    eyre::ensure!(
        sequences == (1..=9).collect::<Vec<u64>>(),
        "sequences are not contiguous: {sequences:?}"
    );
    engine.service.verify_history(task.id()).await?;
    Ok(())
}
