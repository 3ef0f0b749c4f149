//! In-memory repository for the task lifecycle engine.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::task::{
    domain::{
        BreachRecord, HistoryEntry, HistoryPage, HistoryQuery, StatusOccurrence, Task, TaskId,
    },
    ports::{
        TaskFilter, TaskRepository, TaskRepositoryError, TaskRepositoryResult, TransitionCommit,
    },
};

/// Thread-safe in-memory task repository.
///
/// A single lock guards tasks, history and breaches together, which makes
/// every [`TransitionCommit`] atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, Task>,
    history: HashMap<TaskId, Vec<HistoryEntry>>,
    breaches: Vec<BreachRecord>,
    breached_occurrences: HashSet<StatusOccurrence>,
}

impl InMemoryTaskState {
    fn insert_breach_if_absent(&mut self, breach: &BreachRecord) -> bool {
        if !self.breached_occurrences.insert(breach.occurrence()) {
            return false;
        }
        self.breaches.push(breach.clone());
        true
    }
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> TaskRepositoryResult<RwLockReadGuard<'_, InMemoryTaskState>> {
        self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> TaskRepositoryResult<RwLockWriteGuard<'_, InMemoryTaskState>> {
        self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

fn newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        if state.tasks.contains_key(&task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.read()?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn list(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn list_sla_bearing(&self) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| task.deadline().is_some())
            .cloned()
            .collect();
        newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn commit_transition(&self, commit: &TransitionCommit) -> TaskRepositoryResult<bool> {
        let task_id = commit.task.id();
        let mut state = self.write()?;

        let stored_version = state
            .tasks
            .get(&task_id)
            .ok_or(TaskRepositoryError::NotFound(task_id))?
            .version();
        if stored_version != commit.expected_version {
            return Err(TaskRepositoryError::VersionConflict {
                task_id,
                expected: commit.expected_version,
            });
        }

        let breach_recorded = commit
            .breach
            .as_ref()
            .is_some_and(|breach| state.insert_breach_if_absent(breach));
        state
            .history
            .entry(task_id)
            .or_default()
            .push(commit.history.clone());
        state.tasks.insert(task_id, commit.task.clone());
        Ok(breach_recorded)
    }

    async fn insert_breach_if_absent(&self, breach: &BreachRecord) -> TaskRepositoryResult<bool> {
        let mut state = self.write()?;
        Ok(state.insert_breach_if_absent(breach))
    }

    async fn history(
        &self,
        task_id: TaskId,
        query: HistoryQuery,
    ) -> TaskRepositoryResult<HistoryPage> {
        let state = self.read()?;
        let entries: Vec<HistoryEntry> = state
            .history
            .get(&task_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| query.after.is_none_or(|cursor| cursor.precedes(entry)))
                    .take(query.limit.saturating_add(1))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(HistoryPage::from_overfetched(entries, query.limit))
    }

    async fn recent_history(&self, limit: usize) -> TaskRepositoryResult<Vec<HistoryEntry>> {
        let state = self.read()?;
        let mut entries: Vec<HistoryEntry> = state.history.values().flatten().cloned().collect();
        entries.sort_by(|left, right| {
            (right.recorded_at(), right.sequence()).cmp(&(left.recorded_at(), left.sequence()))
        });
        entries.truncate(limit);
        Ok(entries)
    }

    async fn list_breaches(&self) -> TaskRepositoryResult<Vec<BreachRecord>> {
        let state = self.read()?;
        let mut breaches = state.breaches.clone();
        breaches.sort_by(|left, right| right.detected_at().cmp(&left.detected_at()));
        Ok(breaches)
    }

    async fn list_open_breaches(&self) -> TaskRepositoryResult<Vec<BreachRecord>> {
        let state = self.read()?;
        let mut open: Vec<BreachRecord> = state
            .breaches
            .iter()
            .filter(|breach| {
                state
                    .tasks
                    .get(&breach.task_id())
                    .is_some_and(|task| breach.is_open_for(task))
            })
            .cloned()
            .collect();
        open.sort_by(|left, right| right.detected_at().cmp(&left.detected_at()));
        Ok(open)
    }
}
