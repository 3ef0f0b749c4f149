//! `PostgreSQL` repository implementation for task lifecycle storage.

use super::{
    models::{BreachRow, HistoryRow, TaskLifecycleChangeset, TaskRow},
    schema::{sla_breaches, task_status_history, tasks},
};
use crate::task::{
    domain::{
        Actor, BreachId, BreachRecord, Category, ComplaintId, ComplaintOrigin, Department,
        HistoryDigest, HistoryEntry, HistoryEntryId, HistoryPage, HistoryQuery, Location,
        NewHistoryEntry, PersistedBreachData, PersistedHistoryEntry, PersistedTaskData, Priority,
        Remark, StatusOccurrence, Task, TaskId, TaskStatus, TaskVersion,
    },
    ports::{
        TaskFilter, TaskRepository, TaskRepositoryError, TaskRepositoryResult, TransitionCommit,
    },
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task repository.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: TaskPgPool,
}

impl From<DieselError> for TaskRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

impl PostgresTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let row = task_to_row(task)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(tasks::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TaskRepositoryError::DuplicateTask(task_id)
                    }
                    _ => TaskRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn list(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        let department = filter
            .department
            .as_ref()
            .map(|department| department.as_str().to_owned());
        let status = filter.status;

        self.run_blocking(move |connection| {
            let mut query = tasks::table.select(TaskRow::as_select()).into_boxed();
            if let Some(department) = department {
                query = query.filter(tasks::department.eq(department));
            }
            if let Some(status) = status {
                query = query.filter(tasks::status.eq(status.as_str()));
            }
            let rows = query
                .order(tasks::created_at.desc())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn list_sla_bearing(&self) -> TaskRepositoryResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::deadline.is_not_null())
                .select(TaskRow::as_select())
                .order(tasks::created_at.desc())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn commit_transition(&self, commit: &TransitionCommit) -> TaskRepositoryResult<bool> {
        let task_id = commit.task.id();
        let expected = commit.expected_version;
        let expected_value = version_to_i64(expected)?;
        let changeset = lifecycle_changeset(&commit.task)?;
        let history_row = history_to_row(&commit.history)?;
        let breach_row = commit.breach.as_ref().map(breach_to_row);

        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                let updated = diesel::update(
                    tasks::table
                        .filter(tasks::id.eq(task_id.into_inner()))
                        .filter(tasks::version.eq(expected_value)),
                )
                .set(&changeset)
                .execute(tx)?;

                if updated == 0 {
                    let exists: i64 = tasks::table
                        .filter(tasks::id.eq(task_id.into_inner()))
                        .count()
                        .get_result(tx)?;
                    return Err(if exists == 0 {
                        TaskRepositoryError::NotFound(task_id)
                    } else {
                        TaskRepositoryError::VersionConflict { task_id, expected }
                    });
                }

                let breach_recorded = match &breach_row {
                    Some(row) => insert_breach_row(tx, row)?,
                    None => false,
                };
                diesel::insert_into(task_status_history::table)
                    .values(&history_row)
                    .execute(tx)?;
                Ok(breach_recorded)
            })
        })
        .await
    }

    async fn insert_breach_if_absent(&self, breach: &BreachRecord) -> TaskRepositoryResult<bool> {
        let row = breach_to_row(breach);
        self.run_blocking(move |connection| insert_breach_row(connection, &row))
            .await
    }

    async fn history(
        &self,
        task_id: TaskId,
        query: HistoryQuery,
    ) -> TaskRepositoryResult<HistoryPage> {
        let fetch = i64::try_from(query.limit.saturating_add(1))
            .map_err(TaskRepositoryError::persistence)?;
        let cursor = query
            .after
            .map(|cursor| {
                i64::try_from(cursor.sequence)
                    .map(|sequence| (cursor.recorded_at, sequence))
                    .map_err(TaskRepositoryError::persistence)
            })
            .transpose()?;

        self.run_blocking(move |connection| {
            let mut statement = task_status_history::table
                .filter(task_status_history::task_id.eq(task_id.into_inner()))
                .select(HistoryRow::as_select())
                .into_boxed();
            if let Some((recorded_at, sequence)) = cursor {
                statement = statement.filter(
                    task_status_history::recorded_at.gt(recorded_at).or(
                        task_status_history::recorded_at
                            .eq(recorded_at)
                            .and(task_status_history::sequence.gt(sequence)),
                    ),
                );
            }
            let rows = statement
                .order((
                    task_status_history::recorded_at.asc(),
                    task_status_history::sequence.asc(),
                ))
                .limit(fetch)
                .load::<HistoryRow>(connection)?;
            let entries = rows
                .into_iter()
                .map(row_to_history)
                .collect::<TaskRepositoryResult<Vec<_>>>()?;
            Ok(HistoryPage::from_overfetched(entries, query.limit))
        })
        .await
    }

    async fn recent_history(&self, limit: usize) -> TaskRepositoryResult<Vec<HistoryEntry>> {
        let fetch = i64::try_from(limit).map_err(TaskRepositoryError::persistence)?;
        self.run_blocking(move |connection| {
            let rows = task_status_history::table
                .select(HistoryRow::as_select())
                .order((
                    task_status_history::recorded_at.desc(),
                    task_status_history::sequence.desc(),
                ))
                .limit(fetch)
                .load::<HistoryRow>(connection)?;
            rows.into_iter().map(row_to_history).collect()
        })
        .await
    }

    async fn list_breaches(&self) -> TaskRepositoryResult<Vec<BreachRecord>> {
        self.run_blocking(move |connection| {
            let rows = sla_breaches::table
                .select(BreachRow::as_select())
                .order(sla_breaches::detected_at.desc())
                .load::<BreachRow>(connection)?;
            rows.into_iter().map(row_to_breach).collect()
        })
        .await
    }

    async fn list_open_breaches(&self) -> TaskRepositoryResult<Vec<BreachRecord>> {
        self.run_blocking(move |connection| {
            let rows = diesel::sql_query(concat!(
                "SELECT b.id, b.task_id, b.status, b.status_entered_at, b.deadline, ",
                "b.detected_at, b.elapsed_seconds, b.sla_seconds, b.department, b.priority ",
                "FROM sla_breaches b ",
                "JOIN tasks t ON t.id = b.task_id ",
                "AND t.status = b.status ",
                "AND t.status_entered_at = b.status_entered_at ",
                "ORDER BY b.detected_at DESC",
            ))
            .load::<BreachRow>(connection)?;
            rows.into_iter().map(row_to_breach).collect()
        })
        .await
    }
}

/// Inserts a breach row unless its occurrence is already recorded.
///
/// Relies on the unique index over `(task_id, status, status_entered_at)`.
fn insert_breach_row(connection: &mut PgConnection, row: &BreachRow) -> TaskRepositoryResult<bool> {
    let inserted = diesel::insert_into(sla_breaches::table)
        .values(row)
        .on_conflict((
            sla_breaches::task_id,
            sla_breaches::status,
            sla_breaches::status_entered_at,
        ))
        .do_nothing()
        .execute(connection)?;
    Ok(inserted > 0)
}

fn version_to_i64(version: TaskVersion) -> TaskRepositoryResult<i64> {
    i64::try_from(version.value()).map_err(TaskRepositoryError::persistence)
}

fn task_to_row(task: &Task) -> TaskRepositoryResult<TaskRow> {
    let origin = task.origin();
    Ok(TaskRow {
        id: task.id().into_inner(),
        complaint_id: origin.complaint_id.into_inner(),
        department: origin.department.as_str().to_owned(),
        category: origin.category.as_str().to_owned(),
        location: origin.location.as_str().to_owned(),
        description: origin.description.clone(),
        priority: origin.priority.as_str().to_owned(),
        status: task.status().as_str().to_owned(),
        created_at: task.created_at(),
        status_entered_at: task.status_entered_at(),
        deadline: task.deadline(),
        version: version_to_i64(task.version())?,
        history_head: task.history_head().map(|digest| digest.to_hex()),
    })
}

fn lifecycle_changeset(task: &Task) -> TaskRepositoryResult<TaskLifecycleChangeset> {
    Ok(TaskLifecycleChangeset {
        status: task.status().as_str().to_owned(),
        status_entered_at: task.status_entered_at(),
        deadline: task.deadline(),
        version: version_to_i64(task.version())?,
        history_head: task.history_head().map(|digest| digest.to_hex()),
    })
}

fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let TaskRow {
        id,
        complaint_id,
        department,
        category,
        location,
        description,
        priority,
        status,
        created_at,
        status_entered_at,
        deadline,
        version,
        history_head,
    } = row;

    let origin = ComplaintOrigin {
        complaint_id: ComplaintId::from_uuid(complaint_id),
        department: Department::new(department).map_err(TaskRepositoryError::persistence)?,
        category: Category::new(category).map_err(TaskRepositoryError::persistence)?,
        location: Location::new(location).map_err(TaskRepositoryError::persistence)?,
        description,
        priority: Priority::try_from(priority.as_str())
            .map_err(TaskRepositoryError::persistence)?,
    };
    let data = PersistedTaskData {
        id: TaskId::from_uuid(id),
        origin,
        status: parse_status(&status)?,
        created_at,
        status_entered_at,
        deadline,
        version: TaskVersion::new(
            u64::try_from(version).map_err(TaskRepositoryError::persistence)?,
        ),
        history_head: parse_optional_digest(history_head)?,
    };
    Ok(Task::from_persisted(data))
}

fn history_to_row(entry: &HistoryEntry) -> TaskRepositoryResult<HistoryRow> {
    Ok(HistoryRow {
        id: entry.id().into_inner(),
        task_id: entry.task_id().into_inner(),
        sequence: i64::try_from(entry.sequence()).map_err(TaskRepositoryError::persistence)?,
        from_status: entry.from().as_str().to_owned(),
        to_status: entry.to().as_str().to_owned(),
        changed_by: entry.changed_by().as_str().to_owned(),
        remark: entry.remark().as_str().to_owned(),
        recorded_at: entry.recorded_at(),
        previous_digest: entry.previous_digest().map(|digest| digest.to_hex()),
        digest: entry.digest().to_hex(),
    })
}

fn row_to_history(row: HistoryRow) -> TaskRepositoryResult<HistoryEntry> {
    let HistoryRow {
        id,
        task_id,
        sequence,
        from_status,
        to_status,
        changed_by,
        remark,
        recorded_at,
        previous_digest,
        digest,
    } = row;

    let content = NewHistoryEntry {
        task_id: TaskId::from_uuid(task_id),
        sequence: u64::try_from(sequence).map_err(TaskRepositoryError::persistence)?,
        from: parse_status(&from_status)?,
        to: parse_status(&to_status)?,
        changed_by: Actor::from_persisted(changed_by),
        remark: Remark::from_persisted(remark),
        recorded_at,
        previous_digest: parse_optional_digest(previous_digest)?,
    };
    Ok(HistoryEntry::from_persisted(PersistedHistoryEntry {
        id: HistoryEntryId::from_uuid(id),
        content,
        digest: HistoryDigest::from_hex(&digest).map_err(TaskRepositoryError::persistence)?,
    }))
}

fn breach_to_row(breach: &BreachRecord) -> BreachRow {
    let occurrence = breach.occurrence();
    BreachRow {
        id: breach.id().into_inner(),
        task_id: occurrence.task_id.into_inner(),
        status: occurrence.status.as_str().to_owned(),
        status_entered_at: occurrence.entered_at,
        deadline: breach.deadline(),
        detected_at: breach.detected_at(),
        elapsed_seconds: breach.elapsed().num_seconds(),
        sla_seconds: breach.sla().num_seconds(),
        department: breach.department().as_str().to_owned(),
        priority: breach.priority().as_str().to_owned(),
    }
}

fn row_to_breach(row: BreachRow) -> TaskRepositoryResult<BreachRecord> {
    let BreachRow {
        id,
        task_id,
        status,
        status_entered_at,
        deadline,
        detected_at,
        elapsed_seconds,
        sla_seconds,
        department,
        priority,
    } = row;

    Ok(BreachRecord::from_persisted(PersistedBreachData {
        id: BreachId::from_uuid(id),
        occurrence: StatusOccurrence {
            task_id: TaskId::from_uuid(task_id),
            status: parse_status(&status)?,
            entered_at: status_entered_at,
        },
        deadline,
        detected_at,
        elapsed_seconds,
        sla_seconds,
        department: Department::new(department).map_err(TaskRepositoryError::persistence)?,
        priority: Priority::try_from(priority.as_str())
            .map_err(TaskRepositoryError::persistence)?,
    }))
}

fn parse_status(value: &str) -> TaskRepositoryResult<TaskStatus> {
    TaskStatus::try_from(value).map_err(TaskRepositoryError::persistence)
}

fn parse_optional_digest(value: Option<String>) -> TaskRepositoryResult<Option<HistoryDigest>> {
    value
        .map(|hex| HistoryDigest::from_hex(&hex).map_err(TaskRepositoryError::persistence))
        .transpose()
}
