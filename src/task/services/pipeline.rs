//! Complaint intake: turns structured complaints into new tasks.

use super::TaskLifecycleResult;
use crate::task::{
    domain::{
        Category, ComplaintId, ComplaintOrigin, Department, InvalidInputError, Location,
        Priority, Task,
    },
    ports::TaskRepository,
};
use mockable::Clock;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Complaint as classified by the perception collaborator.
///
/// Every field is optional on the wire; [`PipelineOrchestrator::create_task`]
/// enforces which ones are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StructuredComplaint {
    complaint_id: Option<ComplaintId>,
    description: Option<String>,
    location: Option<String>,
    department: Option<String>,
    category: Option<String>,
    urgency: Option<String>,
}

impl StructuredComplaint {
    /// Creates a complaint with the required routing fields.
    #[must_use]
    pub fn new(
        department: impl Into<String>,
        category: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            department: Some(department.into()),
            category: Some(category.into()),
            location: Some(location.into()),
            ..Self::default()
        }
    }

    /// Sets the source complaint reference.
    #[must_use]
    pub const fn with_complaint_id(mut self, complaint_id: ComplaintId) -> Self {
        self.complaint_id = Some(complaint_id);
        self
    }

    /// Sets the citizen's description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the urgency label, e.g. `high` or `urgent`.
    #[must_use]
    pub fn with_urgency(mut self, urgency: impl Into<String>) -> Self {
        self.urgency = Some(urgency.into());
        self
    }

    fn into_origin(self) -> Result<ComplaintOrigin, InvalidInputError> {
        let department = Department::new(self.department.unwrap_or_default())?;
        let category = Category::new(self.category.unwrap_or_default())?;
        let location = Location::new(self.location.unwrap_or_default())?;
        let priority = self
            .urgency
            .as_deref()
            .map(str::trim)
            .filter(|urgency| !urgency.is_empty())
            .map_or(Ok(Priority::default()), Priority::try_from)?;
        let description = self
            .description
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());
        Ok(ComplaintOrigin {
            complaint_id: self.complaint_id.unwrap_or_default(),
            department,
            category,
            location,
            description,
            priority,
        })
    }
}

/// Entry point of the engine for newly classified complaints.
#[derive(Clone)]
pub struct PipelineOrchestrator<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> PipelineOrchestrator<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a pipeline orchestrator.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Creates a task in `Received` from a structured complaint.
    ///
    /// No history entry is written; the first entry is produced by the
    /// task's first transition.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskLifecycleError::InvalidInput`] when department,
    /// category or location is missing or the urgency is unknown, and
    /// [`super::TaskLifecycleError::Repository`] when the task cannot be
    /// stored.
    pub async fn create_task(&self, complaint: StructuredComplaint) -> TaskLifecycleResult<Task> {
        let origin = complaint.into_origin()?;
        let task = Task::new_from_complaint(origin, &*self.clock);
        self.repository.store(&task).await?;
        info!(
            task_id = %task.id(),
            complaint_id = %task.origin().complaint_id,
            department = %task.origin().department,
            priority = %task.origin().priority,
            "task created from complaint"
        );
        Ok(task)
    }
}
