//! In-memory personal task board for a single user.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use aluguetudo_core::{Aggregate, DomainError, DomainResult, Entity, TaskId, UserId};

use crate::task::{AdvanceStatus, CreateTask, EditTask, Priority, Task, TaskCommand, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Earliest due date first; undated tasks sort before dated ones.
    #[default]
    DueDate,
    /// Highest priority first; a missing priority counts as low.
    Priority,
    /// Pending, then in progress, then completed.
    Status,
}

/// Filter + ordering applied by [`TaskBoard::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
    /// Empty means all statuses.
    pub statuses: Vec<TaskStatus>,
    pub sector: Option<String>,
    pub sort: SortBy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

/// Fields supplied when creating or editing a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskFields {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

/// A user's tasks, kept in insertion order.
#[derive(Debug, Clone)]
pub struct TaskBoard {
    owner: UserId,
    tasks: Vec<Task>,
}

impl TaskBoard {
    pub fn new(owner: UserId) -> Self {
        Self {
            owner,
            tasks: Vec::new(),
        }
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| *t.id() == id)
    }

    fn get_mut(&mut self, id: TaskId) -> DomainResult<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| *t.id() == id)
            .ok_or(DomainError::NotFound)
    }

    pub fn create(&mut self, fields: TaskFields, now: DateTime<Utc>) -> DomainResult<&Task> {
        let task_id = TaskId::new();
        let mut task = Task::empty(task_id);
        task.execute(&TaskCommand::Create(CreateTask {
            task_id,
            title: fields.title,
            description: fields.description,
            due_date: fields.due_date,
            sector: fields.sector,
            priority: fields.priority,
            created_by: self.owner,
            occurred_at: now,
        }))?;

        self.tasks.push(task);
        self.get(task_id).ok_or(DomainError::NotFound)
    }

    pub fn edit(&mut self, id: TaskId, fields: TaskFields, now: DateTime<Utc>) -> DomainResult<&Task> {
        let task = self.get_mut(id)?;
        task.execute(&TaskCommand::Edit(EditTask {
            task_id: id,
            title: fields.title,
            description: fields.description,
            due_date: fields.due_date,
            sector: fields.sector,
            priority: fields.priority,
            occurred_at: now,
        }))?;
        Ok(&*task)
    }

    /// The only way a task's status changes.
    pub fn advance(&mut self, id: TaskId, now: DateTime<Utc>) -> DomainResult<&Task> {
        let task = self.get_mut(id)?;
        task.execute(&TaskCommand::Advance(AdvanceStatus {
            task_id: id,
            occurred_at: now,
        }))?;
        Ok(&*task)
    }

    pub fn delete(&mut self, id: TaskId) -> DomainResult<Task> {
        let idx = self
            .tasks
            .iter()
            .position(|t| *t.id() == id)
            .ok_or(DomainError::NotFound)?;
        Ok(self.tasks.remove(idx))
    }

    pub fn list(&self, query: &TaskQuery) -> Vec<&Task> {
        let search = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let sector = query.sector.as_deref().filter(|s| !s.is_empty());

        let mut out: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| {
                search
                    .as_deref()
                    .is_none_or(|s| t.title().to_lowercase().contains(s))
            })
            .filter(|t| query.statuses.is_empty() || query.statuses.contains(&t.status()))
            .filter(|t| sector.is_none_or(|s| t.sector() == Some(s)))
            .collect();

        match query.sort {
            SortBy::DueDate => out.sort_by_key(|t| t.due_date()),
            SortBy::Priority => out.sort_by_key(|t| {
                core::cmp::Reverse(t.priority().unwrap_or(Priority::Low).rank())
            }),
            SortBy::Status => out.sort_by_key(|t| t.status().rank()),
        }
        out
    }

    pub fn summary(&self) -> TaskSummary {
        let mut summary = TaskSummary {
            total: self.tasks.len(),
            ..TaskSummary::default()
        };
        for task in &self.tasks {
            match task.status() {
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::InProgress => summary.in_progress += 1,
                TaskStatus::Completed => summary.completed += 1,
            }
        }
        summary
    }
}
