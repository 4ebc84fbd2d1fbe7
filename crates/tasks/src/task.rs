use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use aluguetudo_core::{Aggregate, DomainError, Entity, TaskId, UserId};

/// Task progress. Wire tags match the portal's original vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "em-andamento")]
    InProgress,
    #[serde(rename = "concluida")]
    Completed,
}

impl TaskStatus {
    /// The only transition the advance action may take from this status.
    pub fn next(self) -> Option<TaskStatus> {
        match self {
            TaskStatus::Pending => Some(TaskStatus::InProgress),
            TaskStatus::InProgress => Some(TaskStatus::Completed),
            TaskStatus::Completed => None,
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            TaskStatus::Pending => 1,
            TaskStatus::InProgress => 2,
            TaskStatus::Completed => 3,
        }
    }
}

impl core::str::FromStr for TaskStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendente" => Ok(TaskStatus::Pending),
            "em-andamento" => Ok(TaskStatus::InProgress),
            "concluida" => Ok(TaskStatus::Completed),
            other => Err(DomainError::validation(format!("unknown task status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "baixa")]
    Low,
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "alta")]
    High,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

/// Aggregate root: Task.
///
/// # Invariants
/// - `title` is never blank.
/// - `status` only moves forward, one step at a time, through [`AdvanceStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    id: TaskId,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    due_date: Option<NaiveDate>,
    sector: Option<String>,
    priority: Option<Priority>,
    created_by: Option<UserId>,
    created_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    created: bool,
}

impl Task {
    /// Create an empty, not-yet-created instance.
    pub fn empty(id: TaskId) -> Self {
        Self {
            id,
            title: String::new(),
            description: None,
            status: TaskStatus::Pending,
            due_date: None,
            sector: None,
            priority: None,
            created_by: None,
            created_at: None,
            created: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn sector(&self) -> Option<&str> {
        self.sector.as_deref()
    }

    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }
}

impl Entity for Task {
    type Id = TaskId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTask {
    pub task_id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub sector: Option<String>,
    pub priority: Option<Priority>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Edits everything but the status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditTask {
    pub task_id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub sector: Option<String>,
    pub priority: Option<Priority>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceStatus {
    pub task_id: TaskId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskCommand {
    Create(CreateTask),
    Edit(EditTask),
    Advance(AdvanceStatus),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCreated {
    pub task_id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub sector: Option<String>,
    pub priority: Option<Priority>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEdited {
    pub task_id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub sector: Option<String>,
    pub priority: Option<Priority>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAdvanced {
    pub task_id: TaskId,
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskEvent {
    Created(TaskCreated),
    Edited(TaskEdited),
    StatusAdvanced(StatusAdvanced),
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

fn clean_title(title: &str) -> Result<String, DomainError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::validation("task title cannot be empty"));
    }
    Ok(title.to_string())
}

fn clean_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Aggregate for Task {
    type Command = TaskCommand;
    type Event = TaskEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TaskEvent::Created(e) => {
                self.id = e.task_id;
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.due_date = e.due_date;
                self.sector = e.sector.clone();
                self.priority = e.priority;
                self.created_by = Some(e.created_by);
                self.created_at = Some(e.occurred_at);
                self.status = TaskStatus::Pending;
                self.created = true;
            }
            TaskEvent::Edited(e) => {
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.due_date = e.due_date;
                self.sector = e.sector.clone();
                self.priority = e.priority;
            }
            TaskEvent::StatusAdvanced(e) => {
                self.status = e.to;
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TaskCommand::Create(cmd) => {
                if self.created {
                    return Err(DomainError::invariant("task already exists"));
                }
                Ok(vec![TaskEvent::Created(TaskCreated {
                    task_id: cmd.task_id,
                    title: clean_title(&cmd.title)?,
                    description: clean_optional(&cmd.description),
                    due_date: cmd.due_date,
                    sector: clean_optional(&cmd.sector),
                    priority: cmd.priority,
                    created_by: cmd.created_by,
                    occurred_at: cmd.occurred_at,
                })])
            }
            TaskCommand::Edit(cmd) => {
                if !self.created {
                    return Err(DomainError::NotFound);
                }
                Ok(vec![TaskEvent::Edited(TaskEdited {
                    task_id: cmd.task_id,
                    title: clean_title(&cmd.title)?,
                    description: clean_optional(&cmd.description),
                    due_date: cmd.due_date,
                    sector: clean_optional(&cmd.sector),
                    priority: cmd.priority,
                    occurred_at: cmd.occurred_at,
                })])
            }
            TaskCommand::Advance(cmd) => {
                if !self.created {
                    return Err(DomainError::NotFound);
                }
                let to = self
                    .status
                    .next()
                    .ok_or_else(|| DomainError::invariant("task is already completed"))?;
                Ok(vec![TaskEvent::StatusAdvanced(StatusAdvanced {
                    task_id: cmd.task_id,
                    from: self.status,
                    to,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}
