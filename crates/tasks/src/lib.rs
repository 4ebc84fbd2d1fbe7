//! Personal tasks domain module.
//!
//! Business rules for tasks, implemented as deterministic domain logic
//! (no IO, no HTTP, no storage). The board is an in-memory collaborator.

pub mod board;
pub mod task;

pub use board::{SortBy, TaskBoard, TaskFields, TaskQuery, TaskSummary};
pub use task::{
    AdvanceStatus, CreateTask, EditTask, Priority, StatusAdvanced, Task, TaskCommand,
    TaskCreated, TaskEdited, TaskEvent, TaskStatus,
};
