use serde::Deserialize;

use aluguetudo_tasks::{SortBy, TaskQuery, TaskStatus};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub q: Option<String>,
    /// Comma-separated statuses, e.g. `pendente,em-andamento`.
    pub status: Option<String>,
    pub sector: Option<String>,
    pub sort: Option<String>,
}

// -------------------------
// Mapping helpers
// -------------------------

impl TaskListQuery {
    pub fn to_query(&self) -> Result<TaskQuery, axum::response::Response> {
        let statuses = match self.status.as_deref() {
            None => Vec::new(),
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<TaskStatus>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(errors::domain_error_to_response)?,
        };

        Ok(TaskQuery {
            search: self.q.clone(),
            statuses,
            sector: self.sector.clone(),
            sort: parse_sort(self.sort.as_deref())?,
        })
    }
}

pub fn parse_sort(s: Option<&str>) -> Result<SortBy, axum::response::Response> {
    match s.map(|s| s.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("due_date") | Some("data") => Ok(SortBy::DueDate),
        Some("priority") | Some("prioridade") => Ok(SortBy::Priority),
        Some("status") => Ok(SortBy::Status),
        Some(_) => Err(errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "invalid_sort",
            "sort must be one of: due_date, priority, status",
        )),
    }
}
