use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};
use uuid::Uuid;
use validator::Validate;

/// Represents the priority of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Represents the status of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task is yet to be started.
    #[default]
    Todo,
    /// Task is currently being worked on.
    InProgress,
    /// Task is completed.
    Done,
}

/// Input structure for creating a task.
/// Contains validation rules for its fields.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    /// Maximum length of 1000 characters if provided.
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    /// Defaults to `TODO`.
    #[serde(default)]
    pub status: Option<TaskStatus>,

    /// Defaults to `MEDIUM`.
    #[serde(default)]
    pub priority: Option<TaskPriority>,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    /// Project the task belongs to.
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const TASK_COLUMNS: &str =
    "id, project_id, title, description, status, priority, due_date, created_at, updated_at";

impl Task {
    /// Creates a new `Task` for `project_id`, filling in defaults for
    /// anything the input leaves out.
    pub fn new(project_id: Uuid, input: NewTask) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            title: input.title,
            description: input.description,
            status: input.status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn insert<'e, E>(&self, executor: E) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            "INSERT INTO tasks (id, project_id, title, description, status, priority, due_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(self.project_id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(self.status)
        .bind(self.priority)
        .bind(self.due_date)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn list_for_project<'e, E>(
        executor: E,
        project_id: Uuid,
    ) -> Result<Vec<Task>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE project_id = ? ORDER BY created_at, rowid",
            TASK_COLUMNS
        ))
        .bind(project_id)
        .fetch_all(executor)
        .await
    }

    pub async fn list_all<'e, E>(executor: E) -> Result<Vec<Task>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks ORDER BY created_at, rowid",
            TASK_COLUMNS
        ))
        .fetch_all(executor)
        .await
    }

    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
            .fetch_one(executor)
            .await
    }

    pub async fn delete_all<'e, E>(executor: E) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks").execute(executor).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let project_id = Uuid::new_v4();
        let input = NewTask {
            title: "Test Task".to_string(),
            description: Some("Test Description".to_string()),
            priority: Some(TaskPriority::High),
            status: None,
            due_date: Some(Utc::now()),
        };

        let task = Task::new(project_id, input);
        assert_eq!(task.title, "Test Task");
        assert_eq!(task.project_id, project_id);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::High);
    }

    #[test]
    fn test_task_validation() {
        let valid_input = NewTask {
            title: "Valid Task".to_string(),
            description: Some("Valid Description".to_string()),
            priority: Some(TaskPriority::High),
            status: Some(TaskStatus::Todo),
            due_date: Some(Utc::now()),
        };
        assert!(valid_input.validate().is_ok());

        let invalid_input = NewTask {
            title: "".to_string(), // Empty title
            description: Some("Valid Description".to_string()),
            priority: Some(TaskPriority::High),
            status: Some(TaskStatus::Todo),
            due_date: Some(Utc::now()),
        };
        assert!(invalid_input.validate().is_err());
    }

    #[test]
    fn test_enum_wire_format() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            "IN_PROGRESS"
        );
        assert_eq!(serde_json::to_value(TaskPriority::Low).unwrap(), "LOW");

        let input: NewTask =
            serde_json::from_str(r#"{"title":"Ship it","status":"DONE","dueDate":"2026-03-15T00:00:00Z"}"#)
                .unwrap();
        assert_eq!(input.status, Some(TaskStatus::Done));
        assert!(input.priority.is_none());
        assert!(input.due_date.is_some());
    }
}
