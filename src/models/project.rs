use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};
use uuid::Uuid;
use validator::Validate;

/// Lifecycle stage of a project.
/// Stored as its SCREAMING_SNAKE_CASE name, constrained by a `CHECK` in the schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Planning,
    Active,
    Completed,
    Archived,
}

/// Input for creating a project.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    /// Must be between 1 and 100 characters.
    #[validate(length(
        min = 1,
        max = 100,
        message = "Project name must be between 1 and 100 characters"
    ))]
    pub name: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    /// Defaults to `PLANNING`.
    #[serde(default)]
    pub status: Option<ProjectStatus>,
}

/// A project as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PROJECT_COLUMNS: &str = "id, user_id, name, description, status, created_at, updated_at";

impl Project {
    pub fn new(user_id: Uuid, input: NewProject) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: input.name,
            description: input.description,
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn insert<'e, E>(&self, executor: E) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            "INSERT INTO projects (id, user_id, name, description, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(&self.name)
        .bind(&self.description)
        .bind(self.status)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find<'e, E>(executor: E, id: Uuid) -> Result<Option<Project>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE id = ?",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// A user's projects, oldest first.
    pub async fn list_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Project>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE user_id = ? ORDER BY created_at, rowid",
            PROJECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(executor)
            .await
    }

    pub async fn delete_all<'e, E>(executor: E) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM projects").execute(executor).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_creation_defaults_to_planning() {
        let owner = Uuid::new_v4();
        let project = Project::new(
            owner,
            NewProject {
                name: "Website Redesign".to_string(),
                description: None,
                status: None,
            },
        );
        assert_eq!(project.user_id, owner);
        assert_eq!(project.status, ProjectStatus::Planning);
        assert_eq!(project.created_at, project.updated_at);
    }

    #[test]
    fn test_project_validation() {
        let valid = NewProject {
            name: "Mobile App Development".to_string(),
            description: Some("Native apps".to_string()),
            status: Some(ProjectStatus::Active),
        };
        assert!(valid.validate().is_ok());

        let invalid = NewProject {
            name: "".to_string(), // Empty name
            description: None,
            status: None,
        };
        assert!(invalid.validate().is_err());

        let too_long = NewProject {
            name: "x".repeat(101),
            description: None,
            status: None,
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_value(ProjectStatus::Completed).unwrap(),
            "COMPLETED"
        );
        let input: NewProject =
            serde_json::from_str(r#"{"name":"Q1","status":"ARCHIVED"}"#).unwrap();
        assert_eq!(input.status, Some(ProjectStatus::Archived));
        assert!(serde_json::from_str::<NewProject>(r#"{"name":"Q1","status":"PAUSED"}"#).is_err());
    }
}
