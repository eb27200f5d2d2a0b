//! Project and task operations. Each returns a [`Fault`] on failure and is
//! meant to be run through [`crate::action::action_wrapper`].

use uuid::Uuid;
use validator::Validate;

use crate::db::Database;
use crate::error::{AppError, Fault};
use crate::models::{NewProject, NewTask, Project, Task, User};

async fn require_user(db: &Database, user_id: Uuid) -> Result<User, Fault> {
    User::find(db.pool(), user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User").into())
}

pub async fn get_project(db: &Database, project_id: Uuid) -> Result<Project, Fault> {
    Project::find(db.pool(), project_id)
        .await?
        .ok_or_else(|| AppError::not_found("Project").into())
}

pub async fn list_projects(db: &Database, user_id: Uuid) -> Result<Vec<Project>, Fault> {
    require_user(db, user_id).await?;
    Ok(Project::list_for_user(db.pool(), user_id).await?)
}

pub async fn create_project(
    db: &Database,
    user_id: Uuid,
    input: NewProject,
) -> Result<Project, Fault> {
    input.validate()?;
    require_user(db, user_id).await?;

    let project = Project::new(user_id, input);
    project.insert(db.pool()).await?;
    Ok(project)
}

pub async fn list_tasks(db: &Database, project_id: Uuid) -> Result<Vec<Task>, Fault> {
    get_project(db, project_id).await?;
    Ok(Task::list_for_project(db.pool(), project_id).await?)
}

pub async fn create_task(db: &Database, project_id: Uuid, input: NewTask) -> Result<Task, Fault> {
    input.validate()?;
    get_project(db, project_id).await?;

    let task = Task::new(project_id, input);
    task.insert(db.pool()).await?;
    Ok(task)
}
