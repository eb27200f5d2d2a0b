use actix_web::{get, post, web};
use uuid::Uuid;

use crate::{
    action::{action_wrapper, ActionOptions, ActionResult},
    context::AppContext,
    models::{NewTask, Task},
    services,
};

/// Lists the tasks of a project, oldest first.
///
/// ## Responses:
/// - `200 OK`: `{ success: true, data: [Task] }`.
/// - `404 Not Found`: the project does not exist.
#[get("/projects/{project_id}/tasks")]
pub async fn list_tasks(
    ctx: web::Data<AppContext>,
    project_id: web::Path<Uuid>,
) -> ActionResult<Vec<Task>> {
    let db = &ctx.db;
    let action = action_wrapper(
        &ctx.logger,
        |project_id: Uuid| services::list_tasks(db, project_id),
        ActionOptions::named("list-tasks"),
    );
    action.call(project_id.into_inner()).await
}

/// Creates a task in a project.
///
/// ## Request Body:
/// `{ title, description?, status?, priority?, dueDate? }`. Status defaults
/// to `TODO` and priority to `MEDIUM`.
///
/// ## Responses:
/// - `200 OK`: `{ success: true, data: Task }`.
/// - `400 Bad Request`: validation failed; `error.field` names the field.
/// - `404 Not Found`: the project does not exist.
/// - `429 Too Many Requests`: rate limit exceeded.
#[post("/projects/{project_id}/tasks")]
pub async fn create_task(
    ctx: web::Data<AppContext>,
    project_id: web::Path<Uuid>,
    input: web::Json<NewTask>,
) -> ActionResult<Task> {
    let db = &ctx.db;
    let action = action_wrapper(
        &ctx.logger,
        |(project_id, input): (Uuid, NewTask)| services::create_task(db, project_id, input),
        ActionOptions::named("create-task").log_input(true),
    );
    action.call((project_id.into_inner(), input.into_inner())).await
}
