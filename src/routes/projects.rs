use actix_web::{get, post, web};
use uuid::Uuid;

use crate::{
    action::{action_wrapper, ActionOptions, ActionResult},
    context::AppContext,
    models::{NewProject, Project},
    services,
};

/// Lists the projects owned by a user.
///
/// ## Responses:
/// - `200 OK`: `{ success: true, data: [Project] }`.
/// - `404 Not Found`: the user does not exist.
#[get("/users/{user_id}/projects")]
pub async fn list_projects(
    ctx: web::Data<AppContext>,
    user_id: web::Path<Uuid>,
) -> ActionResult<Vec<Project>> {
    let db = &ctx.db;
    let action = action_wrapper(
        &ctx.logger,
        |user_id: Uuid| services::list_projects(db, user_id),
        ActionOptions::named("list-projects"),
    );
    action.call(user_id.into_inner()).await
}

/// Creates a project for a user.
///
/// ## Request Body:
/// `{ name, description?, status? }`; `status` defaults to `PLANNING`.
///
/// ## Responses:
/// - `200 OK`: `{ success: true, data: Project }`.
/// - `400 Bad Request`: validation failed; `error.field` names the field.
/// - `404 Not Found`: the user does not exist.
/// - `429 Too Many Requests`: rate limit exceeded.
#[post("/users/{user_id}/projects")]
pub async fn create_project(
    ctx: web::Data<AppContext>,
    user_id: web::Path<Uuid>,
    input: web::Json<NewProject>,
) -> ActionResult<Project> {
    let db = &ctx.db;
    let action = action_wrapper(
        &ctx.logger,
        |(user_id, input): (Uuid, NewProject)| services::create_project(db, user_id, input),
        ActionOptions::named("create-project").log_input(true),
    );
    action.call((user_id.into_inner(), input.into_inner())).await
}

/// Retrieves a single project.
///
/// ## Responses:
/// - `200 OK`: `{ success: true, data: Project }`.
/// - `404 Not Found`: no project with that id.
#[get("/projects/{project_id}")]
pub async fn get_project(
    ctx: web::Data<AppContext>,
    project_id: web::Path<Uuid>,
) -> ActionResult<Project> {
    let db = &ctx.db;
    let action = action_wrapper(
        &ctx.logger,
        |project_id: Uuid| services::get_project(db, project_id),
        ActionOptions::named("get-project"),
    );
    action.call(project_id.into_inner()).await
}
