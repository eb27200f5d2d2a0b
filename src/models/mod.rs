pub mod project;
pub mod session;
pub mod task;
pub mod user;

pub use project::{NewProject, Project, ProjectStatus};
pub use session::Session;
pub use task::{NewTask, Task, TaskPriority, TaskStatus};
pub use user::{NewUser, User};
