//!
//! # Demo Data
//!
//! Wipes the database and fills it with one demo user, three projects and
//! ten tasks. Everything happens in a single transaction, so a failed run
//! leaves the previous contents untouched.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;

use crate::db::Database;
use crate::log_context;
use crate::logger::Logger;
use crate::models::{
    NewProject, NewTask, NewUser, Project, ProjectStatus, Session, Task, TaskPriority,
    TaskStatus, User,
};

pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_NAME: &str = "Demo User";
/// Stored in place of a real password hash; no login flow exists yet.
pub const PLACEHOLDER_PASSWORD_HASH: &str = "PLACEHOLDER_HASH_NOT_A_REAL_CREDENTIAL";

struct DemoTask {
    title: &'static str,
    description: &'static str,
    status: TaskStatus,
    priority: TaskPriority,
    due: Option<(i32, u32, u32)>,
}

struct DemoProject {
    name: &'static str,
    description: &'static str,
    status: ProjectStatus,
    tasks: &'static [DemoTask],
}

const DEMO_PROJECTS: [DemoProject; 3] = [
    DemoProject {
        name: "Website Redesign",
        description: "Complete overhaul of company website with modern design",
        status: ProjectStatus::Active,
        tasks: &[
            DemoTask {
                title: "Design homepage mockup",
                description: "Create high-fidelity mockup in Figma",
                status: TaskStatus::Done,
                priority: TaskPriority::High,
                due: None,
            },
            DemoTask {
                title: "Implement responsive navigation",
                description: "Build mobile-first navigation component",
                status: TaskStatus::InProgress,
                priority: TaskPriority::High,
                due: None,
            },
            DemoTask {
                title: "Set up CI/CD pipeline",
                description: "Configure GitHub Actions for automated deployments",
                status: TaskStatus::Todo,
                priority: TaskPriority::Medium,
                due: None,
            },
            DemoTask {
                title: "Write technical documentation",
                description: "Document API endpoints and component usage",
                status: TaskStatus::Todo,
                priority: TaskPriority::Low,
                due: Some((2026, 3, 15)),
            },
        ],
    },
    DemoProject {
        name: "Mobile App Development",
        description: "Build native iOS and Android applications",
        status: ProjectStatus::Planning,
        tasks: &[
            DemoTask {
                title: "Research native frameworks",
                description: "Evaluate React Native vs Flutter vs native development",
                status: TaskStatus::InProgress,
                priority: TaskPriority::High,
                due: None,
            },
            DemoTask {
                title: "Design app wireframes",
                description: "Create low-fidelity wireframes for all screens",
                status: TaskStatus::Todo,
                priority: TaskPriority::High,
                due: None,
            },
            DemoTask {
                title: "Set up development environment",
                description: "Install Xcode, Android Studio, and dependencies",
                status: TaskStatus::Todo,
                priority: TaskPriority::Medium,
                due: None,
            },
        ],
    },
    DemoProject {
        name: "Marketing Campaign Q1",
        description: "First quarter marketing initiatives and social media strategy",
        status: ProjectStatus::Completed,
        tasks: &[
            DemoTask {
                title: "Launch social media campaign",
                description: "Execute planned posts across all platforms",
                status: TaskStatus::Done,
                priority: TaskPriority::High,
                due: None,
            },
            DemoTask {
                title: "Analyze campaign metrics",
                description: "Review engagement and conversion data",
                status: TaskStatus::Done,
                priority: TaskPriority::Medium,
                due: None,
            },
            DemoTask {
                title: "Prepare Q2 strategy",
                description: "Build on Q1 learnings for next quarter",
                status: TaskStatus::Done,
                priority: TaskPriority::Medium,
                due: None,
            },
        ],
    },
];

/// Row counts after seeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub users: i64,
    pub projects: i64,
    pub tasks: i64,
}

fn due_date((year, month, day): (i32, u32, u32)) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single()
}

/// Deletes every row, dependents first: tasks, projects, sessions, users.
pub async fn clear(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    Task::delete_all(&mut *conn).await?;
    Project::delete_all(&mut *conn).await?;
    Session::delete_all(&mut *conn).await?;
    User::delete_all(&mut *conn).await?;
    Ok(())
}

/// Replaces the database contents with the demo data set.
pub async fn run(db: &Database, logger: &Logger) -> Result<SeedSummary, sqlx::Error> {
    logger.info("Seeding database...", None);

    let mut tx = db.pool().begin().await?;

    clear(&mut tx).await?;
    logger.info("Cleared existing data", None);

    let user = User::new(NewUser {
        email: DEMO_EMAIL.to_string(),
        password_hash: PLACEHOLDER_PASSWORD_HASH.to_string(),
        name: Some(DEMO_NAME.to_string()),
    });
    user.insert(&mut *tx).await?;
    logger.info(
        "Created demo user",
        Some(log_context! { "email" => user.email }),
    );

    let mut task_total = 0;
    for demo in DEMO_PROJECTS.iter() {
        let project = Project::new(
            user.id,
            NewProject {
                name: demo.name.to_string(),
                description: Some(demo.description.to_string()),
                status: Some(demo.status),
            },
        );
        project.insert(&mut *tx).await?;

        for demo_task in demo.tasks {
            let task = Task::new(
                project.id,
                NewTask {
                    title: demo_task.title.to_string(),
                    description: Some(demo_task.description.to_string()),
                    status: Some(demo_task.status),
                    priority: Some(demo_task.priority),
                    due_date: demo_task.due.and_then(due_date),
                },
            );
            task.insert(&mut *tx).await?;
            task_total += 1;
        }
    }
    logger.info(
        format!(
            "Created {} sample projects and {} sample tasks",
            DEMO_PROJECTS.len(),
            task_total
        ),
        None,
    );

    tx.commit().await?;

    let summary = SeedSummary {
        users: User::count(db.pool()).await?,
        projects: Project::count(db.pool()).await?,
        tasks: Task::count(db.pool()).await?,
    };
    logger.info(
        "Database seeded successfully",
        Some(log_context! {
            "users" => summary.users,
            "projects" => summary.projects,
            "tasks" => summary.tasks,
            "demo_email" => DEMO_EMAIL,
        }),
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_data_shape() {
        let statuses: Vec<_> = DEMO_PROJECTS.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![
                ProjectStatus::Active,
                ProjectStatus::Planning,
                ProjectStatus::Completed
            ]
        );

        let tasks: Vec<_> = DEMO_PROJECTS.iter().flat_map(|p| p.tasks.iter()).collect();
        assert_eq!(tasks.len(), 10);
        assert_eq!(tasks.iter().filter(|t| t.due.is_some()).count(), 1);
    }

    #[test]
    fn test_due_date_is_midnight_utc() {
        let date = due_date((2026, 3, 15)).unwrap();
        assert_eq!(date.to_rfc3339(), "2026-03-15T00:00:00+00:00");
        assert!(due_date((2026, 2, 30)).is_none());
    }
}
