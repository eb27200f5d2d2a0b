mod common;

use std::collections::HashSet;

use planboard::models::{Project, Session, Task, User};
use planboard::seed::{self, DEMO_EMAIL};
use pretty_assertions::assert_eq;

#[test_log::test(actix_rt::test)]
async fn test_seed_creates_demo_data() {
    let (ctx, sink) = common::test_context(&[]).await;

    let summary = seed::run(&ctx.db, &ctx.logger)
        .await
        .expect("seeding should succeed");
    assert_eq!((summary.users, summary.projects, summary.tasks), (1, 3, 10));

    let user = User::find_by_email(ctx.db.pool(), DEMO_EMAIL)
        .await
        .unwrap()
        .expect("demo user should exist");
    assert_eq!(user.name.as_deref(), Some("Demo User"));

    let projects = Project::list_for_user(ctx.db.pool(), user.id).await.unwrap();
    assert_eq!(projects.len(), 3);

    let project_ids: HashSet<_> = projects.iter().map(|p| p.id).collect();
    let tasks = Task::list_all(ctx.db.pool()).await.unwrap();
    assert_eq!(tasks.len(), 10);
    assert!(tasks.iter().all(|t| project_ids.contains(&t.project_id)));
    assert_eq!(tasks.iter().filter(|t| t.due_date.is_some()).count(), 1);

    let messages: Vec<_> = sink.records().into_iter().map(|r| r.message).collect();
    assert!(messages.contains(&"Database seeded successfully".to_string()));

    ctx.shutdown().await;
}

#[actix_rt::test]
async fn test_seed_is_repeatable() {
    let (ctx, _sink) = common::test_context(&[]).await;

    let first = seed::run(&ctx.db, &ctx.logger).await.unwrap();
    let first_user = User::find_by_email(ctx.db.pool(), DEMO_EMAIL)
        .await
        .unwrap()
        .unwrap();

    let session = Session::new(first_user.id, 3600);
    session.insert(ctx.db.pool()).await.unwrap();
    assert_eq!(Session::count(ctx.db.pool()).await.unwrap(), 1);

    let second = seed::run(&ctx.db, &ctx.logger).await.unwrap();
    assert_eq!(first, second);

    // Old rows are replaced, not kept alongside the new ones.
    let second_user = User::find_by_email(ctx.db.pool(), DEMO_EMAIL)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(first_user.id, second_user.id);
    assert_eq!(Session::count(ctx.db.pool()).await.unwrap(), 0);
    assert_eq!(User::count(ctx.db.pool()).await.unwrap(), 1);

    ctx.shutdown().await;
}
