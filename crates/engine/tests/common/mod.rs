#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{CreateSplitExpenseCmd, Engine, Portion, SplitExpense, SplitParams, SplitStrategy};
use migration::MigratorTrait;

pub const GROUP: &str = "trip";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
}

pub fn day(n: i64) -> DateTime<Utc> {
    t0() + Duration::days(n)
}

/// Engine over a migrated in-memory database where alice, bob and carol are
/// active members of `GROUP`, dave is inactive and erin is an admin.
pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    for (user, role, active) in [
        ("alice", "member", true),
        ("bob", "member", true),
        ("carol", "member", true),
        ("dave", "member", false),
        ("erin", "admin", true),
    ] {
        add_member(&db, GROUP, user, role, active).await;
    }
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub async fn add_member(db: &DatabaseConnection, group: &str, user: &str, role: &str, active: bool) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO group_members (group_id, user_id, role, is_active, joined_at) VALUES (?, ?, ?, ?, ?)",
        vec![
            group.into(),
            user.into(),
            role.into(),
            active.into(),
            t0().into(),
        ],
    ))
    .await
    .unwrap();
}

/// alice splits 150.00 between bob (100.00) and carol (50.00), due on day 10.
pub async fn custom_split(engine: &Engine) -> SplitExpense {
    let cmd = CreateSplitExpenseCmd::new(GROUP, "dinner", "alice", 15_000, day(10), t0())
        .participants(["bob", "carol"])
        .strategy(
            SplitStrategy::Custom,
            SplitParams::Amounts(vec![Portion::new("bob", 10_000), Portion::new("carol", 5_000)]),
        );
    engine.create_split_expense(cmd).await.unwrap()
}
