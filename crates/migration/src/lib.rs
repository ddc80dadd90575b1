pub use sea_orm_migration::prelude::*;

mod m20260301_000001_group_members;
mod m20260301_000002_split_expenses;
mod m20260301_000003_split_shares;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_group_members::Migration),
            Box::new(m20260301_000002_split_expenses::Migration),
            Box::new(m20260301_000003_split_shares::Migration),
        ]
    }
}
