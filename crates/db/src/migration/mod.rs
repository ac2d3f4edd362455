//! Database migrations.
//!
//! Run with: `cargo run -p compta-migrator -- up`

pub use sea_orm_migration::prelude::*;

mod m20260101_000001_initial;

/// Migrator for all database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260101_000001_initial::Migration)]
    }
}
