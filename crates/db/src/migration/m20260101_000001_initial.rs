//! Initial schema: members, charts, years, projects and the transaction tables.
//!
//! Statements are written once and run on PostgreSQL and SQLite; `{pk}` is
//! replaced by the backend's auto-increment primary key column type.

use sea_orm::{ConnectionTrait, DbBackend};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const UP_SQL: [&str; 13] = [
    r"
CREATE TABLE users (
    id {pk},
    name VARCHAR(255) NOT NULL
)",
    r"
CREATE TABLE acc_charts (
    id {pk},
    label VARCHAR(255) NOT NULL
)",
    r"
CREATE TABLE acc_accounts (
    id {pk},
    id_chart BIGINT NOT NULL REFERENCES acc_charts(id) ON DELETE CASCADE,
    code VARCHAR(20) NOT NULL,
    label VARCHAR(255) NOT NULL,
    position INTEGER NOT NULL,
    UNIQUE (id_chart, code)
)",
    r"
CREATE TABLE acc_years (
    id {pk},
    label VARCHAR(255) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    closed BOOLEAN NOT NULL DEFAULT FALSE,
    id_chart BIGINT NOT NULL REFERENCES acc_charts(id),
    CHECK (start_date <= end_date)
)",
    r"
CREATE TABLE acc_projects (
    id {pk},
    label VARCHAR(255) NOT NULL
)",
    r"
CREATE TABLE acc_transactions (
    id {pk},
    type INTEGER NOT NULL,
    status INTEGER NOT NULL DEFAULT 0,
    label VARCHAR(200) NOT NULL,
    notes TEXT,
    reference VARCHAR(200),
    date DATE NOT NULL,
    validated BOOLEAN NOT NULL DEFAULT FALSE,
    hash VARCHAR(128),
    prev_hash VARCHAR(128),
    id_year BIGINT NOT NULL REFERENCES acc_years(id),
    id_creator BIGINT REFERENCES users(id) ON DELETE SET NULL,
    id_related BIGINT REFERENCES acc_transactions(id) ON DELETE SET NULL
)",
    "CREATE INDEX idx_acc_transactions_year ON acc_transactions(id_year, date)",
    "CREATE INDEX idx_acc_transactions_related ON acc_transactions(id_related)",
    r"
CREATE TABLE acc_transactions_lines (
    id {pk},
    id_transaction BIGINT NOT NULL REFERENCES acc_transactions(id) ON DELETE CASCADE,
    id_account BIGINT NOT NULL REFERENCES acc_accounts(id),
    id_project BIGINT REFERENCES acc_projects(id) ON DELETE SET NULL,
    label VARCHAR(200),
    reference VARCHAR(200),
    credit BIGINT NOT NULL DEFAULT 0,
    debit BIGINT NOT NULL DEFAULT 0,
    reconciled BOOLEAN NOT NULL DEFAULT FALSE,
    CHECK (credit >= 0 AND debit >= 0),
    CHECK ((credit = 0) <> (debit = 0))
)",
    "CREATE INDEX idx_acc_transactions_lines_transaction ON acc_transactions_lines(id_transaction)",
    "CREATE INDEX idx_acc_transactions_lines_account ON acc_transactions_lines(id_account)",
    r"
CREATE TABLE acc_transactions_users (
    id_transaction BIGINT NOT NULL REFERENCES acc_transactions(id) ON DELETE CASCADE,
    id_user BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    id_service_user BIGINT,
    PRIMARY KEY (id_transaction, id_user)
)",
    "CREATE INDEX idx_acc_transactions_users_user ON acc_transactions_users(id_user)",
];

const DOWN_TABLES: [&str; 8] = [
    "acc_transactions_users",
    "acc_transactions_lines",
    "acc_transactions",
    "acc_projects",
    "acc_years",
    "acc_accounts",
    "acc_charts",
    "users",
];

fn primary_key(backend: DbBackend) -> &'static str {
    if backend == DbBackend::Sqlite {
        "INTEGER PRIMARY KEY AUTOINCREMENT"
    } else {
        "BIGSERIAL PRIMARY KEY"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let pk = primary_key(manager.get_database_backend());

        for sql in UP_SQL {
            db.execute_unprepared(&sql.replace("{pk}", pk)).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        for table in DOWN_TABLES {
            db.execute_unprepared(&format!("DROP TABLE IF EXISTS {table}"))
                .await?;
        }

        Ok(())
    }
}
