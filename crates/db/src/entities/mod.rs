//! `SeaORM` entities.

pub mod acc_accounts;
pub mod acc_charts;
pub mod acc_projects;
pub mod acc_transactions;
pub mod acc_transactions_lines;
pub mod acc_transactions_users;
pub mod acc_years;
pub mod users;
