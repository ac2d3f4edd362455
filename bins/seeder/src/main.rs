//! Database seeder for Compta development and testing.
//!
//! Seeds a chart of accounts, one open fiscal year, a project, two members
//! and a sample revenue entry saved through the bookkeeping service.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use chrono::NaiveDate;
use compta_core::accounting::{AccountPosition, Transaction, TransactionService};
use compta_core::storage::{StorageProvider, StorageService};
use compta_db::SeaLedgerStore;
use compta_db::entities::{acc_accounts, acc_charts, acc_projects, acc_years, users};
use compta_shared::AppConfig;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CHART_ID: i64 = 1;
const YEAR_ID: i64 = 1;

/// (id, code, label, position)
const ACCOUNTS: [(i64, &str, &str, AccountPosition); 8] = [
    (1, "512A", "Bank", AccountPosition::Bank),
    (2, "530", "Cash", AccountPosition::Cash),
    (3, "606", "Supplies", AccountPosition::Expense),
    (4, "706", "Services", AccountPosition::Revenue),
    (5, "401", "Suppliers", AccountPosition::ThirdParty),
    (6, "411", "Customers", AccountPosition::ThirdParty),
    (7, "511", "Cheques to deposit", AccountPosition::Outstanding),
    (8, "890", "Opening balance", AccountPosition::Opening),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "compta=debug,seeder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    let db = compta_db::connect_with(&config.database).await?;
    info!("Connected to database");

    if acc_charts::Entity::find_by_id(CHART_ID).one(&db).await?.is_some() {
        warn!("Demo chart already exists, skipping");
        return Ok(());
    }

    seed_chart(&db).await?;
    seed_year(&db).await?;
    seed_members(&db).await?;

    let provider = StorageProvider::from_settings(&config.storage)?;
    let storage = StorageService::from_provider(&provider)?;
    let service = TransactionService::new(
        Arc::new(SeaLedgerStore::new(db.clone())),
        Arc::new(storage),
        config.accounting,
    );

    let mut sample = Transaction::new();
    service
        .import_from_new_form(
            &mut sample,
            json!({
                "type": 1,
                "label": "Membership fees",
                "date": "2026-01-15",
                "id_year": YEAR_ID,
                "amount": "250.00",
                "simple": {"1": {"credit": {"4": "706 — Services"}, "debit": {"1": "512A — Bank"}}},
            })
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("sample form is not an object"))?,
        )
        .await?;
    let id = service.save(&mut sample).await?;
    info!(transaction_id = %id, "Created sample revenue");

    info!("Seeding complete");
    Ok(())
}

async fn seed_chart(db: &DatabaseConnection) -> anyhow::Result<()> {
    acc_charts::ActiveModel {
        id: Set(CHART_ID),
        label: Set("Association chart".to_string()),
    }
    .insert(db)
    .await?;

    for (id, code, label, position) in ACCOUNTS {
        acc_accounts::ActiveModel {
            id: Set(id),
            id_chart: Set(CHART_ID),
            code: Set(code.to_string()),
            label: Set(label.to_string()),
            position: Set(position.code()),
        }
        .insert(db)
        .await?;
    }

    info!(accounts = ACCOUNTS.len(), "Created demo chart");
    Ok(())
}

async fn seed_year(db: &DatabaseConnection) -> anyhow::Result<()> {
    let (Some(start), Some(end)) = (
        NaiveDate::from_ymd_opt(2026, 1, 1),
        NaiveDate::from_ymd_opt(2026, 12, 31),
    ) else {
        anyhow::bail!("invalid fiscal year bounds");
    };

    acc_years::ActiveModel {
        id: Set(YEAR_ID),
        label: Set("2026".to_string()),
        start_date: Set(start),
        end_date: Set(end),
        closed: Set(false),
        id_chart: Set(CHART_ID),
    }
    .insert(db)
    .await?;

    acc_projects::ActiveModel {
        id: Set(1),
        label: Set("Summer fair".to_string()),
    }
    .insert(db)
    .await?;

    info!("Created fiscal year 2026");
    Ok(())
}

async fn seed_members(db: &DatabaseConnection) -> anyhow::Result<()> {
    for (id, name) in [(1, "Ada Lovelace"), (2, "Grace Hopper")] {
        users::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
        }
        .insert(db)
        .await?;
    }

    info!("Created demo members");
    Ok(())
}
