use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use compta_shared::types::ChartId;
use serde_json::json;

use super::*;
use crate::accounting::fixtures::{
    CASH, EXPENSE, OTHER_CHART_EXPENSE, REVENUE, SUPPLIER, chart, date, expense, money,
    next_year, other_chart, year,
};
use crate::accounting::line::Line;
use crate::storage::StorageProvider;

// ========== In-memory store ==========

#[derive(Debug, Clone, Default)]
struct MemoryState {
    years: HashMap<YearId, Year>,
    charts: HashMap<ChartId, Chart>,
    projects: HashMap<ProjectId, String>,
    users: BTreeMap<UserId, String>,
    transactions: BTreeMap<TransactionId, TransactionRecord>,
    lines: BTreeMap<LineId, Line>,
    links: Vec<(TransactionId, UserId, Option<ServiceUserId>)>,
    next_id: i64,
    fail_line_insert: bool,
    /// Link reads made through the store rather than a unit.
    pooled_link_reads: usize,
}

impl MemoryState {
    fn next(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

struct MemoryUnit {
    shared: Arc<Mutex<MemoryState>>,
    state: Mutex<MemoryState>,
}

trait StateAccess {
    fn state(&self) -> MutexGuard<'_, MemoryState>;

    fn record_link_read(&self) {}
}

impl StateAccess for MemoryStore {
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    fn record_link_read(&self) {
        self.state().pooled_link_reads += 1;
    }
}

impl StateAccess for MemoryUnit {
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }
}

impl<T: StateAccess + Send + Sync> LedgerRead for T {
    async fn find_year(&self, id: YearId) -> Result<Option<Year>, StoreError> {
        Ok(self.state().years.get(&id).cloned())
    }

    async fn find_chart(&self, id: ChartId) -> Result<Option<Chart>, StoreError> {
        Ok(self.state().charts.get(&id).cloned())
    }

    async fn find_accounts(
        &self,
        ids: &[AccountId],
    ) -> Result<HashMap<AccountId, Account>, StoreError> {
        Ok(self
            .state()
            .charts
            .values()
            .flat_map(|c| c.accounts.iter())
            .filter(|a| ids.contains(&a.id))
            .map(|a| (a.id, a.clone()))
            .collect())
    }

    async fn project_names(
        &self,
        ids: &[ProjectId],
    ) -> Result<HashMap<ProjectId, String>, StoreError> {
        Ok(self
            .state()
            .projects
            .iter()
            .filter(|(id, _)| ids.contains(id))
            .map(|(id, name)| (*id, name.clone()))
            .collect())
    }

    async fn user_exists(&self, id: UserId) -> Result<bool, StoreError> {
        Ok(self.state().users.contains_key(&id))
    }

    async fn transaction_exists(&self, id: TransactionId) -> Result<bool, StoreError> {
        Ok(self.state().transactions.contains_key(&id))
    }

    async fn find_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self.state().transactions.get(&id).cloned())
    }

    async fn find_lines(&self, id: TransactionId) -> Result<Vec<Line>, StoreError> {
        Ok(self
            .state()
            .lines
            .values()
            .filter(|l| l.id_transaction == Some(id))
            .cloned()
            .collect())
    }

    async fn find_related_transactions(
        &self,
        id: TransactionId,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        Ok(self
            .state()
            .transactions
            .values()
            .filter(|t| t.id_related == Some(id))
            .cloned()
            .collect())
    }

    async fn linked_users(&self, id: TransactionId) -> Result<Vec<LinkedUser>, StoreError> {
        self.record_link_read();
        let state = self.state();
        let mut users: Vec<LinkedUser> = state
            .links
            .iter()
            .filter(|(t, _, _)| *t == id)
            .map(|(_, user, service)| LinkedUser {
                id_user: *user,
                name: state.users.get(user).cloned().unwrap_or_default(),
                id_service_user: *service,
            })
            .collect();
        users.sort_by_key(|u| u.id_user);
        Ok(users)
    }
}

impl LedgerWrite for MemoryUnit {
    async fn insert_transaction(
        &self,
        record: &TransactionRecord,
    ) -> Result<TransactionId, StoreError> {
        let mut state = self.state();
        let id = TransactionId::new(state.next());
        let mut record = record.clone();
        record.id = Some(id);
        state.transactions.insert(id, record);
        Ok(id)
    }

    async fn update_transaction(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        let id = record.id.ok_or_else(|| StoreError::database("no id"))?;
        self.state().transactions.insert(id, record.clone());
        Ok(())
    }

    async fn delete_transaction(&self, id: TransactionId) -> Result<(), StoreError> {
        let mut state = self.state();
        state.transactions.remove(&id);
        state.lines.retain(|_, l| l.id_transaction != Some(id));
        state.links.retain(|(t, _, _)| *t != id);
        Ok(())
    }

    async fn insert_line(
        &self,
        id_transaction: TransactionId,
        line: &Line,
    ) -> Result<LineId, StoreError> {
        let mut state = self.state();
        if state.fail_line_insert {
            return Err(StoreError::database("disk full"));
        }
        let id = LineId::new(state.next());
        let mut line = line.clone();
        line.id = Some(id);
        line.id_transaction = Some(id_transaction);
        state.lines.insert(id, line);
        Ok(id)
    }

    async fn update_line(&self, line: &Line) -> Result<(), StoreError> {
        let id = line.id.ok_or_else(|| StoreError::database("no id"))?;
        self.state().lines.insert(id, line.clone());
        Ok(())
    }

    async fn delete_line(&self, id: LineId) -> Result<(), StoreError> {
        self.state().lines.remove(&id);
        Ok(())
    }

    async fn link_user(
        &self,
        id: TransactionId,
        user: UserId,
        service: Option<ServiceUserId>,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        state.links.retain(|(t, u, _)| !(*t == id && *u == user));
        state.links.push((id, user, service));
        Ok(())
    }

    async fn unlink_users_except(
        &self,
        id: TransactionId,
        keep: &[UserId],
    ) -> Result<(), StoreError> {
        self.state()
            .links
            .retain(|(t, u, s)| *t != id || s.is_some() || keep.contains(u));
        Ok(())
    }

    async fn unlink_service_user(
        &self,
        id: TransactionId,
        service: ServiceUserId,
    ) -> Result<(), StoreError> {
        self.state()
            .links
            .retain(|(t, _, s)| !(*t == id && *s == Some(service)));
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        let state = self.state.into_inner().unwrap();
        *self.shared.lock().unwrap() = state;
        Ok(())
    }
}

impl TransactionStore for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> Result<MemoryUnit, StoreError> {
        let snapshot = self.state().clone();
        Ok(MemoryUnit {
            shared: Arc::clone(&self.state),
            state: Mutex::new(snapshot),
        })
    }
}

// ========== Harness ==========

const PROJECT: ProjectId = ProjectId::new(2);

fn seeded() -> MemoryState {
    let mut state = MemoryState {
        next_id: 100,
        ..MemoryState::default()
    };
    for y in [year(), next_year()] {
        state.years.insert(y.id, y);
    }
    for c in [chart(), other_chart()] {
        state.charts.insert(c.id, c);
    }
    state.projects.insert(PROJECT, "Summer fair".into());
    state.users.insert(UserId::new(1), "Ada".into());
    state.users.insert(UserId::new(2), "Grace".into());
    state
}

struct Harness {
    service: TransactionService<MemoryStore>,
    store: Arc<MemoryStore>,
    storage: Arc<StorageService>,
}

fn harness_with(state: MemoryState) -> Harness {
    let store = Arc::new(MemoryStore {
        state: Arc::new(Mutex::new(state)),
    });
    let root = std::env::temp_dir().join(format!("compta-service-{}", uuid::Uuid::new_v4()));
    let storage = Arc::new(StorageService::from_provider(&StorageProvider::local_fs(root)).unwrap());
    let service = TransactionService::new(
        Arc::clone(&store),
        Arc::clone(&storage),
        AccountingConfig::default(),
    );
    Harness {
        service,
        store,
        storage,
    }
}

fn harness() -> Harness {
    harness_with(seeded())
}

fn form(value: Value) -> FormInput {
    value.as_object().cloned().unwrap()
}

fn debt(amount: i64) -> Transaction {
    let mut t = Transaction::new();
    t.transaction_type = Some(TransactionType::Debt);
    t.label = "Invoice 42".into();
    t.date = Some(date(2024, 4, 2));
    t.id_year = Some(YearId::new(1));
    t.add_line(Line::debit(EXPENSE, money(amount)).with_project(Some(PROJECT)));
    t.add_line(Line::credit(SUPPLIER, money(amount)));
    t
}

// ========== Save ==========

#[tokio::test]
async fn test_new_form_save_and_reload() {
    let h = harness();
    let mut t = Transaction::new();
    h.service
        .import_from_new_form(
            &mut t,
            &form(json!({
                "type": 1,
                "amount": "100",
                "label": "Concert tickets",
                "date": "2024-05-01",
                "id_year": 1,
                "simple": {"1": {"credit": {"4": "706 — Services"}, "debit": {"1": "512A — Bank"}}},
            })),
        )
        .await
        .unwrap();

    let id = h.service.save(&mut t).await.unwrap();
    assert_eq!(t.id, Some(id));
    assert!(t.lines().iter().all(|l| l.id.is_some()));
    assert_eq!(h.service.diff(&t).await.unwrap(), None);

    let reloaded = h.service.load(id).await.unwrap();
    assert_eq!(reloaded.transaction_type, Some(TransactionType::Revenue));
    assert_eq!(reloaded.credit_sum(), money(10000));
    assert_eq!(reloaded.debit_sum(), money(10000));
    assert_eq!(
        h.service.find_type(&reloaded).await.unwrap(),
        TransactionType::Revenue
    );
}

#[tokio::test]
async fn test_load_unknown_transaction() {
    let h = harness();
    assert!(matches!(
        h.service.load(TransactionId::new(404)).await,
        Err(TransactionError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_new_debt_is_waiting() {
    let h = harness();
    let mut t = debt(7000);
    let id = h.service.save(&mut t).await.unwrap();

    let stored = h.service.load(id).await.unwrap();
    assert!(stored.status.contains(TransactionStatus::WAITING));
}

#[tokio::test]
async fn test_closed_year_writes_nothing() {
    let mut state = seeded();
    if let Some(y) = state.years.get_mut(&YearId::new(1)) {
        y.closed = true;
    }
    let h = harness_with(state);

    let mut t = expense(1500);
    let result = h.service.save(&mut t).await;

    assert!(matches!(
        result,
        Err(TransactionError::Validation(ValidationError::YearClosed))
    ));
    assert!(h.store.state().transactions.is_empty());
    assert!(t.id.is_none());
}

#[tokio::test]
async fn test_failed_line_write_rolls_back() {
    let mut state = seeded();
    state.fail_line_insert = true;
    let h = harness_with(state);

    let mut t = expense(1500);
    assert!(matches!(
        h.service.save(&mut t).await,
        Err(TransactionError::Store(_))
    ));
    assert!(h.store.state().transactions.is_empty());
    assert!(h.store.state().lines.is_empty());
    assert!(!t.exists());
}

#[tokio::test]
async fn test_invalid_transaction_is_rejected() {
    let h = harness();

    let mut t = expense(1500);
    t.id_creator = Some(UserId::new(99));
    assert!(matches!(
        h.service.save(&mut t).await,
        Err(TransactionError::Validation(ValidationError::CreatorNotFound(_)))
    ));

    let mut t = expense(1500);
    t.reset_lines();
    t.add_line(Line::debit(EXPENSE, money(1500)));
    t.add_line(Line::credit(REVENUE, money(1500)));
    assert!(matches!(
        h.service.save(&mut t).await,
        Err(TransactionError::Validation(
            ValidationError::RevenueAccountOnExpense { line: 2, .. }
        ))
    ));
    assert!(h.store.state().transactions.is_empty());
}

#[tokio::test]
async fn test_validated_lock() {
    let h = harness();
    let mut t = expense(1500);
    h.service.save(&mut t).await.unwrap();

    t.validated = true;
    h.service.save(&mut t).await.unwrap();
    assert!(t.was_validated());

    t.label = "Toner".into();
    assert!(matches!(
        h.service.save(&mut t).await,
        Err(TransactionError::Validation(ValidationError::Validated))
    ));

    t.validated = false;
    h.service.save(&mut t).await.unwrap();
    assert!(!t.was_validated());
}

#[tokio::test]
async fn test_edit_replaces_lines() {
    let h = harness();
    let mut t = expense(2500);
    let id = h.service.save(&mut t).await.unwrap();
    let old_ids: Vec<_> = t.lines().iter().filter_map(|l| l.id).collect();

    t.reset_lines();
    t.add_line(Line::debit(EXPENSE, money(2500)));
    t.add_line(Line::credit(CASH, money(2500)));

    let diff = h.service.diff(&t).await.unwrap().unwrap();
    assert_eq!(diff.lines_new.len(), 1);
    assert_eq!(diff.lines_removed[0].account.as_deref(), Some("512A — Bank"));

    h.service.save(&mut t).await.unwrap();

    let stored = h.service.load(id).await.unwrap();
    assert_eq!(stored.count_lines(), 2);
    assert!(stored.lines().iter().all(|l| !old_ids.contains(&l.id.unwrap())));
    assert_eq!(stored.lines()[1].id_account, Some(CASH));
    assert!(t.removed_lines().is_empty());
}

#[tokio::test]
async fn test_edit_clears_error_status() {
    let h = harness();
    let mut t = expense(2500);
    t.add_status(TransactionStatus::ERROR);
    let id = h.service.save(&mut t).await.unwrap();
    assert!(
        h.service
            .load(id)
            .await
            .unwrap()
            .status
            .contains(TransactionStatus::ERROR)
    );

    h.service.save(&mut t).await.unwrap();
    assert!(
        !h.service
            .load(id)
            .await
            .unwrap()
            .status
            .contains(TransactionStatus::ERROR)
    );
}

#[tokio::test]
async fn test_failed_edit_keeps_in_memory_status() {
    let h = harness();
    let mut t = expense(2500);
    t.add_status(TransactionStatus::ERROR);
    let id = h.service.save(&mut t).await.unwrap();

    h.store.state().fail_line_insert = true;
    t.reset_lines();
    t.add_line(Line::debit(EXPENSE, money(2500)));
    t.add_line(Line::credit(CASH, money(2500)));

    assert!(matches!(
        h.service.save(&mut t).await,
        Err(TransactionError::Store(_))
    ));
    assert_eq!(t.status, TransactionStatus::ERROR);
    assert!(
        h.service
            .load(id)
            .await
            .unwrap()
            .status
            .contains(TransactionStatus::ERROR)
    );
}

#[tokio::test]
async fn test_rejected_debt_stays_unflagged() {
    let mut state = seeded();
    if let Some(y) = state.years.get_mut(&YearId::new(1)) {
        y.closed = true;
    }
    let h = harness_with(state);

    let mut t = debt(7000);
    assert!(h.service.save(&mut t).await.is_err());
    assert_eq!(t.status, TransactionStatus::empty());
}

// ========== Delete ==========

#[tokio::test]
async fn test_delete_removes_rows_and_attachments() {
    let h = harness();
    let mut t = expense(900);
    let id = h.service.save(&mut t).await.unwrap();
    h.service
        .link_to_user(&t, UserId::new(1), None)
        .await
        .unwrap();

    h.storage
        .write(&format!("transaction/{id}/receipt.pdf"), b"%PDF".to_vec())
        .await
        .unwrap();
    assert_eq!(h.service.list_files(&t).await.unwrap().len(), 1);

    h.service.delete(&t).await.unwrap();

    let state = h.store.state().clone();
    assert!(state.transactions.is_empty());
    assert!(state.lines.is_empty());
    assert!(state.links.is_empty());
    assert!(h.service.list_files(&t).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_guards() {
    let h = harness();

    assert!(matches!(
        h.service.delete(&expense(10)).await,
        Err(TransactionError::Logic(LogicError::NotPersisted))
    ));

    let mut t = expense(10);
    t.validated = true;
    h.service.save(&mut t).await.unwrap();
    assert!(matches!(
        h.service.delete(&t).await,
        Err(TransactionError::Validation(ValidationError::DeleteValidated))
    ));

    let mut t = expense(10);
    h.service.save(&mut t).await.unwrap();
    if let Some(y) = h.store.state().years.get_mut(&YearId::new(1)) {
        y.closed = true;
    }
    assert!(matches!(
        h.service.delete(&t).await,
        Err(TransactionError::Validation(ValidationError::DeleteYearClosed))
    ));
    assert_eq!(h.store.state().transactions.len(), 2);
}

// ========== Derived workflows ==========

#[tokio::test]
async fn test_payoff_links_to_debt() {
    let h = harness();
    let mut debt = debt(7000);
    let debt_id = h.service.save(&mut debt).await.unwrap();

    let mut t = Transaction::new();
    let summary = h.service.pay_off_from(&mut t, debt_id).await.unwrap();
    assert_eq!(summary.amount, money(7000));
    assert_eq!(summary.id_project, Some(PROJECT));

    h.service
        .import_from_payoff_form(
            &mut t,
            &form(json!({
                "amount": "70",
                "account": {"1": "512A — Bank"},
                "date": "2024-06-01",
                "id_year": 1,
            })),
        )
        .await
        .unwrap();
    h.service.save(&mut t).await.unwrap();

    let related = h.service.list_related_transactions(&debt).await.unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].label, "Debt settlement: Invoice 42");
    assert_eq!(related[0].transaction_type, TransactionType::Advanced);
}

#[tokio::test]
async fn test_opening_balance_through_service() {
    let h = harness();
    let mut t = Transaction::new();
    h.service
        .import_from_balance_form(
            &mut t,
            YearId::new(1),
            &form(json!({"lines": [
                {"account": "512A", "debit": "100"},
                {"account": "401", "credit": "40"},
            ]})),
        )
        .await
        .unwrap();

    assert_eq!(t.count_lines(), 3);
    h.service.save(&mut t).await.unwrap();

    assert!(matches!(
        h.service
            .import_from_balance_form(&mut Transaction::new(), YearId::new(9), &FormInput::new())
            .await,
        Err(TransactionError::Validation(ValidationError::YearNotFound(_)))
    ));
}

#[tokio::test]
async fn test_account_codes_resolve_against_form_year() {
    let h = harness();
    let mut t = Transaction::new();
    h.service
        .import_form(
            &mut t,
            &form(json!({
                "type": 0,
                "label": "Stationery",
                "date": "2025-02-01",
                "id_year": 2,
                "lines": [
                    {"account": "606", "debit": "12"},
                    {"account": "512A", "credit": "12"},
                ],
            })),
        )
        .await
        .unwrap();

    let accounts: Vec<_> = t.lines().iter().map(|l| l.id_account).collect();
    assert_eq!(
        accounts,
        vec![Some(OTHER_CHART_EXPENSE), Some(AccountId::new(101))]
    );
    h.service.save(&mut t).await.unwrap();
}

#[tokio::test]
async fn test_duplicate_into_next_year() {
    let h = harness();
    let mut t = expense(1200);
    h.service.save(&mut t).await.unwrap();

    let copy = h.service.duplicate(&t, YearId::new(2)).await.unwrap();
    assert!(!copy.exists());
    assert_eq!(copy.id_year, Some(YearId::new(2)));
    assert_eq!(copy.lines()[0].id_account, Some(OTHER_CHART_EXPENSE));

    assert!(matches!(
        h.service.duplicate(&t, YearId::new(9)).await,
        Err(TransactionError::Validation(ValidationError::YearNotFound(_)))
    ));
}

#[tokio::test]
async fn test_journal_resolves_labels() {
    let h = harness();
    let mut t = debt(500);
    h.service.save(&mut t).await.unwrap();

    let journal = h.service.journal(&t).await.unwrap();
    assert_eq!(journal.lines.len(), 2);
    assert_eq!(journal.lines[0].project_name.as_deref(), Some("Summer fair"));
    assert_eq!(journal.lines[1].account_code.as_deref(), Some("401"));

    let joined = h.service.lines_with_accounts(&t).await.unwrap();
    assert_eq!(joined[0].account_label.as_deref(), Some("Supplies"));
}

#[tokio::test]
async fn test_types_details_resolve_submitted_accounts() {
    let h = harness();
    let mut t = Transaction::new();
    t.transaction_type = Some(TransactionType::Expense);
    let source = form(json!({"simple": {"2": {"debit": "3"}}}));

    let details = h.service.types_details(&t, Some(&source)).await.unwrap();
    let expense = details
        .iter()
        .find(|d| d.id == TransactionType::Expense)
        .unwrap();
    let debit = expense
        .accounts
        .iter()
        .find(|s| s.selector_name == "simple[2][debit]")
        .unwrap();
    assert_eq!(debit.selector_value.as_ref().map(|s| s.id), Some(EXPENSE));
}

// ========== Linked users ==========

#[tokio::test]
async fn test_linked_users() {
    let h = harness();
    let mut t = expense(300);
    h.service.save(&mut t).await.unwrap();

    let users = [UserId::new(2), UserId::new(1)];
    assert!(h.service.update_linked_users(&t, &users).await.unwrap());
    assert!(!h.service.update_linked_users(&t, &users).await.unwrap());

    h.service
        .link_to_user(&t, UserId::new(1), Some(ServiceUserId::new(5)))
        .await
        .unwrap();
    assert!(
        !h.service
            .update_linked_users(&t, &[UserId::new(2)])
            .await
            .unwrap()
    );

    let linked = h.service.list_linked_users(&t).await.unwrap();
    assert_eq!(
        linked,
        vec![
            LinkedUser {
                id_user: UserId::new(1),
                name: "Ada".into(),
                id_service_user: Some(ServiceUserId::new(5)),
            },
            LinkedUser {
                id_user: UserId::new(2),
                name: "Grace".into(),
                id_service_user: None,
            },
        ]
    );

    h.service
        .unlink_service_user(&t, ServiceUserId::new(5))
        .await
        .unwrap();
    let linked = h.service.list_linked_users(&t).await.unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].id_user, UserId::new(2));

    assert!(h.service.update_linked_users(&t, &[]).await.unwrap());
    assert!(h.service.list_linked_users(&t).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_linked_users_compared_inside_unit() {
    let h = harness();
    let mut t = expense(300);
    h.service.save(&mut t).await.unwrap();

    let users = [UserId::new(1)];
    assert!(h.service.update_linked_users(&t, &users).await.unwrap());
    assert!(!h.service.update_linked_users(&t, &users).await.unwrap());
    assert_eq!(h.store.state().pooled_link_reads, 0);
}

#[tokio::test]
async fn test_linked_users_need_saved_transaction() {
    let h = harness();
    assert!(matches!(
        h.service.list_linked_users(&expense(1)).await,
        Err(TransactionError::Logic(LogicError::NotPersisted))
    ));
}
