//! Expense and vault mirrors plus the analytics snapshot.
//!
//! Every mutation waits for the server and then applies exactly one
//! [`LedgerAction`] carrying the server's canonical record. Failures leave the
//! collections untouched and only record `last_error`.

use std::sync::{Arc, RwLock};

use api_types::{
    account::{Account, AccountUpsert},
    analytics::{Analytics, DateRange},
    expense::{Expense, ExpenseFilters, ExpenseList, ExpenseNew},
    Money,
};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

use crate::{
    client::{Client, ClientError},
    error::{CoreError, Outcome},
    util,
};

pub mod analytics;

pub use analytics::{AnalyticsSnapshot, BalanceSummary, SnapshotSource};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerState {
    /// Most recent first.
    pub expenses: Vec<Expense>,
    pub vaults: Vec<Account>,
    pub analytics: Option<AnalyticsSnapshot>,
    pub loading: bool,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub(crate) enum LedgerAction {
    Loading,
    ExpensesLoaded(Vec<Expense>),
    ExpenseAdded(Expense),
    ExpenseDeleted(String),
    VaultsLoaded(Vec<Account>),
    VaultAdded(Account),
    VaultUpdated(Account),
    VaultDeleted(String),
    AnalyticsLoaded(AnalyticsSnapshot),
    Failed(String),
    ClearError,
    /// The session ended; nothing of the previous user is kept.
    Reset,
}

impl LedgerState {
    pub(crate) fn apply(&mut self, action: LedgerAction) {
        match action {
            LedgerAction::Loading => {
                self.loading = true;
                return;
            }
            LedgerAction::Failed(message) => {
                self.loading = false;
                self.last_error = Some(message);
                return;
            }
            LedgerAction::ClearError => {
                self.last_error = None;
                return;
            }
            LedgerAction::Reset => {
                *self = Self::default();
                return;
            }
            LedgerAction::ExpensesLoaded(expenses) => {
                self.expenses = expenses;
                self.loading = false;
            }
            LedgerAction::ExpenseAdded(expense) => {
                self.expenses.retain(|e| e.id != expense.id);
                self.expenses.insert(0, expense);
            }
            LedgerAction::ExpenseDeleted(id) => {
                self.expenses.retain(|e| e.id != id);
            }
            LedgerAction::VaultsLoaded(vaults) => {
                self.vaults = vaults;
            }
            LedgerAction::VaultAdded(vault) | LedgerAction::VaultUpdated(vault) => {
                match self.vaults.iter_mut().find(|v| v.id == vault.id) {
                    Some(existing) => *existing = vault,
                    None => self.vaults.push(vault),
                }
            }
            LedgerAction::VaultDeleted(id) => {
                self.vaults.retain(|v| v.id != id);
            }
            LedgerAction::AnalyticsLoaded(snapshot) => {
                self.analytics = Some(snapshot);
            }
        }
        self.last_error = None;
    }

    pub fn vault(&self, id: &str) -> Option<&Account> {
        self.vaults.iter().find(|vault| vault.id == id)
    }

    pub fn expense(&self, id: &str) -> Option<&Expense> {
        self.expenses.iter().find(|expense| expense.id == id)
    }

    /// Expenses whose vault is no longer mirrored. Deleting a vault does not
    /// cascade.
    pub fn orphaned_expenses(&self) -> impl Iterator<Item = &Expense> {
        self.expenses
            .iter()
            .filter(|expense| self.vault(expense.account.id()).is_none())
    }

    pub fn balance_summary(&self) -> BalanceSummary {
        analytics::balance_summary(&self.vaults)
    }
}

/// Owns the ledger mirrors and synchronizes them with the API.
#[derive(Clone)]
pub struct LedgerManager {
    state: Arc<RwLock<LedgerState>>,
    client: Client,
    timezone: Tz,
    trend_days: usize,
}

impl LedgerManager {
    pub(crate) fn new(
        state: Arc<RwLock<LedgerState>>,
        client: Client,
        timezone: Tz,
        trend_days: usize,
    ) -> Self {
        Self {
            state,
            client,
            timezone,
            trend_days,
        }
    }

    pub fn snapshot(&self) -> LedgerState {
        util::read(&self.state).clone()
    }

    pub fn clear_error(&self) {
        self.dispatch(LedgerAction::ClearError);
    }

    /// Today's date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    pub async fn list_expenses(&self, filters: &ExpenseFilters) -> Outcome<Vec<Expense>> {
        self.dispatch(LedgerAction::Loading);
        match self
            .client
            .get_with::<_, ExpenseList>("/api/expenses", filters)
            .await
        {
            Ok(ExpenseList { expenses }) => {
                tracing::debug!("loaded {} expenses", expenses.len());
                self.dispatch(LedgerAction::ExpensesLoaded(expenses.clone()));
                Ok(expenses)
            }
            Err(err) => self.fail(err),
        }
    }

    pub async fn add_expense(&self, data: ExpenseNew) -> Outcome<Expense> {
        if data.account.trim().is_empty() {
            return Err(CoreError::validation("Please select a vault"));
        }
        if !data.amount.is_positive() {
            return Err(CoreError::validation("Amount must be greater than zero"));
        }
        if data.description.trim().is_empty() {
            return Err(CoreError::validation("Description is required"));
        }

        match self.client.post::<_, Expense>("/api/expenses", &data).await {
            Ok(expense) => {
                tracing::debug!("added expense {}", expense.id);
                self.dispatch(LedgerAction::ExpenseAdded(expense.clone()));
                Ok(expense)
            }
            Err(err) => self.fail(err),
        }
    }

    pub async fn delete_expense(&self, id: &str) -> Outcome<()> {
        if id.trim().is_empty() {
            return Err(CoreError::validation("expense id is required"));
        }

        match self.client.delete(&format!("/api/expenses/{id}")).await {
            Ok(()) => {
                self.dispatch(LedgerAction::ExpenseDeleted(id.to_string()));
                Ok(())
            }
            Err(err) => self.fail(err),
        }
    }

    pub async fn list_vaults(&self) -> Outcome<Vec<Account>> {
        match self.client.get::<Vec<Account>>("/api/accounts").await {
            Ok(vaults) => {
                tracing::debug!("loaded {} vaults", vaults.len());
                self.dispatch(LedgerAction::VaultsLoaded(vaults.clone()));
                Ok(vaults)
            }
            Err(err) => self.fail(err),
        }
    }

    pub async fn create_vault(&self, data: AccountUpsert) -> Outcome<Account> {
        validate_vault(&data)?;

        match self.client.post::<_, Account>("/api/accounts", &data).await {
            Ok(vault) => {
                self.dispatch(LedgerAction::VaultAdded(vault.clone()));
                Ok(vault)
            }
            Err(err) => self.fail(err),
        }
    }

    /// Replaces the mirrored vault with the server's returned record.
    pub async fn update_vault(&self, id: &str, data: AccountUpsert) -> Outcome<Account> {
        if id.trim().is_empty() {
            return Err(CoreError::validation("vault id is required"));
        }
        validate_vault(&data)?;

        match self
            .client
            .put::<_, Account>(&format!("/api/accounts/{id}"), &data)
            .await
        {
            Ok(vault) => {
                self.dispatch(LedgerAction::VaultUpdated(vault.clone()));
                Ok(vault)
            }
            Err(err) => self.fail(err),
        }
    }

    /// Expenses referencing the vault are left in place.
    pub async fn delete_vault(&self, id: &str) -> Outcome<()> {
        if id.trim().is_empty() {
            return Err(CoreError::validation("vault id is required"));
        }

        match self.client.delete(&format!("/api/accounts/{id}")).await {
            Ok(()) => {
                self.dispatch(LedgerAction::VaultDeleted(id.to_string()));
                Ok(())
            }
            Err(err) => self.fail(err),
        }
    }

    /// Server-side category aggregation for `range`, stored as the current
    /// snapshot together with the local trend.
    pub async fn compute_analytics(&self, range: DateRange) -> Outcome<AnalyticsSnapshot> {
        match self
            .client
            .get_with::<_, Analytics>("/api/expenses/analytics", &range)
            .await
        {
            Ok(analytics) => {
                let snapshot =
                    AnalyticsSnapshot::from_server(range, analytics).with_trend(self.trend(self.trend_days));
                self.dispatch(LedgerAction::AnalyticsLoaded(snapshot.clone()));
                Ok(snapshot)
            }
            Err(err) => self.fail(err),
        }
    }

    /// Recomputes the snapshot from the local expense mirror, no request.
    pub fn refresh_local_analytics(&self, range: DateRange) -> AnalyticsSnapshot {
        let today = self.today();
        let mut guard = util::write(&self.state);
        let snapshot = AnalyticsSnapshot::project(&guard.expenses, range).with_trend(
            analytics::trend_series(&guard.expenses, today, self.trend_days),
        );
        guard.apply(LedgerAction::AnalyticsLoaded(snapshot.clone()));
        snapshot
    }

    /// Daily totals for the last `days` days, oldest first.
    pub fn trend(&self, days: usize) -> Vec<Money> {
        let today = self.today();
        analytics::trend_series(&util::read(&self.state).expenses, today, days)
    }

    pub fn month_total(&self) -> Money {
        let today = self.today();
        analytics::month_total(&util::read(&self.state).expenses, today)
    }

    pub fn balance_summary(&self) -> BalanceSummary {
        util::read(&self.state).balance_summary()
    }

    /// Reloads vaults, then the unfiltered expense list.
    pub async fn refresh_all(&self) -> Outcome<()> {
        self.list_vaults().await?;
        self.list_expenses(&ExpenseFilters::default()).await?;
        Ok(())
    }

    fn dispatch(&self, action: LedgerAction) {
        util::write(&self.state).apply(action);
    }

    fn fail<T>(&self, err: ClientError) -> Outcome<T> {
        let err = CoreError::from(err);
        tracing::debug!("ledger operation failed: {err}");
        self.dispatch(LedgerAction::Failed(err.to_string()));
        Err(err)
    }
}

/// Drops every mirror. Called by the session whenever it signs out.
pub(crate) fn reset(state: &RwLock<LedgerState>) {
    util::write(state).apply(LedgerAction::Reset);
}

fn validate_vault(data: &AccountUpsert) -> Outcome<()> {
    if data.name.trim().is_empty() {
        return Err(CoreError::validation("Vault name is required"));
    }
    if data.currency.trim().is_empty() {
        return Err(CoreError::validation("Currency is required"));
    }
    Ok(())
}
