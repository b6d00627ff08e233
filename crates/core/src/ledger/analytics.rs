//! Pure projections over the ledger mirrors. Nothing here touches the network.

use std::collections::HashMap;

use api_types::{
    Money,
    account::Account,
    analytics::{Analytics, CategoryTotal, DateRange},
    expense::{Category, Expense},
};
use chrono::{Datelike, Days, NaiveDate};

pub const DEFAULT_TREND_DAYS: usize = 7;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Aggregated by `GET /api/expenses/analytics`.
    #[default]
    Server,
    /// Projected from the local expense mirror.
    Local,
}

/// Derived spending view for a date range. Not persisted, holds no identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnalyticsSnapshot {
    pub range: DateRange,
    pub total_spent: Money,
    pub category_breakdown: Vec<CategoryTotal>,
    /// Daily totals, oldest first, when requested.
    pub trend: Option<Vec<Money>>,
    pub source: SnapshotSource,
}

impl AnalyticsSnapshot {
    pub fn from_server(range: DateRange, analytics: Analytics) -> Self {
        let snapshot = Self {
            range,
            total_spent: analytics.total_spent,
            category_breakdown: analytics.category_breakdown,
            trend: None,
            source: SnapshotSource::Server,
        };
        if !snapshot.is_consistent() {
            tracing::warn!(
                "server analytics total {} differs from breakdown sum {}",
                snapshot.total_spent,
                snapshot.breakdown_total()
            );
        }
        snapshot
    }

    /// Aggregates the expenses falling inside `range` (inclusive).
    pub fn project(expenses: &[Expense], range: DateRange) -> Self {
        let category_breakdown =
            category_breakdown(expenses.iter().filter(|expense| range.contains(expense.date)));
        let total_spent = category_breakdown.iter().map(|c| c.total).sum();
        Self {
            range,
            total_spent,
            category_breakdown,
            trend: None,
            source: SnapshotSource::Local,
        }
    }

    pub fn with_trend(mut self, trend: Vec<Money>) -> Self {
        self.trend = Some(trend);
        self
    }

    pub fn breakdown_total(&self) -> Money {
        self.category_breakdown.iter().map(|c| c.total).sum()
    }

    pub fn is_consistent(&self) -> bool {
        self.total_spent == self.breakdown_total()
    }

    /// Fraction of the total spent in `category`, recomputed on every call.
    pub fn share(&self, category: &CategoryTotal) -> f64 {
        category.total.share_of(self.total_spent)
    }

    pub fn average_per_category(&self) -> Money {
        self.total_spent
            .div_round(self.category_breakdown.len() as u64)
    }

    /// `None` unless both ends of the range are known.
    pub fn daily_average(&self) -> Option<Money> {
        let start = self.range.start_date?;
        let end = self.range.end_date?;
        Some(daily_average(self.total_spent, start, end))
    }
}

/// Groups by raw category code; unknown codes get their own bucket.
///
/// Sorted by descending total, ties broken by category code.
pub fn category_breakdown<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> Vec<CategoryTotal> {
    let mut groups: HashMap<&Category, (Money, u64)> = HashMap::new();
    for expense in expenses {
        let entry = groups.entry(&expense.category).or_insert((Money::ZERO, 0));
        entry.0 += expense.amount;
        entry.1 += 1;
    }

    let mut breakdown: Vec<CategoryTotal> = groups
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category: category.clone(),
            total,
            count,
        })
        .collect();
    breakdown.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    breakdown
}

/// One bucket per calendar day for the `days` days ending at `today`,
/// oldest first. Days without expenses are zero.
pub fn trend_series(expenses: &[Expense], today: NaiveDate, days: usize) -> Vec<Money> {
    let mut buckets = vec![Money::ZERO; days];
    if days == 0 {
        return buckets;
    }

    let start = today
        .checked_sub_days(Days::new(days as u64 - 1))
        .unwrap_or(NaiveDate::MIN);
    for expense in expenses {
        if expense.date < start || expense.date > today {
            continue;
        }
        let offset = (expense.date - start).num_days();
        if let Some(bucket) = usize::try_from(offset).ok().and_then(|i| buckets.get_mut(i)) {
            *bucket += expense.amount;
        }
    }
    buckets
}

/// `total / max(1, days between start and end)`.
pub fn daily_average(total: Money, start: NaiveDate, end: NaiveDate) -> Money {
    let days = (end - start).num_days().max(1);
    total.div_round(days as u64)
}

pub fn average_transaction(category: &CategoryTotal) -> Money {
    category.total.div_round(category.count)
}

pub fn total_expenses(expenses: &[Expense]) -> Money {
    expenses.iter().map(|expense| expense.amount).sum()
}

/// Spending in the calendar month containing `today`.
pub fn month_total(expenses: &[Expense], today: NaiveDate) -> Money {
    expenses
        .iter()
        .filter(|expense| expense.date.year() == today.year() && expense.date.month() == today.month())
        .map(|expense| expense.amount)
        .sum()
}

/// First day of the month containing `today` through `today`.
pub fn month_to_date(today: NaiveDate) -> DateRange {
    DateRange::new(today.with_day(1).unwrap_or(today), today)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BalanceSummary {
    pub total: Money,
    pub average: Money,
    pub vaults: usize,
}

/// Sums balances as-is: vaults in different currencies are not converted.
pub fn balance_summary(vaults: &[Account]) -> BalanceSummary {
    let total: Money = vaults.iter().map(|vault| vault.balance).sum();
    BalanceSummary {
        total,
        average: total.div_round(vaults.len() as u64),
        vaults: vaults.len(),
    }
}
