use api_types::{Money, account::Account};
use chrono::{Days, NaiveDate};
use financex_core::{
    LedgerState,
    ledger::{AnalyticsSnapshot, analytics},
};

pub fn expenses(state: &LedgerState) {
    if state.expenses.is_empty() {
        println!("no expenses");
        return;
    }
    for expense in &state.expenses {
        let vault = expense
            .account
            .name()
            .or_else(|| state.vault(expense.account.id()).map(|v| v.name.as_str()))
            .unwrap_or("(deleted vault)");
        println!(
            "{}  {:>10}  {:<14} {:<24} {} [{}]",
            expense.date,
            expense.amount.to_string(),
            expense.category.as_str(),
            vault,
            expense.description,
            expense.id
        );
    }
}

pub fn vaults(vaults: &[Account]) {
    if vaults.is_empty() {
        println!("no vaults");
        return;
    }
    for vault in vaults {
        println!(
            "{:<24} {:<9} {:>12} {}  [{}]",
            vault.name,
            vault.kind.as_str(),
            vault.balance.to_string(),
            vault.currency,
            vault.id
        );
    }
}

pub fn summary(state: &LedgerState, month_total: Money) {
    let balances = state.balance_summary();
    println!("vaults:         {}", balances.vaults);
    println!("total balance:  {}", balances.total);
    println!("average:        {}", balances.average);
    println!("all expenses:   {}", analytics::total_expenses(&state.expenses));
    println!("this month:     {month_total}");

    let orphans = state.orphaned_expenses().count();
    if orphans > 0 {
        println!("{orphans} expense(s) reference a deleted vault");
    }
}

pub fn snapshot(snapshot: &AnalyticsSnapshot, today: NaiveDate) {
    let start = snapshot.range.start_date;
    let end = snapshot.range.end_date;
    match (start, end) {
        (Some(start), Some(end)) => println!("{start} .. {end}"),
        (Some(start), None) => println!("since {start}"),
        (None, Some(end)) => println!("until {end}"),
        (None, None) => println!("all time"),
    }
    println!("total spent:    {}", snapshot.total_spent);
    if let Some(average) = snapshot.daily_average() {
        println!("daily average:  {average}");
    }
    println!("per category:   {}", snapshot.average_per_category());

    for category in &snapshot.category_breakdown {
        println!(
            "  {:<14} {:>10} {:>5.1}%  {:>3} tx, avg {}",
            category.category.as_str(),
            category.total.to_string(),
            snapshot.share(category) * 100.0,
            category.count,
            analytics::average_transaction(category)
        );
    }

    if let Some(series) = &snapshot.trend {
        trend(series, today);
    }
}

pub fn trend(series: &[Money], today: NaiveDate) {
    let oldest = series.len().saturating_sub(1) as u64;
    for (offset, total) in series.iter().enumerate() {
        let Some(day) = today.checked_sub_days(Days::new(oldest - offset as u64)) else {
            continue;
        };
        println!("{day}  {:>10}", total.to_string());
    }
}
