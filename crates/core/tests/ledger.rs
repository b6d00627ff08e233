use std::sync::Arc;

use api_types::{
    Money,
    account::{AccountType, AccountUpsert},
    analytics::DateRange,
    expense::{Category, ExpenseFilters, ExpenseNew},
};
use chrono::NaiveDate;
use financex_core::{
    Core, CoreError, SessionStatus, credentials::MemoryCredentialStore,
    ledger::analytics::SnapshotSource,
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{any, body_json, header, method, path, query_param},
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Core resumed from a stored token, with `/api/auth/me` answered.
async fn signed_in(server: &MockServer) -> Core {
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"_id": "u1", "name": "Ada", "email": "ada@example.com"}
        })))
        .mount(server)
        .await;

    let core = Core::builder()
        .base_url(&server.uri())
        .credential_store(Arc::new(MemoryCredentialStore::with_token("tok")))
        .build()
        .unwrap();
    core.session.bootstrap().await.unwrap();
    core
}

async fn mount_vaults(server: &MockServer, vaults: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vaults))
        .mount(server)
        .await;
}

fn lunch(vault: &str) -> ExpenseNew {
    ExpenseNew {
        description: "Lunch".to_string(),
        amount: Money::new(4000),
        category: Category::new("food"),
        account: vault.to_string(),
        date: day(2024, 1, 5),
    }
}

fn vault_upsert(name: &str, cents: i64) -> AccountUpsert {
    AccountUpsert {
        name: name.to_string(),
        kind: AccountType::Checking,
        balance: Money::new(cents),
        currency: "USD".to_string(),
    }
}

#[tokio::test]
async fn add_expense_prepends_server_record() {
    let server = MockServer::start().await;
    let core = signed_in(&server).await;
    mount_vaults(
        &server,
        json!([{"_id": "a", "name": "Main", "type": "checking", "balance": 100, "currency": "USD"}]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/expenses"))
        .and(header("authorization", "Bearer tok"))
        .and(body_json(json!({
            "description": "Lunch",
            "amount": 40.0,
            "category": "food",
            "account": "a",
            "date": "2024-01-05"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "e1",
            "description": "Lunch",
            "amount": 40,
            "category": "food",
            "account": {"_id": "a", "name": "Main"},
            "date": "2024-01-05T00:00:00.000Z",
            "createdAt": "2024-01-05T12:30:00.000Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    core.ledger.list_vaults().await.unwrap();
    let added = core.ledger.add_expense(lunch("a")).await.unwrap();

    assert_eq!(added.amount, Money::new(4000));
    assert_eq!(added.account.id(), "a");
    assert_eq!(added.account.name(), Some("Main"));

    let state = core.ledger.snapshot();
    assert_eq!(state.expenses.len(), 1);
    assert_eq!(state.expenses[0].id, "e1");
    assert_eq!(state.expenses[0].date, day(2024, 1, 5));
    assert_eq!(state.orphaned_expenses().count(), 0);

    let snapshot = core.ledger.refresh_local_analytics(DateRange::default());
    assert_eq!(snapshot.source, SnapshotSource::Local);
    assert_eq!(snapshot.total_spent, Money::new(4000));
    assert_eq!(snapshot.category_breakdown.len(), 1);
    let food = &snapshot.category_breakdown[0];
    assert_eq!(food.category.as_str(), "food");
    assert_eq!(food.total, Money::new(4000));
    assert_eq!(food.count, 1);
}

#[tokio::test]
async fn newest_expense_comes_first() {
    let server = MockServer::start().await;
    let core = signed_in(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/expenses"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "e1", "description": "Lunch", "amount": 40,
            "category": "food", "account": "a", "date": "2024-01-05"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/expenses"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "e2", "description": "Bus", "amount": 2.5,
            "category": "transport", "account": "a", "date": "2024-01-06"
        })))
        .mount(&server)
        .await;

    core.ledger.add_expense(lunch("a")).await.unwrap();
    core.ledger.add_expense(lunch("a")).await.unwrap();

    let ids: Vec<_> = core
        .ledger
        .snapshot()
        .expenses
        .into_iter()
        .map(|expense| expense.id)
        .collect();
    assert_eq!(ids, ["e2", "e1"]);
}

#[tokio::test]
async fn invalid_expense_never_reaches_server() {
    let server = MockServer::start().await;
    let core = signed_in(&server).await;
    Mock::given(any())
        .and(path("/api/expenses"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = core.ledger.add_expense(lunch("")).await.unwrap_err();
    assert_eq!(err, CoreError::Validation("Please select a vault".to_string()));

    let mut free = lunch("a");
    free.amount = Money::new(0);
    assert!(matches!(
        core.ledger.add_expense(free).await,
        Err(CoreError::Validation(_))
    ));

    let state = core.ledger.snapshot();
    assert!(state.expenses.is_empty());
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn list_expenses_sends_filters_and_replaces_mirror() {
    let server = MockServer::start().await;
    let core = signed_in(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/expenses"))
        .and(query_param("category", "food"))
        .and(query_param("startDate", "2024-01-01"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"expenses": [
            {"_id": "e1", "description": "Lunch", "amount": 12.5, "category": "food",
             "account": "a", "date": "2024-01-05"}
        ]})))
        .expect(1)
        .mount(&server)
        .await;

    let filters = ExpenseFilters {
        category: Some(Category::new("food")),
        start_date: Some(day(2024, 1, 1)),
        end_date: None,
        limit: Some(5),
    };
    let expenses = core.ledger.list_expenses(&filters).await.unwrap();

    assert_eq!(expenses.len(), 1);
    let state = core.ledger.snapshot();
    assert!(!state.loading);
    assert_eq!(state.expenses, expenses);
}

#[tokio::test]
async fn delete_expense_waits_for_confirmation() {
    let server = MockServer::start().await;
    let core = signed_in(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/expenses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"expenses": [
            {"_id": "e1", "description": "Lunch", "amount": 40, "category": "food",
             "account": "a", "date": "2024-01-05"},
            {"_id": "e2", "description": "Bus", "amount": 3, "category": "transport",
             "account": "a", "date": "2024-01-06"}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/expenses/e1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Expense removed"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/expenses/e2"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Expense not found"})))
        .mount(&server)
        .await;

    core.ledger.list_expenses(&ExpenseFilters::default()).await.unwrap();

    core.ledger.delete_expense("e1").await.unwrap();
    let state = core.ledger.snapshot();
    assert!(state.expense("e1").is_none());
    assert_eq!(state.expenses.len(), 1);

    let err = core.ledger.delete_expense("e2").await.unwrap_err();
    assert_eq!(err, CoreError::Server("Expense not found".to_string()));
    let state = core.ledger.snapshot();
    assert!(state.expense("e2").is_some());
    assert_eq!(state.last_error.as_deref(), Some("Expense not found"));
}

#[tokio::test]
async fn vault_lifecycle_follows_server_records() {
    let server = MockServer::start().await;
    let core = signed_in(&server).await;
    mount_vaults(
        &server,
        json!([
            {"_id": "a", "name": "Main", "type": "checking", "balance": 150, "currency": "USD"},
            {"_id": "b", "name": "Card", "type": "credit", "balance": -25.5, "currency": "USD"}
        ]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/accounts"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "c", "name": "Jar", "type": "cash", "balance": 10, "currency": "USD"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/accounts/a"))
        .and(body_json(json!({
            "name": "Main renamed", "type": "checking", "balance": 175.0, "currency": "USD"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "a", "name": "Main renamed", "type": "checking", "balance": 175, "currency": "USD"
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/accounts/b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Account removed"})))
        .mount(&server)
        .await;

    core.ledger.list_vaults().await.unwrap();
    let summary = core.ledger.balance_summary();
    assert_eq!(summary.total, Money::new(12450));
    assert_eq!(summary.average, Money::new(6225));

    core.ledger.create_vault(vault_upsert("Jar", 1000)).await.unwrap();
    assert_eq!(core.ledger.snapshot().vaults.last().unwrap().id, "c");

    core.ledger
        .update_vault("a", vault_upsert("Main renamed", 17500))
        .await
        .unwrap();
    core.ledger.delete_vault("b").await.unwrap();

    let state = core.ledger.snapshot();
    let names: Vec<_> = state.vaults.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["Main renamed", "Jar"]);
    assert!(state.vault("b").is_none());
}

#[tokio::test]
async fn deleting_vault_keeps_its_expenses() {
    let server = MockServer::start().await;
    let core = signed_in(&server).await;
    mount_vaults(
        &server,
        json!([{"_id": "a", "name": "Main", "type": "checking", "balance": 100, "currency": "USD"}]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/expenses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"expenses": [
            {"_id": "e1", "description": "Lunch", "amount": 40, "category": "food",
             "account": "a", "date": "2024-01-05"}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/accounts/a"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    core.ledger.refresh_all().await.unwrap();
    core.ledger.delete_vault("a").await.unwrap();

    let state = core.ledger.snapshot();
    assert!(state.vaults.is_empty());
    let orphans: Vec<_> = state.orphaned_expenses().map(|e| e.id.as_str()).collect();
    assert_eq!(orphans, ["e1"]);
}

#[tokio::test]
async fn empty_vault_name_is_rejected() {
    let server = MockServer::start().await;
    let core = signed_in(&server).await;
    Mock::given(any())
        .and(path("/api/accounts"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = core.ledger.create_vault(vault_upsert("   ", 0)).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert!(core.ledger.snapshot().vaults.is_empty());
}

#[tokio::test]
async fn analytics_queries_range_and_keeps_server_breakdown() {
    let server = MockServer::start().await;
    let core = signed_in(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/expenses/analytics"))
        .and(query_param("startDate", "2024-01-01"))
        .and(query_param("endDate", "2024-01-31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSpent": 70,
            "categoryBreakdown": [
                {"_id": "food", "total": 50, "count": 2},
                {"_id": "pets", "total": 20, "count": 1}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let range = DateRange::new(day(2024, 1, 1), day(2024, 1, 31));
    let snapshot = core.ledger.compute_analytics(range).await.unwrap();

    assert_eq!(snapshot.source, SnapshotSource::Server);
    assert!(snapshot.is_consistent());
    assert_eq!(snapshot.category_breakdown[1].category.as_str(), "pets");
    assert_eq!(snapshot.trend.as_ref().map(Vec::len), Some(7));
    assert_eq!(core.ledger.snapshot().analytics, Some(snapshot));
}

#[tokio::test]
async fn server_error_keeps_prior_data() {
    let server = MockServer::start().await;
    let core = signed_in(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"_id": "a", "name": "Main", "type": "checking", "balance": 100, "currency": "USD"}
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/accounts"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    core.ledger.list_vaults().await.unwrap();
    let err = core.ledger.list_vaults().await.unwrap_err();

    assert_eq!(err, CoreError::Server("Internal Server Error".to_string()));
    let state = core.ledger.snapshot();
    assert_eq!(state.vaults.len(), 1);
    assert_eq!(state.last_error.as_deref(), Some("Internal Server Error"));
    assert_eq!(core.session.status(), SessionStatus::Authenticated);

    core.ledger.clear_error();
    assert!(core.ledger.snapshot().last_error.is_none());
}
