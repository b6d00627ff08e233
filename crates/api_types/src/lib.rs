//! JSON bodies exchanged with the FinanceX REST API.
//!
//! Identifiers are opaque server strings (`_id` on the wire). Amounts use
//! [`Money`], which travels as a decimal number and lives in cents locally.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use money::{Money, MoneyParseError};

mod money;

/// `YYYY-MM-DD` dates that tolerate a trailing time component.
///
/// The server stores expense dates as full timestamps
/// (`2024-01-05T00:00:00.000Z`); only the calendar day is kept.
pub mod date_only {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
        let day = raw.split('T').next().unwrap_or(raw);
        NaiveDate::parse_from_str(day.trim(), FORMAT)
    }
}

pub mod auth {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct User {
        #[serde(alias = "_id")]
        pub id: String,
        #[serde(default)]
        pub name: String,
        pub email: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Login {
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Register {
        pub name: String,
        pub email: String,
        pub password: String,
    }

    /// Returned by both login and registration.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AuthResponse {
        pub token: String,
        pub user: User,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MeResponse {
        pub user: User,
    }
}

pub mod account {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase", from = "String")]
    pub enum AccountType {
        #[default]
        Checking,
        Savings,
        Credit,
        Cash,
    }

    impl AccountType {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Checking => "checking",
                Self::Savings => "savings",
                Self::Credit => "credit",
                Self::Cash => "cash",
            }
        }
    }

    /// Unknown account types fall back to `checking`.
    impl From<String> for AccountType {
        fn from(value: String) -> Self {
            match value.to_ascii_lowercase().as_str() {
                "savings" => Self::Savings,
                "credit" => Self::Credit,
                "cash" => Self::Cash,
                _ => Self::Checking,
            }
        }
    }

    pub fn default_currency() -> String {
        "USD".to_string()
    }

    /// A vault as stored by the server.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Account {
        #[serde(rename = "_id", alias = "id")]
        pub id: String,
        pub name: String,
        #[serde(rename = "type", default)]
        pub kind: AccountType,
        pub balance: Money,
        #[serde(default = "default_currency")]
        pub currency: String,
    }

    /// Request body for creating or replacing a vault.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AccountUpsert {
        pub name: String,
        #[serde(rename = "type")]
        pub kind: AccountType,
        pub balance: Money,
        pub currency: String,
    }
}

pub mod expense {
    use chrono::{DateTime, Utc};

    use super::*;

    /// Open-ended category code. Empty or null input maps to `other`.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(from = "Option<String>", into = "String")]
    pub struct Category(String);

    impl Category {
        pub const OTHER: &'static str = "other";

        pub fn new(code: impl Into<String>) -> Self {
            let code = code.into();
            if code.trim().is_empty() {
                return Self::default();
            }
            Self(code)
        }

        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl Default for Category {
        fn default() -> Self {
            Self(Self::OTHER.to_string())
        }
    }

    impl From<&str> for Category {
        fn from(value: &str) -> Self {
            Self::new(value)
        }
    }

    impl From<Option<String>> for Category {
        fn from(value: Option<String>) -> Self {
            value.map(Self::new).unwrap_or_default()
        }
    }

    impl From<Category> for String {
        fn from(value: Category) -> Self {
            value.0
        }
    }

    impl std::fmt::Display for Category {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    /// The vault an expense was charged to.
    ///
    /// Depending on the endpoint the server returns either the bare id or the
    /// populated vault (`{"_id": .., "name": ..}`).
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum AccountRef {
        Id(String),
        Populated {
            #[serde(rename = "_id", alias = "id")]
            id: String,
            #[serde(default)]
            name: Option<String>,
        },
    }

    impl AccountRef {
        pub fn id(&self) -> &str {
            match self {
                Self::Id(id) => id,
                Self::Populated { id, .. } => id,
            }
        }

        pub fn name(&self) -> Option<&str> {
            match self {
                Self::Id(_) => None,
                Self::Populated { name, .. } => name.as_deref(),
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Expense {
        #[serde(rename = "_id", alias = "id")]
        pub id: String,
        #[serde(default)]
        pub description: String,
        pub amount: Money,
        #[serde(default)]
        pub category: Category,
        pub account: AccountRef,
        #[serde(with = "crate::date_only")]
        pub date: NaiveDate,
        #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
        pub created_at: Option<DateTime<Utc>>,
    }

    /// Request body for `POST /api/expenses`.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub description: String,
        pub amount: Money,
        pub category: Category,
        /// Id of the vault the expense is charged to.
        pub account: String,
        #[serde(with = "crate::date_only")]
        pub date: NaiveDate,
    }

    /// Query string for `GET /api/expenses`.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExpenseFilters {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub category: Option<Category>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub start_date: Option<NaiveDate>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub end_date: Option<NaiveDate>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub limit: Option<u32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseList {
        pub expenses: Vec<Expense>,
    }
}

pub mod analytics {
    use super::{expense::Category, *};

    /// Inclusive date range. Missing bounds are left to the server default
    /// (current month).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DateRange {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub start_date: Option<NaiveDate>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub end_date: Option<NaiveDate>,
    }

    impl DateRange {
        pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
            Self {
                start_date: Some(start_date),
                end_date: Some(end_date),
            }
        }

        pub fn contains(&self, date: NaiveDate) -> bool {
            self.start_date.is_none_or(|start| date >= start)
                && self.end_date.is_none_or(|end| date <= end)
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryTotal {
        #[serde(rename = "_id", alias = "category")]
        pub category: Category,
        pub total: Money,
        pub count: u64,
    }

    /// Response body of `GET /api/expenses/analytics`.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Analytics {
        #[serde(default)]
        pub total_spent: Money,
        #[serde(default)]
        pub category_breakdown: Vec<CategoryTotal>,
    }
}
