//! Client-side session and ledger state for FinanceX.
//!
//! [`Core::builder`] wires the pieces once at start-up:
//!
//! - [`SessionManager`]: login/registration/logout and the bearer credential.
//! - [`LedgerManager`]: expense and vault mirrors, analytics snapshot.
//! - [`client::Client`]: the JSON HTTP client both managers share. It reads
//!   the credential from the session on every request and reports 401s back
//!   to it.
//!
//! ```no_run
//! use financex_core::{Core, credentials::MemoryCredentialStore};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let core = Core::builder()
//!     .base_url("http://127.0.0.1:5000")
//!     .credential_store(Arc::new(MemoryCredentialStore::default()))
//!     .build()?;
//!
//! core.session.login("ada@example.com", "secret").await?;
//! core.ledger.refresh_all().await?;
//! println!("{} vaults", core.ledger.snapshot().vaults.len());
//! # Ok(())
//! # }
//! ```

use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use chrono_tz::Tz;

pub use error::{AppError, CoreError, Outcome, Result};
pub use ledger::{LedgerManager, LedgerState};
pub use session::{SessionManager, SessionState, SessionStatus};

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod ledger;
pub mod session;
mod util;

use crate::{
    client::Client,
    config::Settings,
    credentials::{CredentialStore, FileCredentialStore},
    ledger::analytics::DEFAULT_TREND_DAYS,
    session::SessionShared,
};

/// Both managers, sharing one HTTP client and one credential slot.
#[derive(Clone)]
pub struct Core {
    pub session: SessionManager,
    pub ledger: LedgerManager,
}

impl Core {
    /// Return a builder for `Core`.
    pub fn builder() -> CoreBuilder {
        CoreBuilder::default()
    }
}

#[derive(Default)]
pub struct CoreBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    store: Option<Arc<dyn CredentialStore>>,
    timezone: Option<Tz>,
    trend_days: Option<usize>,
}

impl CoreBuilder {
    pub fn base_url(mut self, base_url: &str) -> CoreBuilder {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> CoreBuilder {
        self.timeout = Some(timeout);
        self
    }

    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> CoreBuilder {
        self.store = Some(store);
        self
    }

    pub fn timezone(mut self, timezone: Tz) -> CoreBuilder {
        self.timezone = Some(timezone);
        self
    }

    pub fn trend_days(mut self, days: usize) -> CoreBuilder {
        self.trend_days = Some(days);
        self
    }

    /// Applies every field of `settings`, including a file-backed credential
    /// store at `settings.session_path`.
    pub fn settings(self, settings: &Settings) -> Result<CoreBuilder> {
        Ok(self
            .base_url(&settings.base_url)
            .timeout(settings.timeout())
            .credential_store(Arc::new(FileCredentialStore::new(&settings.session_path)))
            .timezone(settings.tz()?)
            .trend_days(settings.trend_days))
    }

    pub fn build(self) -> Result<Core> {
        let defaults = Settings::default();
        let timeout = self.timeout.unwrap_or_else(|| defaults.timeout());
        let base_url = self.base_url.unwrap_or(defaults.base_url);
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(FileCredentialStore::default()));

        tracing::info!("initializing client core for {base_url}");
        let ledger_state = Arc::new(RwLock::new(LedgerState::default()));
        let on_sign_out = {
            let ledger_state = ledger_state.clone();
            Box::new(move || ledger::reset(&ledger_state))
        };
        let shared = Arc::new(SessionShared::new(store, on_sign_out));
        let client = Client::new(&base_url, timeout, shared.clone())?;

        Ok(Core {
            session: SessionManager::new(shared, client.clone()),
            ledger: LedgerManager::new(
                ledger_state,
                client,
                self.timezone.unwrap_or(Tz::UTC),
                self.trend_days.unwrap_or(DEFAULT_TREND_DAYS),
            ),
        })
    }
}
