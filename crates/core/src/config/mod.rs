use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::{
    credentials,
    error::{AppError, Result},
    ledger::analytics::DEFAULT_TREND_DAYS,
};

const DEFAULT_CONFIG_PATH: &str = "config/financex.toml";
const ENV_PREFIX: &str = "FINANCEX";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub session_path: String,
    /// IANA name used to decide what "today" is.
    pub timezone: String,
    pub trend_days: usize,
    pub level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://financex-y5dy.onrender.com".to_string(),
            timeout_secs: 10,
            session_path: credentials::default_session_path().to_string(),
            timezone: "UTC".to_string(),
            trend_days: DEFAULT_TREND_DAYS,
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Reads the optional TOML file, then `FINANCEX_*` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|err| AppError::Setting(format!("invalid timezone {}: {err}", self.timezone)))
    }
}
