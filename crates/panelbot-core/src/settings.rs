use std::time::Duration;

use serde::Deserialize;

use crate::{ports::PanelRepository, Result};

/// Settings table key under which the web panel stores bot configuration.
pub const SETTINGS_KEY: &str = "telegram";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Minutes,
    Hours,
}

impl Default for IntervalUnit {
    fn default() -> Self {
        Self::Minutes
    }
}

/// Snapshot of the operator-editable bot configuration.
///
/// A snapshot is fetched fresh at every decision point (session start, each
/// scheduler iteration, each inbound update) and never cached across them, so
/// runtime setting changes are observed without a push mechanism.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub admin_ids: Vec<String>,
    pub backup_enabled: bool,
    pub backup_interval: u64,
    pub backup_interval_unit: IntervalUnit,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: None,
            admin_ids: Vec::new(),
            backup_enabled: false,
            backup_interval: 60,
            backup_interval_unit: IntervalUnit::Minutes,
        }
    }
}

impl BotSettings {
    pub async fn fetch(repo: &dyn PanelRepository) -> Result<Self> {
        let Some(value) = repo.get_setting(SETTINGS_KEY).await? else {
            return Ok(Self::default());
        };
        Ok(serde_json::from_value(value)?)
    }

    /// The credential token, if configured and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.bot_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn interval_duration(&self) -> Duration {
        let interval = self.backup_interval.max(1);
        let secs = match self.backup_interval_unit {
            IntervalUnit::Hours => interval.saturating_mul(3600),
            IntervalUnit::Minutes => interval.saturating_mul(60),
        };
        Duration::from_secs(secs)
    }
}
