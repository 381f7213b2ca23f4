//! Application configuration.

use crate::error::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tape_core::{ActiveAccount, Qty, SymbolProfile, SymbolTable, TimeInForce};
use tape_ws::ConnectionConfig;

/// One trading account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub id: String,
    /// Display label; falls back to the id.
    #[serde(default)]
    pub label: Option<String>,
    pub token: String,
    /// Default contract quantity. Floored to a whole number, min 1.
    #[serde(default = "default_quantity")]
    pub quantity: Decimal,
    #[serde(default)]
    pub time_in_force: TimeInForce,
    /// Inactive accounts are configured but not connected or traded.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_quantity() -> Decimal {
    Decimal::ONE
}

fn default_active() -> bool {
    true
}

impl AccountConfig {
    pub fn to_active_account(&self) -> ActiveAccount {
        ActiveAccount {
            account_id: self.id.clone().into(),
            label: self.label.clone().unwrap_or_else(|| self.id.clone()),
            quantity: Qty::normalize_contracts(self.quantity),
            time_in_force: self.time_in_force,
        }
    }
}

/// Instrument override or addition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolOverride {
    pub symbol: String,
    pub tick_size: Decimal,
    pub point_value: Decimal,
}

/// Socket reconnection tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Broker proxy REST base, e.g. `https://proxy.example.com`.
    pub broker_api_url: String,
    /// Broker proxy WebSocket base, e.g. `wss://proxy.example.com`.
    pub ws_url: String,
    #[serde(default = "default_broker")]
    pub broker: String,
    /// Symbol of the active chart.
    #[serde(default = "default_chart_symbol")]
    pub chart_symbol: String,
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub symbols: Vec<SymbolOverride>,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_broker() -> String {
    "tradovate".to_string()
}

fn default_chart_symbol() -> String {
    "NQ".to_string()
}

impl AppConfig {
    /// Load from `TAPE_CONFIG` or the default path.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("TAPE_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
        Self::from_file(&config_path)
    }

    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.broker_api_url.is_empty() {
            return Err(AppError::Config("broker_api_url is required".into()));
        }
        if self.ws_url.is_empty() {
            return Err(AppError::Config("ws_url is required".into()));
        }
        if self.accounts.is_empty() {
            return Err(AppError::Config("at least one account is required".into()));
        }
        Ok(())
    }

    /// Default instrument table plus config overrides.
    pub fn symbol_table(&self) -> SymbolTable {
        let mut table = SymbolTable::default();
        for o in &self.symbols {
            table.insert(SymbolProfile::new(
                o.symbol.clone(),
                o.tick_size,
                o.point_value,
            ));
        }
        table
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            base_url: self.ws_url.clone(),
            broker: self.broker.clone(),
            max_reconnect_attempts: self.reconnect.max_attempts,
            reconnect_base_delay: Duration::from_millis(self.reconnect.base_delay_ms),
            reconnect_max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
        }
    }

    /// Accounts selected for trading, with normalized quantities.
    pub fn active_accounts(&self) -> Vec<ActiveAccount> {
        self.accounts
            .iter()
            .filter(|a| a.active)
            .map(AccountConfig::to_active_account)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"
broker_api_url = "https://proxy.example.com"
ws_url = "wss://proxy.example.com"
chart_symbol = "NQ"

[[accounts]]
id = "ACC-1"
token = "tok-1"
quantity = 2

[[accounts]]
id = "ACC-2"
label = "Eval"
token = "tok-2"
active = false

[[symbols]]
symbol = "NQ"
tick_size = "0.5"
point_value = "20"
"#;

    #[test]
    fn test_parse_sample() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.broker, "tradovate");
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.reconnect.max_attempts, 5);
    }

    #[test]
    fn test_active_accounts_filters_and_normalizes() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        let active = config.active_accounts();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].label, "ACC-1");
        assert_eq!(active[0].quantity, Qty::new(dec!(2)));
        assert_eq!(active[0].time_in_force, TimeInForce::GoodTilCancelled);
    }

    #[test]
    fn test_fractional_quantity_floors_to_minimum_one() {
        let account = AccountConfig {
            id: "ACC-1".into(),
            label: None,
            token: "t".into(),
            quantity: dec!(0.4),
            time_in_force: TimeInForce::default(),
            active: true,
        };
        assert_eq!(account.to_active_account().quantity, Qty::new(dec!(1)));
    }

    #[test]
    fn test_symbol_override_applied() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        let table = config.symbol_table();
        assert_eq!(table.tick_size("NQ").inner(), dec!(0.5));
        // Untouched defaults survive
        assert_eq!(table.tick_size("ES").inner(), dec!(0.25));
    }

    #[test]
    fn test_validation_requires_accounts() {
        let stripped = r#"
broker_api_url = "https://proxy.example.com"
ws_url = "wss://proxy.example.com"
accounts = []
"#;
        let config: AppConfig = toml::from_str(stripped).unwrap();
        assert!(config.validate().is_err());
    }
}
