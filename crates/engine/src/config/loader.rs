use bases_core::{AccountId, InstrumentId};
use bases_matching::create_matching_algorithm;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use super::types::{
    InitialAccount, MaturityPolicyConfig, OpportunityPolicyConfig, SimulationSettings,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Tick interval must be at least 1ms")]
    InvalidTickInterval,
    #[error("Unknown matching algorithm: {0}")]
    UnknownMatchingAlgorithm(String),
    #[error("Duplicate instrument: {0}")]
    DuplicateInstrument(InstrumentId),
    #[error("Duplicate account: {0}")]
    DuplicateAccount(AccountId),
    #[error("The market account cannot be seeded")]
    MarketAccountSeeded,
    #[error("Seed balance for {0} must be positive")]
    InvalidSeedBalance(AccountId),
    #[error("{field} must be between 0 and 1, got {value}")]
    InvalidProbability { field: &'static str, value: f64 },
}

/// Load simulation settings from a JSON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<SimulationSettings, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let settings: SimulationSettings = serde_json::from_str(&content)?;
    Ok(settings)
}

/// Load settings from a JSON string
pub fn load_settings_from_str(json: &str) -> Result<SimulationSettings, ConfigError> {
    let settings: SimulationSettings = serde_json::from_str(json)?;
    Ok(settings)
}

/// Load the default embedded settings
pub fn load_default_settings() -> Result<SimulationSettings, ConfigError> {
    let default_settings = include_str!("default_simulation.json");
    load_settings_from_str(default_settings)
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { field, value })
    }
}

impl SimulationSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }
        if create_matching_algorithm(&self.matching_algorithm).is_err() {
            return Err(ConfigError::UnknownMatchingAlgorithm(
                self.matching_algorithm.clone(),
            ));
        }

        let mut instruments = HashSet::new();
        for instrument in &self.instruments {
            if !instruments.insert(instrument) {
                return Err(ConfigError::DuplicateInstrument(instrument.clone()));
            }
        }

        let mut accounts = HashSet::new();
        for account in &self.initial_accounts {
            if account.id.is_market() {
                return Err(ConfigError::MarketAccountSeeded);
            }
            if !account.balance.is_positive() {
                return Err(ConfigError::InvalidSeedBalance(account.id.clone()));
            }
            if !accounts.insert(&account.id) {
                return Err(ConfigError::DuplicateAccount(account.id.clone()));
            }
        }

        if let OpportunityPolicyConfig::Random { ranges, .. } = &self.opportunity_policy {
            check_probability("probability", ranges.probability)?;
            check_probability("unlock_probability", ranges.unlock_probability)?;
            check_probability("offer_probability", ranges.offer_probability)?;
        }
        if let MaturityPolicyConfig::Probabilistic {
            success_probability,
            ..
        } = &self.maturity_policy
        {
            check_probability("success_probability", *success_probability)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bases_core::Amount;

    #[test]
    fn test_load_default_settings() {
        let settings = load_default_settings().unwrap();
        assert!(!settings.instruments.is_empty());
        assert!(!settings.initial_accounts.is_empty());
        settings.validate().unwrap();
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings = load_settings_from_str(r#"{ "start_tick": 7 }"#).unwrap();
        assert_eq!(settings.start_tick, 7);
        assert_eq!(settings.matching_algorithm, "price-time");
        assert_eq!(settings.opportunity_policy, OpportunityPolicyConfig::None);
        settings.validate().unwrap();
    }

    #[test]
    fn test_tagged_policies() {
        let settings = load_settings_from_str(
            r#"{
                "opportunity_policy": { "kind": "random", "seed": 9 },
                "maturity_policy": {
                    "kind": "probabilistic",
                    "success_probability": 0.75,
                    "loss_fraction": "0.4",
                    "seed": 3
                }
            }"#,
        )
        .unwrap();

        assert!(matches!(
            settings.opportunity_policy,
            OpportunityPolicyConfig::Random { seed: 9, .. }
        ));
        assert_eq!(settings.maturity_policy.build().name(), "Probabilistic");
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut settings = SimulationSettings::default();
        settings.matching_algorithm = "pro-rata".to_string();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::UnknownMatchingAlgorithm(_))
        ));

        let mut settings = SimulationSettings::default();
        settings.initial_accounts = vec![
            InitialAccount {
                id: AccountId::from("a"),
                balance: Amount::from_minor(10),
            },
            InitialAccount {
                id: AccountId::from("a"),
                balance: Amount::from_minor(20),
            },
        ];
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::DuplicateAccount(_))
        ));

        let mut settings = SimulationSettings::default();
        settings.maturity_policy = MaturityPolicyConfig::Probabilistic {
            success_probability: 1.5,
            loss_fraction: rust_decimal::Decimal::ONE,
            seed: 0,
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidProbability { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_settings("/nonexistent/simulation.json"),
            Err(ConfigError::IoError(_))
        ));
    }
}
