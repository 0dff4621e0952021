//! Rating system configuration

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Elo parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Maximum rating change per vote
    pub k_factor: f64,
    /// Rating assigned to newly created companies
    pub initial_rating: i32,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            k_factor: 32.0,
            initial_rating: 1500,
        }
    }
}

impl RatingConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.k_factor.is_finite() || self.k_factor <= 0.0 {
            return Err(anyhow!("K factor must be a positive number"));
        }
        if self.k_factor > 400.0 {
            return Err(anyhow!("K factor must not exceed 400"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k_factor_bounds() {
        assert!(RatingConfig::default().validate().is_ok());

        let config = RatingConfig {
            k_factor: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RatingConfig {
            k_factor: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RatingConfig {
            k_factor: 1000.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
