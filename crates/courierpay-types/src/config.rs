//! Service configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{constants, CourierpayError, Result};

/// Top-level configuration for a CourierPay service instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Fee retained on `send_money` / `receive_money` (0.10 = 10%).
    pub fee_rate: Decimal,
    /// Exchange-rate endpoint settings.
    pub rate_oracle: RateOracleConfig,
    /// Pending-registration settings.
    pub registration: RegistrationConfig,
    /// Logging settings.
    pub log: LogConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            fee_rate: Decimal::new(constants::DEFAULT_FEE_PERCENT, 2),
            rate_oracle: RateOracleConfig::default(),
            registration: RegistrationConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Parse a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns `Serialization` for malformed JSON and `Configuration` for
    /// out-of-range values.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns `Configuration` describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return Err(CourierpayError::Configuration(format!(
                "fee_rate must be in [0, 1), got {}",
                self.fee_rate
            )));
        }
        if self.rate_oracle.timeout_ms == 0 {
            return Err(CourierpayError::Configuration(
                "rate_oracle.timeout_ms must be positive".into(),
            ));
        }
        if self.rate_oracle.base_url.is_empty() {
            return Err(CourierpayError::Configuration(
                "rate_oracle.base_url must not be empty".into(),
            ));
        }
        self.registration.validate()
    }
}

/// Exchange-rate endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateOracleConfig {
    /// Base URL; the source currency is appended as the last path segment.
    pub base_url: String,
    /// Per-request timeout in milliseconds. Expiry means "no rate".
    pub timeout_ms: u64,
}

impl Default for RateOracleConfig {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_RATE_ORACLE_URL.to_string(),
            timeout_ms: constants::DEFAULT_RATE_TIMEOUT_MS,
        }
    }
}

/// Pending-registration (OTP) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub ttl_secs: u64,
    pub otp_digits: u32,
}

impl RegistrationConfig {
    /// Passcodes wider than this do not fit a `u32`.
    pub const OTP_DIGITS: std::ops::RangeInclusive<u32> = 4..=9;

    /// # Errors
    /// Returns `Configuration` for a zero TTL or an OTP width outside
    /// [`Self::OTP_DIGITS`].
    pub fn validate(&self) -> Result<()> {
        if self.ttl_secs == 0 {
            return Err(CourierpayError::Configuration(
                "registration.ttl_secs must be positive".into(),
            ));
        }
        if !Self::OTP_DIGITS.contains(&self.otp_digits) {
            return Err(CourierpayError::Configuration(format!(
                "registration.otp_digits must be in 4..=9, got {}",
                self.otp_digits
            )));
        }
        Ok(())
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: constants::DEFAULT_REGISTRATION_TTL_SECS,
            otp_digits: constants::DEFAULT_OTP_DIGITS,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.fee_rate, Decimal::new(10, 2));
        assert_eq!(cfg.rate_oracle.timeout_ms, 5_000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = ServiceConfig::from_json(r#"{"fee_rate":"0.05","log":{"json":true}}"#).unwrap();
        assert_eq!(cfg.fee_rate, Decimal::new(5, 2));
        assert!(cfg.log.json);
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.registration.otp_digits, 6);
    }

    #[test]
    fn rejects_fee_of_one() {
        let err = ServiceConfig::from_json(r#"{"fee_rate":"1"}"#).unwrap_err();
        assert!(matches!(err, CourierpayError::Configuration(_)));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = ServiceConfig::from_json(r#"{"rate_oracle":{"timeout_ms":0}}"#).unwrap_err();
        assert!(matches!(err, CourierpayError::Configuration(_)));
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        let err = ServiceConfig::from_json("{").unwrap_err();
        assert!(matches!(err, CourierpayError::Serialization(_)));
    }
}
