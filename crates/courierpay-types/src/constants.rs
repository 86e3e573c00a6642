//! System-wide constants for CourierPay.

/// Fractional digits carried by every persisted monetary value.
pub const MONEY_SCALE: u32 = 2;

/// Fee retained on `send_money` / `receive_money`, in percent of the amount.
pub const DEFAULT_FEE_PERCENT: i64 = 10;

/// Mean Earth radius used by the haversine distance, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default exchange-rate endpoint. The base currency is appended as a path segment.
pub const DEFAULT_RATE_ORACLE_URL: &str = "https://api.exchangerate-api.com/v4/latest";

/// Default timeout for a single rate lookup, in milliseconds.
pub const DEFAULT_RATE_TIMEOUT_MS: u64 = 5_000;

/// How long a staged registration (and its OTP) stays valid, in seconds.
pub const DEFAULT_REGISTRATION_TTL_SECS: u64 = 600;

/// Number of digits in a registration OTP.
pub const DEFAULT_OTP_DIGITS: u32 = 6;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name.
pub const SERVICE_NAME: &str = "CourierPay";
