//! Runtime configuration (§6), loaded from environment variables with the
//! typed defaults the spec enumerates. No config-framework dependency is
//! warranted for a flat table this size; parsing follows `chapaty`'s own
//! pattern of `std::env::var(..).ok().and_then(|v| v.parse().ok())`.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub days_in_year: i64,
    pub min_borrow_rate: Decimal,
    pub vol_factor: Decimal,
    pub event_factor: Decimal,
    pub default_markup_pct: Decimal,
    pub default_fee_flat: Decimal,
    pub limit_standard: u32,
    pub limit_premium: u32,
    pub cb_fail_threshold: u32,
    pub cb_success_threshold: u32,
    pub cb_timeout: Duration,
    pub retry_max_attempts: u32,
    pub retry_initial_wait: Duration,
    pub retry_backoff_factor: f64,
    pub retry_max_wait: Duration,
    pub retry_jitter_fraction: f64,
    pub upstream_timeout: Duration,
    pub request_deadline: Duration,
    pub borrow_rate_base_url: String,
    pub volatility_base_url: String,
    pub event_risk_base_url: String,
    pub listen_addr: String,
    pub log_json: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            days_in_year: env_or("DAYS_IN_YEAR", 365),
            min_borrow_rate: env_or("MIN_BORROW_RATE", dec!(0.0001)),
            vol_factor: env_or("VOL_FACTOR", dec!(0.01)),
            event_factor: env_or("EVENT_FACTOR", dec!(0.05)),
            default_markup_pct: env_or("DEFAULT_MARKUP_PCT", dec!(5.0)),
            default_fee_flat: env_or("DEFAULT_FEE_FLAT", dec!(25.0)),
            limit_standard: env_or("LIMIT_STANDARD", 60),
            limit_premium: env_or("LIMIT_PREMIUM", 300),
            cb_fail_threshold: env_or("CB_FAIL_THRESHOLD", 5),
            cb_success_threshold: env_or("CB_SUCCESS_THRESHOLD", 3),
            cb_timeout: Duration::from_secs(env_or("CB_TIMEOUT_S", 60)),
            retry_max_attempts: env_or("RETRY_MAX_ATTEMPTS", 3),
            retry_initial_wait: Duration::from_millis(env_or("RETRY_INITIAL_WAIT_MS", 100)),
            retry_backoff_factor: env_or("RETRY_BACKOFF_FACTOR", 2.0),
            retry_max_wait: Duration::from_secs(env_or("RETRY_MAX_WAIT_S", 30)),
            retry_jitter_fraction: env_or("RETRY_JITTER_FRACTION", 0.1),
            upstream_timeout: Duration::from_secs(env_or("UPSTREAM_TIMEOUT_S", 10)),
            request_deadline: Duration::from_secs(env_or("REQUEST_DEADLINE_S", 30)),
            borrow_rate_base_url: std::env::var("BORROW_RATE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            volatility_base_url: std::env::var("VOLATILITY_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8002".to_string()),
            event_risk_base_url: std::env::var("EVENT_RISK_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8003".to_string()),
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            log_json: env_or("LOG_JSON", false),
        }
    }

    pub fn retry_config(&self) -> crate::resilience::RetryConfig {
        crate::resilience::RetryConfig {
            max_attempts: self.retry_max_attempts,
            initial_wait: self.retry_initial_wait,
            backoff_factor: self.retry_backoff_factor,
            max_wait: self.retry_max_wait,
            jitter_fraction: self.retry_jitter_fraction,
        }
    }

    pub fn circuit_breaker_config(&self) -> crate::resilience::CircuitBreakerConfig {
        crate::resilience::CircuitBreakerConfig {
            failure_threshold: self.cb_fail_threshold,
            success_threshold: self.cb_success_threshold,
            timeout: self.cb_timeout,
        }
    }

    pub fn rate_engine_config(&self) -> crate::engine::rate::RateEngineConfig {
        crate::engine::rate::RateEngineConfig {
            vol_factor: self.vol_factor,
            event_factor: self.event_factor,
            min_borrow_rate: self.min_borrow_rate,
        }
    }
}
