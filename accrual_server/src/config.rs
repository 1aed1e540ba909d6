//! Server configuration
//!
//! The server is configured with environment variables (a `.env` file is also read at startup):
//!
//! | Variable                       | Default                    | Meaning                                          |
//! |--------------------------------|----------------------------|--------------------------------------------------|
//! | `ACCRUAL_HOST`                 | `127.0.0.1`                | Address the server binds to                      |
//! | `ACCRUAL_PORT`                 | `8080`                     | Port the server binds to                         |
//! | `ACCRUAL_DATABASE_URL`         | `sqlite://data/accrual.db` | SQLite database URL                              |
//! | `ACCRUAL_REQUEST_TIMEOUT_MS`   | `3000`                     | Deadline for storage calls made by handlers      |
//! | `ACCRUAL_RATE_LIMIT_RPS`       | `50`                       | Token refill rate per client                     |
//! | `ACCRUAL_RATE_LIMIT_BURST`     | `5`                        | Token bucket capacity per client                 |
//! | `ACCRUAL_RETRY_AFTER_SECS`     | `60`                       | `Retry-After` value on rate-limited responses    |
//! | `ACCRUAL_NOTIFICATION_BUFFER`  | `64`                       | Capacity of the new-order notification channel   |
//! | `ACCRUAL_SWEEP_INTERVAL_SECS`  | `30`                       | Period of the registered-order sweep. 0 disables |
//! | `ACCRUAL_USE_X_FORWARDED_FOR`  | `false`                    | Identify clients by `X-Forwarded-For`            |
//! | `ACCRUAL_USE_FORWARDED`        | `false`                    | Identify clients by `Forwarded`                  |
use std::{env, fmt::Display, str::FromStr, time::Duration};

use accrual_engine::admission::AdmissionConfig;
use log::*;

const DEFAULT_ACCRUAL_HOST: &str = "127.0.0.1";
const DEFAULT_ACCRUAL_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/accrual.db";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(3000);
const DEFAULT_RATE_LIMIT_RPS: f64 = 50.0;
const DEFAULT_RATE_LIMIT_BURST: u32 = 5;
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);
const DEFAULT_NOTIFICATION_BUFFER: usize = 64;
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Every storage call made while handling a request must complete within this time.
    pub request_timeout: Duration,
    pub admission: AdmissionConfig,
    pub notification_buffer: usize,
    /// `None` disables the periodic sweep. New orders are then only processed in response to notifications.
    pub sweep_interval: Option<Duration>,
    pub proxy: ProxyConfig,
}

/// Controls how the client identity used for rate limiting is determined.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProxyConfig {
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
}

/// Deadline applied to storage calls made by request handlers. Stored as app data.
#[derive(Clone, Copy, Debug)]
pub struct RequestTimeout(pub Duration);

impl Default for RequestTimeout {
    fn default() -> Self {
        Self(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_ACCRUAL_HOST.to_string(),
            port: DEFAULT_ACCRUAL_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            admission: AdmissionConfig {
                rate: DEFAULT_RATE_LIMIT_RPS,
                burst: DEFAULT_RATE_LIMIT_BURST,
                retry_after: DEFAULT_RETRY_AFTER,
            },
            notification_buffer: DEFAULT_NOTIFICATION_BUFFER,
            sweep_interval: Some(DEFAULT_SWEEP_INTERVAL),
            proxy: ProxyConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let host = env::var("ACCRUAL_HOST").ok().unwrap_or_else(|| DEFAULT_ACCRUAL_HOST.into());
        let port = parse_env("ACCRUAL_PORT", DEFAULT_ACCRUAL_PORT);
        let database_url = env::var("ACCRUAL_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ ACCRUAL_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let timeout_ms = parse_env("ACCRUAL_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT.as_millis() as u64);
        let request_timeout = if timeout_ms == 0 {
            error!("🪛️ ACCRUAL_REQUEST_TIMEOUT_MS cannot be zero. Using the default instead.");
            DEFAULT_REQUEST_TIMEOUT
        } else {
            Duration::from_millis(timeout_ms)
        };
        let rate = parse_env("ACCRUAL_RATE_LIMIT_RPS", DEFAULT_RATE_LIMIT_RPS);
        let rate = if rate.is_finite() && rate >= 0.0 {
            rate
        } else {
            error!("🪛️ ACCRUAL_RATE_LIMIT_RPS must be a non-negative number. Using {DEFAULT_RATE_LIMIT_RPS} instead.");
            DEFAULT_RATE_LIMIT_RPS
        };
        let burst = parse_env("ACCRUAL_RATE_LIMIT_BURST", DEFAULT_RATE_LIMIT_BURST);
        let retry_after =
            Duration::from_secs(parse_env("ACCRUAL_RETRY_AFTER_SECS", DEFAULT_RETRY_AFTER.as_secs()));
        let notification_buffer = parse_env("ACCRUAL_NOTIFICATION_BUFFER", DEFAULT_NOTIFICATION_BUFFER).max(1);
        let sweep_interval = match parse_env("ACCRUAL_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL.as_secs()) {
            0 => {
                info!("🪛️ The registered-order sweep is disabled");
                None
            },
            secs => Some(Duration::from_secs(secs)),
        };
        let use_x_forwarded_for = env_flag("ACCRUAL_USE_X_FORWARDED_FOR");
        let use_forwarded = env_flag("ACCRUAL_USE_FORWARDED");
        Self {
            host,
            port,
            database_url,
            request_timeout,
            admission: AdmissionConfig { rate, burst, retry_after },
            notification_buffer,
            sweep_interval,
            proxy: ProxyConfig { use_x_forwarded_for, use_forwarded },
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name).map(|s| &s == "1" || &s == "true").unwrap_or(false)
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    env::var(name)
        .map(|s| {
            s.parse::<T>().unwrap_or_else(|e| {
                error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
                default
            })
        })
        .ok()
        .unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.admission.burst, 5);
        assert_eq!(config.admission.retry_after, Duration::from_secs(60));
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(30)));
        assert!(!config.proxy.use_x_forwarded_for);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        env::set_var("ACCRUAL_TEST_PORT_VALUE", "not-a-port");
        assert_eq!(parse_env("ACCRUAL_TEST_PORT_VALUE", 8080u16), 8080);
        env::set_var("ACCRUAL_TEST_PORT_VALUE", "9000");
        assert_eq!(parse_env("ACCRUAL_TEST_PORT_VALUE", 8080u16), 9000);
        assert_eq!(parse_env("ACCRUAL_TEST_UNSET_VALUE", 7u32), 7);
    }
}
