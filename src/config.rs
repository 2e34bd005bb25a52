use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub dispatch_queue_size: usize,
    pub event_buffer_size: usize,
    /// How long a broadcast offer stays open; matches the countdown shown
    /// in the courier app.
    pub offer_ttl_secs: u64,
    /// Initial candidate search radius around the pickup point.
    pub search_radius_km: f64,
    /// Radius widening applied per re-broadcast attempt.
    pub radius_increment_km: f64,
    /// Attempts before a trip is escalated to manual dispatch.
    pub max_dispatch_attempts: u32,
    pub retry_backoff_ms: u64,
    pub expiry_sweep_interval_secs: u64,
    pub reconcile_interval_secs: u64,
    pub base_fee: f64,
    pub per_km_fee: f64,
    pub commission_rate: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            dispatch_queue_size: parse_or_default("DISPATCH_QUEUE_SIZE", 1024)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            offer_ttl_secs: parse_or_default("OFFER_TTL_SECS", 30)?,
            search_radius_km: parse_or_default("SEARCH_RADIUS_KM", 5.0)?,
            radius_increment_km: parse_or_default("RADIUS_INCREMENT_KM", 2.5)?,
            max_dispatch_attempts: parse_or_default("MAX_DISPATCH_ATTEMPTS", 3)?,
            retry_backoff_ms: parse_or_default("RETRY_BACKOFF_MS", 250)?,
            expiry_sweep_interval_secs: parse_or_default("EXPIRY_SWEEP_INTERVAL_SECS", 5)?,
            reconcile_interval_secs: parse_or_default("RECONCILE_INTERVAL_SECS", 30)?,
            base_fee: parse_or_default("BASE_FEE", 2.5)?,
            per_km_fee: parse_or_default("PER_KM_FEE", 1.2)?,
            commission_rate: parse_or_default("COMMISSION_RATE", 0.2)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            dispatch_queue_size: 1024,
            event_buffer_size: 1024,
            offer_ttl_secs: 30,
            search_radius_km: 5.0,
            radius_increment_km: 2.5,
            max_dispatch_attempts: 3,
            retry_backoff_ms: 250,
            expiry_sweep_interval_secs: 5,
            reconcile_interval_secs: 30,
            base_fee: 2.5,
            per_km_fee: 1.2,
            commission_rate: 0.2,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
