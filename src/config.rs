use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use chrono::{FixedOffset, NaiveDateTime, NaiveTime, Utc};

use crate::service::ShiftPolicy;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub log_level: tracing::Level,

    // Business rules
    pub business_offset: FixedOffset,
    pub shift_start: NaiveTime,
    pub shift_end: NaiveTime,
    pub full_day_hours: f64,
    pub payroll_working_days: u32,

    // Daily batch
    pub daily_batch_at: NaiveTime,
    pub daily_batch_enabled: bool,
    pub daily_batch_max: Duration,

    pub directory_cache_ttl: Duration,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_webhook_per_min: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key: &str| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("{key} must be set"));

        let offset_minutes: i32 = parse_or(&get, "BUSINESS_UTC_OFFSET_MINUTES", 330)?;
        let business_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| anyhow!("BUSINESS_UTC_OFFSET_MINUTES out of range"))?;

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: get("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10)?,
            run_migrations: parse_or(&get, "RUN_MIGRATIONS", true)?,
            log_level: parse_or(&get, "LOG_LEVEL", tracing::Level::INFO)?,

            business_offset,
            shift_start: time_or(&get, "SHIFT_START", "09:00")?,
            shift_end: time_or(&get, "SHIFT_END", "19:00")?,
            full_day_hours: parse_or(&get, "FULL_DAY_HOURS", 8.0)?,
            payroll_working_days: parse_or(&get, "PAYROLL_WORKING_DAYS", 26)?,

            daily_batch_at: time_or(&get, "DAILY_BATCH_AT", "19:30")?,
            daily_batch_enabled: parse_or(&get, "DAILY_BATCH_ENABLED", true)?,
            daily_batch_max: Duration::from_secs(parse_or(&get, "DAILY_BATCH_MAX_SECS", 300)?),

            directory_cache_ttl: Duration::from_secs(parse_or(&get, "DIRECTORY_CACHE_TTL_SECS", 60)?),

            rate_protected_per_min: parse_or(&get, "RATE_PROTECTED_PER_MIN", 1000)?,
            rate_webhook_per_min: parse_or(&get, "RATE_WEBHOOK_PER_MIN", 600)?,
        };

        if config.shift_end <= config.shift_start {
            return Err(anyhow!("SHIFT_END must be after SHIFT_START"));
        }
        if config.payroll_working_days == 0 {
            return Err(anyhow!("PAYROLL_WORKING_DAYS must be positive"));
        }
        Ok(config)
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::from_lookup(|key: &str| match key {
            "SERVER_ADDR" => Some("127.0.0.1:0".to_string()),
            "DATABASE_URL" => Some("mysql://localhost/test".to_string()),
            "JWT_SECRET" => Some("test-secret".to_string()),
            _ => None,
        })
        .unwrap()
    }

    pub fn shift_policy(&self) -> ShiftPolicy {
        ShiftPolicy {
            shift_start: self.shift_start,
            shift_end: self.shift_end,
            full_day_hours: self.full_day_hours,
        }
    }

    /// Current wall clock time in the business timezone.
    pub fn business_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.business_offset).naive_local()
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} has invalid value {raw:?}: {e}")),
        None => Ok(default),
    }
}

fn time_or(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> anyhow::Result<NaiveTime> {
    let raw = get(key).unwrap_or_else(|| default.to_string());
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .with_context(|| format!("{key} must be HH:MM, got {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SERVER_ADDR", "127.0.0.1:8080"),
        ("DATABASE_URL", "mysql://localhost/erp"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.business_offset.local_minus_utc(), 330 * 60);
        assert_eq!(config.shift_policy(), ShiftPolicy::default());
        assert_eq!(config.payroll_working_days, 26);
        assert_eq!(config.daily_batch_at, NaiveTime::from_hms_opt(19, 30, 0).unwrap());
        assert_eq!(config.daily_batch_max, Duration::from_secs(300));
        assert_eq!(config.log_level, tracing::Level::INFO);
        assert!(config.run_migrations);
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("SHIFT_START", "08:30"),
            ("SHIFT_END", "17:30"),
            ("PAYROLL_WORKING_DAYS", "22"),
            ("DAILY_BATCH_ENABLED", "false"),
            ("LOG_LEVEL", "debug"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.shift_start, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(config.payroll_working_days, 22);
        assert!(!config.daily_batch_enabled);
        assert_eq!(config.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn missing_or_bad_values_fail() {
        assert!(Config::from_lookup(lookup(&REQUIRED[..2])).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SHIFT_END", "7pm"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SHIFT_END", "08:00"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }
}
