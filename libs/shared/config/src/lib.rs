use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub bind_address: String,
    pub scheduling: SchedulingConfig,
}

/// How a multi-item reservation is written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiBookingCommit {
    /// One bulk insert; the store applies it as a single statement.
    Atomic,
    /// One insert per item, cancelling the already-inserted rows if a later insert fails.
    Sequential,
}

impl FromStr for MultiBookingCommit {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "atomic" => Ok(MultiBookingCommit::Atomic),
            "sequential" => Ok(MultiBookingCommit::Sequential),
            other => Err(format!("unknown commit strategy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    /// Fixed offset of the clinic's wall clock from UTC. The clinic region does not observe DST.
    pub utc_offset_hours: i32,
    pub booking_lead_minutes: i32,
    pub next_slot_horizon_days: u32,
    pub display_horizon_days: u32,
    pub max_batch_items: usize,
    pub encaixe_checks_overlap: bool,
    pub multi_booking_commit: MultiBookingCommit,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: -3,
            booking_lead_minutes: 30,
            next_slot_horizon_days: 30,
            display_horizon_days: 7,
            max_batch_items: 5,
            encaixe_checks_overlap: true,
            multi_booking_commit: MultiBookingCommit::Atomic,
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut utc_offset_hours = parse_env("CLINIC_UTC_OFFSET_HOURS", defaults.utc_offset_hours);
        if !(-12..=14).contains(&utc_offset_hours) {
            warn!("CLINIC_UTC_OFFSET_HOURS={} is out of range, using {}", utc_offset_hours, defaults.utc_offset_hours);
            utc_offset_hours = defaults.utc_offset_hours;
        }

        Self {
            utc_offset_hours,
            booking_lead_minutes: parse_env("BOOKING_LEAD_MINUTES", defaults.booking_lead_minutes),
            next_slot_horizon_days: parse_env("NEXT_SLOT_HORIZON_DAYS", defaults.next_slot_horizon_days),
            display_horizon_days: parse_env("DISPLAY_HORIZON_DAYS", defaults.display_horizon_days),
            max_batch_items: parse_env("MAX_BATCH_ITEMS", defaults.max_batch_items),
            encaixe_checks_overlap: parse_env("ENCAIXE_CHECKS_OVERLAP", defaults.encaixe_checks_overlap),
            multi_booking_commit: parse_env("MULTI_BOOKING_COMMIT", defaults.multi_booking_commit),
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {:?}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            scheduling: SchedulingConfig::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_service_role_key.is_empty()
    }

    /// Token used against the store when the caller did not forward its own.
    pub fn service_token(&self) -> &str {
        &self.supabase_service_role_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduling_defaults() {
        let config = SchedulingConfig::default();
        assert_eq!(config.utc_offset_hours, -3);
        assert_eq!(config.booking_lead_minutes, 30);
        assert_eq!(config.next_slot_horizon_days, 30);
        assert_eq!(config.display_horizon_days, 7);
        assert_eq!(config.max_batch_items, 5);
        assert!(config.encaixe_checks_overlap);
        assert_eq!(config.multi_booking_commit, MultiBookingCommit::Atomic);
    }

    #[test]
    fn test_commit_strategy_parsing() {
        assert_eq!("atomic".parse::<MultiBookingCommit>(), Ok(MultiBookingCommit::Atomic));
        assert_eq!(" Sequential ".parse::<MultiBookingCommit>(), Ok(MultiBookingCommit::Sequential));
        assert!("saga".parse::<MultiBookingCommit>().is_err());
    }

    #[test]
    fn test_parse_env_falls_back_on_garbage() {
        std::env::set_var("SHARED_CONFIG_TEST_LEAD", "soon");
        assert_eq!(parse_env("SHARED_CONFIG_TEST_LEAD", 30), 30);
        std::env::set_var("SHARED_CONFIG_TEST_LEAD", "45");
        assert_eq!(parse_env("SHARED_CONFIG_TEST_LEAD", 30), 45);
        std::env::remove_var("SHARED_CONFIG_TEST_LEAD");
    }
}
