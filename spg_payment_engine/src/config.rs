//! Engine configuration, loaded from the environment.
//!
//! Every setting has a usable default so a development instance starts with zero configuration, but
//! the loader logs loudly about anything production must not run without (custody address, webhook
//! secret).

use std::env;

use log::*;
use spg_common::{helpers::parse_boolean_flag, MicroUsd, Secret};

use crate::{fees::FeeSchedule, helpers::normalize_settlement_address, spe_api::withdrawal_api::WithdrawalPolicy};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/spg_store.db";

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub database_url: String,
    pub fee_schedule: FeeSchedule,
    pub withdrawal_policy: WithdrawalPolicy,
    /// The platform custody address, normalized. Settlement silently ignores events for any other
    /// address.
    pub custody_address: String,
    /// Shared secret for the processor webhook signature.
    pub webhook_secret: Secret<String>,
    /// When false, webhook signature checks are skipped. Development only.
    pub verify_webhooks: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            fee_schedule: FeeSchedule::default(),
            withdrawal_policy: WithdrawalPolicy::default(),
            custody_address: String::default(),
            webhook_secret: Secret::default(),
            verify_webhooks: true,
        }
    }
}

impl EngineConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = env::var("SPG_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ SPG_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let fee_schedule = env::var("SPG_PLATFORM_FEE_BPS")
            .map(|s| {
                s.parse::<u32>().map(FeeSchedule::new).unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid basis-point value for SPG_PLATFORM_FEE_BPS. {e} Using the platform \
                         default instead."
                    );
                    FeeSchedule::default()
                })
            })
            .unwrap_or_default();
        let withdrawal_policy = configure_withdrawal_policy();
        let custody_address = env::var("SPG_CUSTODY_ADDRESS")
            .map(|s| normalize_settlement_address(&s))
            .ok()
            .unwrap_or_else(|| {
                error!(
                    "🪛️ SPG_CUSTODY_ADDRESS is not set. Settlement will not match any incoming event until the \
                     platform custody address is configured."
                );
                String::default()
            });
        let webhook_secret = env::var("SPG_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ SPG_WEBHOOK_SECRET is not set. Processor webhooks cannot be authenticated without it.");
            String::default()
        });
        let verify_webhooks = parse_boolean_flag(env::var("SPG_VERIFY_WEBHOOKS").ok(), true);
        if !verify_webhooks {
            warn!("🚨️ SPG_VERIFY_WEBHOOKS is off. Unsigned webhook payloads will be accepted.");
        }
        Self {
            database_url,
            fee_schedule,
            withdrawal_policy,
            custody_address,
            webhook_secret: Secret::new(webhook_secret),
            verify_webhooks,
        }
    }
}

fn configure_withdrawal_policy() -> WithdrawalPolicy {
    let defaults = WithdrawalPolicy::default();
    let minimum = env::var("SPG_MIN_WITHDRAWAL")
        .map_err(|_| {
            info!("🪛️ SPG_MIN_WITHDRAWAL is not set. Using the default of {}.", defaults.minimum);
        })
        .and_then(|s| {
            s.parse::<MicroUsd>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for SPG_MIN_WITHDRAWAL. {e}"))
        })
        .unwrap_or(defaults.minimum);
    let enhanced_review_threshold = env::var("SPG_ENHANCED_REVIEW_THRESHOLD")
        .map_err(|_| {
            info!(
                "🪛️ SPG_ENHANCED_REVIEW_THRESHOLD is not set. Using the default of {}.",
                defaults.enhanced_review_threshold
            );
        })
        .and_then(|s| {
            s.parse::<MicroUsd>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for SPG_ENHANCED_REVIEW_THRESHOLD. {e}"))
        })
        .unwrap_or(defaults.enhanced_review_threshold);
    WithdrawalPolicy { minimum, enhanced_review_threshold }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_safe_for_development() {
        let config = EngineConfig::default();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.fee_schedule.rate_bps(), 150);
        assert_eq!(config.withdrawal_policy.minimum, MicroUsd::from_dollars(25));
        assert_eq!(config.withdrawal_policy.enhanced_review_threshold, MicroUsd::from_dollars(10_000));
        assert!(config.verify_webhooks);
    }

    #[test]
    fn environment_overrides_are_applied_and_normalized() {
        env::set_var("SPG_PLATFORM_FEE_BPS", "200");
        env::set_var("SPG_MIN_WITHDRAWAL", "50");
        env::set_var("SPG_ENHANCED_REVIEW_THRESHOLD", "5000.50");
        env::set_var("SPG_CUSTODY_ADDRESS", "0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B");
        let config = EngineConfig::from_env_or_default();
        assert_eq!(config.fee_schedule.rate_bps(), 200);
        assert_eq!(config.withdrawal_policy.minimum, MicroUsd::from_dollars(50));
        assert_eq!(config.withdrawal_policy.enhanced_review_threshold, MicroUsd::from(5_000_500_000));
        assert_eq!(config.custody_address, "0xab5801a7d398351b8be11c439e05c5b3259aec9b");
        env::remove_var("SPG_PLATFORM_FEE_BPS");
        env::remove_var("SPG_MIN_WITHDRAWAL");
        env::remove_var("SPG_ENHANCED_REVIEW_THRESHOLD");
        env::remove_var("SPG_CUSTODY_ADDRESS");
    }
}
