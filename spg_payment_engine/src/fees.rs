//! Platform fee calculation.
//!
//! The calculator is pure and stateless so it can be tested in isolation and so settlement's fee math
//! is deterministic: the same gross amount always yields the same fee, with rounding half-up at the
//! sixth decimal — the precision of the settlement asset itself.

use serde::{Deserialize, Serialize};
use spg_common::MicroUsd;

/// The platform's standard fee: 1.5%.
pub const DEFAULT_PLATFORM_FEE_BPS: u32 = 150;

/// A fee rate in basis points, applied to gross settlement amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    rate_bps: u32,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self { rate_bps: DEFAULT_PLATFORM_FEE_BPS }
    }
}

impl FeeSchedule {
    pub fn new(rate_bps: u32) -> Self {
        Self { rate_bps }
    }

    pub fn rate_bps(&self) -> u32 {
        self.rate_bps
    }

    /// The platform fee for a gross amount, rounded half-up at micro-USD precision.
    ///
    /// `gross` must be non-negative; settlement rejects non-positive amounts before fees are computed.
    #[allow(clippy::cast_possible_truncation)]
    pub fn platform_fee(&self, gross: MicroUsd) -> MicroUsd {
        let raw = i128::from(gross.value()) * i128::from(self.rate_bps);
        let fee = (raw + 5_000) / 10_000;
        MicroUsd::from(fee as i64)
    }

    /// What the vendor receives: gross minus the platform fee.
    pub fn net_amount(&self, gross: MicroUsd) -> MicroUsd {
        gross - self.platform_fee(gross)
    }

    /// Computes the full gross/fee/net breakdown in one call.
    pub fn split(&self, gross: MicroUsd) -> FeeBreakdown {
        let fee = self.platform_fee(gross);
        FeeBreakdown { gross, fee, net: gross - fee }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub gross: MicroUsd,
    pub fee: MicroUsd,
    pub net: MicroUsd,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_rate_splits_1000_dollars() {
        let fees = FeeSchedule::default();
        let gross = MicroUsd::from_dollars(1000);
        assert_eq!(fees.platform_fee(gross), MicroUsd::from(15_000_000));
        assert_eq!(fees.net_amount(gross), MicroUsd::from(985_000_000));
    }

    #[test]
    fn breakdown_always_balances() {
        let fees = FeeSchedule::default();
        for v in [1, 299, 300, 12_345_678, 500_000_000, i64::from(u32::MAX)] {
            let split = fees.split(MicroUsd::from(v));
            assert_eq!(split.fee + split.net, split.gross);
        }
    }

    #[test]
    fn rounds_half_up_at_the_sixth_decimal() {
        let fees = FeeSchedule::default();
        // 300 micro-USD * 1.5% = 4.5 micro-USD, which rounds up
        assert_eq!(fees.platform_fee(MicroUsd::from(300)), MicroUsd::from(5));
        // 299 micro-USD * 1.5% = 4.485 micro-USD, which rounds down
        assert_eq!(fees.platform_fee(MicroUsd::from(299)), MicroUsd::from(4));
        assert_eq!(fees.platform_fee(MicroUsd::from(0)), MicroUsd::from(0));
    }

    #[test]
    fn custom_rates_apply() {
        let fees = FeeSchedule::new(0);
        assert_eq!(fees.platform_fee(MicroUsd::from_dollars(100)), MicroUsd::from(0));
        let fees = FeeSchedule::new(10_000);
        assert_eq!(fees.platform_fee(MicroUsd::from_dollars(100)), MicroUsd::from_dollars(100));
    }
}
