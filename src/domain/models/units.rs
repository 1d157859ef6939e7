//! Ether denomination conversions.

use alloy::primitives::U256;

/// Wei per gwei.
pub const WEI_PER_GWEI: u64 = 1_000_000_000;

/// Wei per ether.
pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// Gwei per ether.
pub const GWEI_PER_ETH: u64 = 1_000_000_000;

/// Convert a gwei amount to wei. Exact for every `u64` input.
pub fn gwei_to_wei(gwei: u64) -> U256 {
    U256::from(gwei) * U256::from(WEI_PER_GWEI)
}

/// Convert wei to ether for display.
#[allow(clippy::cast_precision_loss)]
pub fn wei_to_eth(wei: U256) -> f64 {
    let per_eth = U256::from(WEI_PER_ETH);
    let Ok(whole) = u128::try_from(wei / per_eth) else {
        return f64::INFINITY;
    };
    let frac = u128::try_from(wei % per_eth).unwrap_or_default();
    whole as f64 + frac as f64 / WEI_PER_ETH as f64
}

/// Convert gwei to ether for display.
#[allow(clippy::cast_precision_loss)]
pub fn gwei_to_eth(gwei: u64) -> f64 {
    let whole = (gwei / GWEI_PER_ETH) as f64;
    let frac = (gwei % GWEI_PER_ETH) as f64 / GWEI_PER_ETH as f64;
    whole + frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_one_ether_in_gwei() {
        assert_eq!(gwei_to_wei(1_000_000_000), U256::from(WEI_PER_ETH));
        assert!((gwei_to_eth(1_000_000_000) - 1.0).abs() < f64::EPSILON);
        assert!((wei_to_eth(U256::from(WEI_PER_ETH)) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fractional_amounts() {
        assert!((gwei_to_eth(32_500_000_000) - 32.5).abs() < 1e-9);
        assert!((wei_to_eth(gwei_to_wei(1)) - 1e-9).abs() < 1e-18);
        assert_eq!(gwei_to_wei(0), U256::ZERO);
    }

    #[test]
    fn test_max_gwei_exceeds_u64_wei() {
        let wei = gwei_to_wei(u64::MAX);
        assert!(wei > U256::from(u64::MAX));
        assert_eq!(wei / U256::from(WEI_PER_GWEI), U256::from(u64::MAX));
        assert!(wei_to_eth(U256::MAX).is_infinite());
    }

    proptest! {
        #[test]
        fn prop_gwei_to_wei_is_exact(gwei in any::<u64>()) {
            let wei = gwei_to_wei(gwei);
            prop_assert_eq!(wei / U256::from(WEI_PER_GWEI), U256::from(gwei));
            prop_assert_eq!(wei % U256::from(WEI_PER_GWEI), U256::ZERO);
        }

        #[test]
        fn prop_display_conversions_agree(gwei in 0u64..1_000_000_000_000_000) {
            let via_wei = wei_to_eth(gwei_to_wei(gwei));
            let direct = gwei_to_eth(gwei);
            prop_assert!((via_wei - direct).abs() <= direct.abs() * 1e-12 + 1e-12);
        }
    }
}
