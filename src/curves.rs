//! Pure minting- and vesting-curve primitives.
//!
//! Every function here is a closed-form function of elapsed network time
//! (days since network launch) or of cumulative capped power. The daily
//! engine consumes these outputs; nothing in this module reads simulation
//! state.

use crate::constants::EIB;

/// Total token supply cap.
pub const FIL_BASE: f64 = 2_000_000_000.0;

/// Share of the supply cap allocated to storage mining.
pub const MINING_ALLOCATION: f64 = 0.55 * FIL_BASE;

/// Simple-minting share of the mining allocation (pure time decay).
pub const SIMPLE_ALLOCATION: f64 = 0.3 * MINING_ALLOCATION;

/// Baseline-minting share of the mining allocation (capped-power gated).
pub const BASELINE_ALLOCATION: f64 = 0.7 * MINING_ALLOCATION;

/// Initial baseline storage target in bytes (2.888... EiB at launch).
pub const BASELINE_B0: f64 = 2.888_888_888 * EIB;

/// Per-day decay rate of both minting curves: six-year half-life.
fn lambda() -> f64 {
    std::f64::consts::LN_2 / (6.0 * 365.25)
}

/// Per-day baseline growth rate: the baseline target doubles yearly.
fn growth() -> f64 {
    std::f64::consts::LN_2 / 365.25
}

/// Baseline storage target in bytes, `days` after network launch.
pub fn baseline_power(days: f64) -> f64 {
    BASELINE_B0 * (growth() * days).exp()
}

/// Cumulative simple-minting reward `days` after network launch.
pub fn cum_simple_minting(days: f64) -> f64 {
    SIMPLE_ALLOCATION * (1.0 - (-lambda() * days).exp())
}

/// Network time: the monotone transform of cumulative capped power
/// (byte-days) used to index the baseline reward curve.
pub fn network_time(cum_capped_power: f64) -> f64 {
    let g = growth();
    (1.0 / g) * (g * cum_capped_power / BASELINE_B0 + 1.0).ln()
}

/// Cumulative baseline reward at a given network time.
pub fn cum_baseline_reward(time: f64) -> f64 {
    BASELINE_ALLOCATION * (1.0 - (-lambda() * time).exp())
}

/// Genesis vesting tranches: (amount in FIL, linear vest length in days).
/// A zero length vests fully at launch.
const VEST_TRANCHES: [(f64, f64); 6] = [
    (50_000_000.0, 0.0),
    (130_000_000.0, 183.0),
    (120_000_000.0, 365.0),
    (100_000_000.0, 730.0),
    (100_000_000.0, 1095.0),
    (600_000_000.0, 2191.0),
];

/// Total vested genesis tokens `days` after network launch. Each tranche
/// vests linearly over its own window.
pub fn total_vested(days: f64) -> f64 {
    VEST_TRANCHES
        .iter()
        .map(|&(amount, length)| {
            if length <= 0.0 {
                amount
            } else {
                amount * (days / length).clamp(0.0, 1.0)
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_doubles_yearly() {
        let one_year = baseline_power(365.25);
        assert!((one_year / BASELINE_B0 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_simple_minting_half_life() {
        // Half the simple allocation mints in six years.
        let six_years = cum_simple_minting(6.0 * 365.25);
        assert!((six_years / SIMPLE_ALLOCATION - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_simple_minting_monotone_and_bounded() {
        let mut prev = 0.0;
        for d in 0..5000 {
            let v = cum_simple_minting(d as f64);
            assert!(v >= prev);
            assert!(v <= SIMPLE_ALLOCATION);
            prev = v;
        }
    }

    #[test]
    fn test_network_time_zero_power() {
        assert_eq!(network_time(0.0), 0.0);
    }

    #[test]
    fn test_network_time_monotone() {
        let a = network_time(1e18);
        let b = network_time(2e18);
        assert!(b > a);
    }

    #[test]
    fn test_vesting_monotone_and_complete() {
        let total: f64 = VEST_TRANCHES.iter().map(|t| t.0).sum();
        assert!(total_vested(0.0) > 0.0);
        assert!(total_vested(100.0) < total);
        assert!((total_vested(10_000.0) - total).abs() < 1e-6);
        let mut prev = 0.0;
        for d in 0..3000 {
            let v = total_vested(d as f64);
            assert!(v >= prev);
            prev = v;
        }
    }
}
