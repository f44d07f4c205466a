//! Network-wide constants: storage units, epoch dates, and economic
//! parameters shared across the simulation engine.

use chrono::NaiveDate;

/// Bytes in an exbibyte.
pub const EIB: f64 = (1u64 << 60) as f64;
/// Bytes in a pebibyte.
pub const PIB: f64 = (1u64 << 50) as f64;
/// Bytes in a gibibyte.
pub const GIB: f64 = (1u64 << 30) as f64;

/// Size of a single storage sector in bytes (32 GiB).
pub const SECTOR_SIZE: f64 = 32.0 * GIB;

/// Strictly-positive floor applied to power totals and denominators so
/// downstream ratios stay well-defined near zero.
pub const MIN_VALUE: f64 = 1e-6;

/// Quality multiplier applied to capacity power carrying verified deals.
pub const FIL_PLUS_MULTIPLIER: f64 = 10.0;

/// Longest sector commitment the protocol accepts, in days. The ledger
/// horizon extends this far past the simulation end date so that every
/// deferred pledge release and scheduled expiration lands on a real row.
pub const MAX_SECTOR_DURATION_DAYS: usize = 1278;

/// Fraction of circulating supply targeted by the consensus-pledge term.
pub const DEFAULT_LOCK_TARGET: f64 = 0.3;

/// Default cap on network-wide daily raw-power onboarding, in PiB.
pub const DEFAULT_MAX_DAY_ONBOARD_RBP_PIB: f64 = 25.0;

/// Minimum number of sectors an agent can onboard in one day.
pub const MIN_SECTORS_ONBOARD: f64 = 1.0;

/// Share of the daily network reward locked as reward collateral.
pub const REWARD_LOCK_FRACTION: f64 = 0.75;

/// Days over which locked reward collateral linearly releases.
pub const REWARD_VEST_DAYS: usize = 180;

/// Fraction of an agent's daily reward credited immediately; the rest
/// vests over [`REWARD_VEST_DAYS`].
pub const REWARD_IMMEDIATE_FRACTION: f64 = 0.25;

/// Tokens held in the mining reserve, disbursed at genesis and constant
/// across the simulation (attoFIL value `17066618961773411890063046`).
pub const DISBURSED_RESERVE: f64 = 17_066_618.961_773_412;

/// Date the network launched. Minting curves index days from here.
pub fn network_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 10, 15).expect("valid constant date")
}

/// First date for which per-day network statistics exist. The ledger
/// epoch: day index 0 of every time-indexed table.
pub fn network_data_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 3, 15).expect("valid constant date")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_are_powers_of_two() {
        assert_eq!(EIB, 2f64.powi(60));
        assert_eq!(PIB, 2f64.powi(50));
        assert_eq!(SECTOR_SIZE, 32.0 * 2f64.powi(30));
    }

    #[test]
    fn test_epoch_ordering() {
        assert!(network_start() < network_data_start());
    }
}
