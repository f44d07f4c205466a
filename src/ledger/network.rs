//! The network-wide ledger: one [`DaySlice`] per calendar day.
//!
//! The ledger starts at the network-data epoch and extends past the
//! simulation end by the maximum sector duration, so every deferred pledge
//! release and scheduled expiration the simulation can generate lands on a
//! real row.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::{network_start, EIB};
use crate::curves;
use crate::error::LedgerError;

/// One day of network-level economic state.
///
/// Daily power fields are in PiB, cumulative power totals in EiB, and the
/// baseline/capped power fields in bytes, matching the units the minting
/// curves are defined over. Token fields are in whole tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaySlice {
    pub date: NaiveDate,
    /// Days elapsed since network launch; the minting curves' time axis.
    pub days_since_launch: f64,

    // Per-day power lifecycle totals, aggregated across agents.
    pub day_onboarded_rbp_pib: f64,
    pub day_onboarded_qap_pib: f64,
    pub day_renewed_rbp_pib: f64,
    pub day_renewed_qap_pib: f64,
    pub day_sched_expire_rbp_pib: f64,
    pub day_sched_expire_qap_pib: f64,
    pub day_terminated_rbp_pib: f64,
    pub day_terminated_qap_pib: f64,
    /// Net daily change: onboarded + renewed - expired - terminated.
    pub day_network_rbp_pib: f64,
    pub day_network_qap_pib: f64,

    // Cumulative power totals, clamped to a strictly-positive floor.
    pub total_raw_power_eib: f64,
    pub total_qa_power_eib: f64,

    // Minting chain.
    pub network_baseline: f64,
    pub capped_power: f64,
    pub cum_capped_power: f64,
    pub network_time: f64,
    pub cum_baseline_reward: f64,
    pub cum_simple_reward: f64,
    pub cum_network_reward: f64,
    pub day_network_reward: f64,
    pub day_simple_reward: f64,

    // Collateral.
    pub scheduled_pledge_release: f64,
    pub day_locked_pledge: f64,
    pub day_renewed_pledge: f64,
    pub network_locked_pledge: f64,
    pub network_locked_reward: f64,
    pub network_locked: f64,
    pub renewal_rate: f64,
    /// Diagnostic: pledge carried forward by renewals this day.
    pub original_pledge: f64,
    /// Diagnostic: net change in locked pledge this day.
    pub pledge_delta: f64,
    /// Diagnostic: net change in locked reward collateral this day.
    pub reward_delta: f64,

    // Supply.
    pub circ_supply: f64,
    pub network_gas_burn: f64,
    pub total_vest: f64,
    pub burn_from_terminations: f64,

    // Derived per-unit quantities, updated from simulation start onward.
    pub day_pledge_per_qap: f64,
    pub day_rewards_per_sector: f64,
    pub discount_rate_pct: f64,
}

/// Append-only sequence of [`DaySlice`] rows indexed by day offset from
/// the network-data epoch.
#[derive(Debug, Clone)]
pub struct NetworkLedger {
    epoch: NaiveDate,
    slices: Vec<DaySlice>,
}

impl NetworkLedger {
    /// Build a ledger spanning `epoch ..= sim_end + horizon_extra_days`,
    /// with the input-independent columns (baseline power, simple-minting
    /// reward, vesting trajectory) precomputed for every row.
    pub fn new(epoch: NaiveDate, sim_end: NaiveDate, horizon_extra_days: usize) -> Self {
        let sim_days = (sim_end - epoch).num_days().max(0) as usize;
        let len = sim_days + horizon_extra_days;
        let launch_offset = (epoch - network_start()).num_days() as f64;

        let slices = (0..len)
            .map(|i| {
                let days = launch_offset + i as f64;
                DaySlice {
                    date: epoch + chrono::Duration::days(i as i64),
                    days_since_launch: days,
                    network_baseline: curves::baseline_power(days),
                    cum_simple_reward: curves::cum_simple_minting(days),
                    total_vest: curves::total_vested(days),
                    ..DaySlice::default()
                }
            })
            .collect();

        Self { epoch, slices }
    }

    pub fn epoch(&self) -> NaiveDate {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Last date the ledger has a row for.
    pub fn horizon_end(&self) -> NaiveDate {
        self.epoch + chrono::Duration::days(self.slices.len() as i64 - 1)
    }

    /// O(1) date-to-index translation. Out-of-horizon dates are a sizing
    /// bug and fail loudly.
    pub fn index(&self, date: NaiveDate) -> Result<usize, LedgerError> {
        let offset = (date - self.epoch).num_days();
        if offset < 0 {
            return Err(LedgerError::BeforeEpoch {
                date,
                epoch: self.epoch,
            });
        }
        let idx = offset as usize;
        if idx >= self.slices.len() {
            return Err(LedgerError::BeyondHorizon {
                date,
                horizon_end: self.horizon_end(),
            });
        }
        Ok(idx)
    }

    pub fn date_at(&self, idx: usize) -> NaiveDate {
        self.epoch + chrono::Duration::days(idx as i64)
    }

    pub fn slice(&self, idx: usize) -> &DaySlice {
        &self.slices[idx]
    }

    pub fn slice_mut(&mut self, idx: usize) -> &mut DaySlice {
        &mut self.slices[idx]
    }

    pub fn slices(&self) -> &[DaySlice] {
        &self.slices
    }

    /// Total quality-adjusted power at `idx` in bytes.
    pub fn total_qa_bytes(&self, idx: usize) -> f64 {
        self.slices[idx].total_qa_power_eib * EIB
    }

    /// Total raw power at `idx` in bytes.
    pub fn total_raw_bytes(&self, idx: usize) -> f64 {
        self.slices[idx].total_raw_power_eib * EIB
    }
}
