//! Circulating-supply derivation.
//!
//! `circ_supply = disbursed_reserve + cum_network_reward + total_vest
//!              - network_locked - network_gas_burn - termination_burn`,
//! floored at zero. Locked collateral splits into the pledge component
//! and the block-reward component, and the identity
//! `network_locked = network_locked_pledge + network_locked_reward` holds
//! on every row.

use crate::constants::DISBURSED_RESERVE;
use crate::ledger::NetworkLedger;

/// Gas-burn accounting mode, fixed at model construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasBurnMode {
    /// Replay the historical burn series where available, then extend it
    /// with the constant daily average.
    Historical,
    /// Always increment by the constant daily average.
    ConstantAverage,
}

/// Derives circulating supply and the locked-collateral totals each day.
pub struct SupplyAggregator {
    mode: GasBurnMode,
    /// Average daily gas burn, derived from the supply snapshots.
    daily_burn: f64,
}

impl SupplyAggregator {
    pub fn new(mode: GasBurnMode, daily_burn: f64) -> Self {
        Self { mode, daily_burn }
    }

    pub fn mode(&self) -> GasBurnMode {
        self.mode
    }

    /// Update row `idx` from the day's pledge and reward-collateral
    /// deltas. `day_locked_pledge` / `day_renewed_pledge` are the gross
    /// per-day lock totals recorded for diagnostics.
    pub fn step(
        &self,
        net: &mut NetworkLedger,
        idx: usize,
        pledge_delta: f64,
        reward_delta: f64,
        day_locked_pledge: f64,
        day_renewed_pledge: f64,
    ) {
        let (prev_locked_pledge, prev_locked_reward, prev_locked, prev_gas) = if idx == 0 {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let prev = net.slice(idx - 1);
            (
                prev.network_locked_pledge,
                prev.network_locked_reward,
                prev.network_locked,
                prev.network_gas_burn,
            )
        };

        let slice = net.slice_mut(idx);
        slice.pledge_delta = pledge_delta;
        slice.reward_delta = reward_delta;
        slice.day_locked_pledge = day_locked_pledge;
        slice.day_renewed_pledge = day_renewed_pledge;
        slice.network_locked_pledge = prev_locked_pledge + pledge_delta;
        slice.network_locked_reward = prev_locked_reward + reward_delta;
        slice.network_locked = prev_locked + pledge_delta + reward_delta;

        // A zero row is one the historical series did not cover; extend
        // with the constant average regardless of mode.
        if slice.network_gas_burn == 0.0 {
            slice.network_gas_burn = prev_gas + self.daily_burn;
        }

        let circ = DISBURSED_RESERVE
            + slice.cum_network_reward
            + slice.total_vest
            - slice.network_locked
            - slice.network_gas_burn
            - slice.burn_from_terminations;
        slice.circ_supply = circ.max(0.0);
    }
}
