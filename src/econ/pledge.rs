//! Pledge (collateral) accounting.
//!
//! Pure numeric functions over already-validated ledger state: none of
//! these fail. The pledge for newly committed power has two parts, a
//! storage pledge (20 days of the power's expected reward) and a
//! consensus pledge (a share of circulating supply proportional to the
//! onboarding ratio). The onboarding ratio itself is pluggable.

use crate::constants::MIN_VALUE;

/// Days of expected reward locked as storage pledge.
const STORAGE_PLEDGE_DAYS: f64 = 20.0;

/// Pluggable onboarding-ratio hook for the consensus-pledge term.
pub trait OnboardRatio: Send + Sync {
    /// All power arguments are in bytes.
    fn ratio(&self, added_qa: f64, total_qa: f64, baseline: f64) -> f64;
}

/// The protocol-default ratio: `added / max(total, baseline)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOnboardRatio;

impl OnboardRatio for DefaultOnboardRatio {
    fn ratio(&self, added_qa: f64, total_qa: f64, baseline: f64) -> f64 {
        added_qa / total_qa.max(baseline).max(MIN_VALUE)
    }
}

/// Computes collateral requirements and daily locked-pledge deltas.
pub struct PledgeAccountant {
    lock_target: f64,
    ratio: Box<dyn OnboardRatio>,
}

impl PledgeAccountant {
    pub fn new(lock_target: f64, ratio: Box<dyn OnboardRatio>) -> Self {
        Self { lock_target, ratio }
    }

    pub fn lock_target(&self) -> f64 {
        self.lock_target
    }

    /// Pledge required to commit `added_qa` bytes of quality-adjusted
    /// power, given yesterday's reward and circulating supply.
    pub fn required_pledge(
        &self,
        day_network_reward: f64,
        prev_circ_supply: f64,
        added_qa: f64,
        total_qa: f64,
        baseline: f64,
    ) -> f64 {
        self.required_pledge_with_ratio(
            self.ratio.as_ref(),
            day_network_reward,
            prev_circ_supply,
            added_qa,
            total_qa,
            baseline,
        )
    }

    /// Same as [`required_pledge`](Self::required_pledge) with a one-off
    /// onboarding ratio instead of the configured one.
    pub fn required_pledge_with_ratio(
        &self,
        ratio: &dyn OnboardRatio,
        day_network_reward: f64,
        prev_circ_supply: f64,
        added_qa: f64,
        total_qa: f64,
        baseline: f64,
    ) -> f64 {
        let storage_pledge =
            STORAGE_PLEDGE_DAYS * day_network_reward * (added_qa / total_qa.max(MIN_VALUE));
        let normalized_growth = ratio.ratio(added_qa, total_qa, baseline);
        let consensus_pledge = (self.lock_target * prev_circ_supply * normalized_growth).max(0.0);
        storage_pledge + consensus_pledge
    }

    /// Net daily change in one agent's locked pledge: pledge locked for
    /// onboarding, plus pledge locked for renewals, minus the pledge
    /// scheduled to release today.
    ///
    /// Renewal locking is clamped from below: a renewal never locks less
    /// than the original pledge scaled by the realized renewal ratio.
    #[allow(clippy::too_many_arguments)]
    pub fn day_delta_pledge(
        &self,
        day_network_reward: f64,
        prev_circ_supply: f64,
        onboarded_qa: f64,
        renewed_qa: f64,
        total_qa: f64,
        baseline: f64,
        renewal_ratio: f64,
        scheduled_pledge_release: f64,
    ) -> f64 {
        let onboards_locked = self.required_pledge(
            day_network_reward,
            prev_circ_supply,
            onboarded_qa,
            total_qa,
            baseline,
        );
        let renews_locked = self.renewal_locked_pledge(
            day_network_reward,
            prev_circ_supply,
            renewed_qa,
            total_qa,
            baseline,
            renewal_ratio,
            scheduled_pledge_release,
        );
        onboards_locked + renews_locked - scheduled_pledge_release
    }

    /// Pledge locked for today's renewals, clamped so renewal never
    /// releases more than the non-renewed portion of the original pledge.
    #[allow(clippy::too_many_arguments)]
    pub fn renewal_locked_pledge(
        &self,
        day_network_reward: f64,
        prev_circ_supply: f64,
        renewed_qa: f64,
        total_qa: f64,
        baseline: f64,
        renewal_ratio: f64,
        scheduled_pledge_release: f64,
    ) -> f64 {
        let fresh = self.required_pledge(
            day_network_reward,
            prev_circ_supply,
            renewed_qa,
            total_qa,
            baseline,
        );
        let original = renewal_ratio * scheduled_pledge_release;
        original.max(fresh)
    }
}

/// Realized renewal ratio for one agent on one day, in [0, 1].
///
/// Rules: 1.0 if nothing was scheduled to expire but renewal occurred
/// anyway (deal-power edge case); 0.0 if the scheduled expiration is
/// negative or nothing renewed; otherwise renewed / scheduled, clamped.
pub fn renewal_ratio(renewed_qa: f64, sched_expire_qa: f64) -> f64 {
    if sched_expire_qa == 0.0 && renewed_qa > 0.0 {
        1.0
    } else if sched_expire_qa < 0.0 || renewed_qa == 0.0 {
        0.0
    } else {
        (renewed_qa / sched_expire_qa).clamp(0.0, 1.0)
    }
}

/// Reward collateral locked today.
pub fn day_locked_rewards(day_network_reward: f64) -> f64 {
    crate::constants::REWARD_LOCK_FRACTION * day_network_reward
}

/// Reward collateral released today from the aggregate locked balance.
pub fn day_reward_release(prev_network_locked_reward: f64) -> f64 {
    prev_network_locked_reward / crate::constants::REWARD_VEST_DAYS as f64
}

/// Daily lock/release pair for reward collateral.
pub fn locked_block_rewards_delta(
    day_network_reward: f64,
    prev_network_locked_reward: f64,
) -> (f64, f64) {
    (
        day_locked_rewards(day_network_reward),
        day_reward_release(prev_network_locked_reward),
    )
}
