//! Decision policies: the strategy half of an agent.
//!
//! A policy is a pure function from the observable network state to a
//! day's power decision. Policies never touch ledgers; the lifecycle
//! records whatever they request, subject to throughput clamps.

use chrono::NaiveDate;

use crate::config::PolicyConfig;
use crate::constants::{FIL_PLUS_MULTIPLIER, PIB, SECTOR_SIZE};
use crate::econ::PledgeAccountant;
use crate::error::ScenarioError;
use crate::forecast::{quantile_for_optimism, DiscountRate, Quantile, RewardForecast};
use crate::ledger::{DaySlice, NetworkLedger, PowerPair};

/// Candidate commitment durations evaluated by the ROI policies.
const DURATION_CANDIDATES: [usize; 3] = [180, 360, 540];

/// A requested power commitment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerRequest {
    pub power: PowerPair,
    pub duration_days: usize,
}

/// One agent's decision for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayDecision {
    pub onboard: Option<PowerRequest>,
    pub renew: Option<PowerRequest>,
}

/// Read-only view of the network that policies decide against. All
/// derived state is yesterday's: today's totals do not exist until every
/// agent has decided.
pub struct NetworkView<'a> {
    pub idx: usize,
    pub date: NaiveDate,
    pub net: &'a NetworkLedger,
    pub forecast: &'a RewardForecast,
    pub discount: &'a DiscountRate,
    pub pledge: &'a PledgeAccountant,
}

impl NetworkView<'_> {
    /// Yesterday's finalized slice. The bootstrap guarantees at least one
    /// finalized day before the first decision.
    pub fn prev(&self) -> &DaySlice {
        self.net.slice(self.idx.saturating_sub(1))
    }

    /// Estimated pledge to commit `qa_pib` PiB of quality-adjusted power
    /// today, priced from yesterday's reward and supply.
    pub fn estimate_pledge_for_qa_power(&self, qa_pib: f64) -> f64 {
        let prev = self.prev();
        self.pledge.required_pledge(
            prev.day_network_reward,
            prev.circ_supply,
            qa_pib * PIB,
            self.net.total_qa_bytes(self.idx.saturating_sub(1)),
            prev.network_baseline,
        )
    }

    /// Estimated pledge for a single quality-adjusted sector.
    pub fn pledge_per_sector(&self) -> f64 {
        self.estimate_pledge_for_qa_power(SECTOR_SIZE / PIB)
    }

    /// Forecast cumulative reward for one sector held `duration_days`.
    pub fn sector_reward_over(&self, quantile: Quantile, duration_days: usize) -> f64 {
        self.forecast
            .cumulative_estimate(quantile, self.idx, duration_days)
    }

    /// Best annualized net ROI across the candidate durations, with the
    /// duration that achieves it. Borrowing cost for the pledge is
    /// deducted at the current discount rate.
    pub fn best_sector_roi(&self, quantile: Quantile) -> (f64, usize) {
        let pledge = self.pledge_per_sector();
        if pledge <= 0.0 {
            // No meaningful capital requirement; any reward clears.
            return (f64::INFINITY, DURATION_CANDIDATES[1]);
        }
        let mut best = (f64::NEG_INFINITY, DURATION_CANDIDATES[0]);
        for duration in DURATION_CANDIDATES {
            let rewards = self.sector_reward_over(quantile, duration);
            let years = duration as f64 / 365.0;
            let interest = self.discount.repayment_amount(pledge, years) - pledge;
            let roi = (rewards - interest) / pledge;
            let annualized = if roi > -1.0 {
                (1.0 + roi).powf(1.0 / years) - 1.0
            } else {
                -1.0
            };
            if annualized > best.0 {
                best = (annualized, duration);
            }
        }
        best
    }
}

/// The slice of an agent's own state a policy may see.
#[derive(Debug, Clone, Copy)]
pub struct AgentView {
    /// Power scheduled to expire today, already adjusted for the
    /// scenario's renewal setting.
    pub expiring: PowerPair,
    /// This agent's daily sealing-throughput cap in PiB.
    pub max_onboard_pib: f64,
}

/// Strategy interface. Implementations are stateless between days; all
/// persistence lives in the ledgers.
pub trait DecisionPolicy: Send + Sync {
    fn decide(&self, net: &NetworkView<'_>, agent: &AgentView) -> DayDecision;
}

/// Quality-adjusted power for `raw_pib` of raw power onboarded with the
/// given verified-deal share.
pub fn qa_from_raw(raw_pib: f64, fil_plus_rate: f64) -> f64 {
    raw_pib * (1.0 - fil_plus_rate) + raw_pib * fil_plus_rate * FIL_PLUS_MULTIPLIER
}

fn onboard_request(raw_pib: f64, fil_plus_rate: f64, duration_days: usize) -> Option<PowerRequest> {
    if raw_pib <= 0.0 {
        return None;
    }
    Some(PowerRequest {
        power: PowerPair::new(raw_pib, qa_from_raw(raw_pib, fil_plus_rate)),
        duration_days,
    })
}

fn renew_request(
    expiring: PowerPair,
    renewal_rate: f64,
    duration_days: usize,
) -> Option<PowerRequest> {
    let power = expiring.scaled(renewal_rate);
    if power.is_zero() {
        return None;
    }
    Some(PowerRequest {
        power,
        duration_days,
    })
}

/// Onboard a fixed amount every day and renew a fixed share of
/// expirations, regardless of market conditions.
pub struct FixedOnboardPolicy {
    pub max_daily_rb_onboard_pib: f64,
    pub renewal_rate: f64,
    pub fil_plus_rate: f64,
    pub sector_duration_days: usize,
}

impl DecisionPolicy for FixedOnboardPolicy {
    fn decide(&self, _net: &NetworkView<'_>, agent: &AgentView) -> DayDecision {
        let raw = self.max_daily_rb_onboard_pib.min(agent.max_onboard_pib);
        DayDecision {
            onboard: onboard_request(raw, self.fil_plus_rate, self.sector_duration_days),
            renew: renew_request(agent.expiring, self.renewal_rate, self.sector_duration_days),
        }
    }
}

/// All-or-nothing: commit the maximum when the forecast ROI clears the
/// threshold, sit out otherwise.
pub struct RoiThresholdPolicy {
    pub max_daily_rb_onboard_pib: f64,
    pub renewal_rate: f64,
    pub fil_plus_rate: f64,
    pub quantile: Quantile,
    pub roi_threshold: f64,
}

impl DecisionPolicy for RoiThresholdPolicy {
    fn decide(&self, net: &NetworkView<'_>, agent: &AgentView) -> DayDecision {
        let (roi, duration) = net.best_sector_roi(self.quantile);
        if roi < self.roi_threshold {
            return DayDecision::default();
        }
        let raw = self.max_daily_rb_onboard_pib.min(agent.max_onboard_pib);
        DayDecision {
            onboard: onboard_request(raw, self.fil_plus_rate, duration),
            renew: renew_request(agent.expiring, self.renewal_rate, duration),
        }
    }
}

/// Ramp onboarding and renewal linearly with the forecast ROI between
/// two bounds.
pub struct RoiRampPolicy {
    pub min_daily_rb_onboard_pib: f64,
    pub max_daily_rb_onboard_pib: f64,
    pub min_renewal_rate: f64,
    pub max_renewal_rate: f64,
    pub fil_plus_rate: f64,
    pub quantile: Quantile,
    pub min_roi: f64,
    pub max_roi: f64,
}

fn lerp(lo: f64, hi: f64, t: f64) -> f64 {
    lo + (hi - lo) * t
}

impl RoiRampPolicy {
    fn ramp_position(&self, roi: f64) -> f64 {
        let span = self.max_roi - self.min_roi;
        if span <= 0.0 {
            return if roi >= self.max_roi { 1.0 } else { 0.0 };
        }
        ((roi - self.min_roi) / span).clamp(0.0, 1.0)
    }
}

impl DecisionPolicy for RoiRampPolicy {
    fn decide(&self, net: &NetworkView<'_>, agent: &AgentView) -> DayDecision {
        let (roi, duration) = net.best_sector_roi(self.quantile);
        let t = self.ramp_position(roi);
        let raw = lerp(self.min_daily_rb_onboard_pib, self.max_daily_rb_onboard_pib, t)
            .min(agent.max_onboard_pib);
        let renewal_rate = lerp(self.min_renewal_rate, self.max_renewal_rate, t);
        DayDecision {
            onboard: onboard_request(raw, self.fil_plus_rate, duration),
            renew: renew_request(agent.expiring, renewal_rate, duration),
        }
    }
}

/// Instantiate the policy described by a scenario entry.
pub fn build_policy(config: &PolicyConfig) -> Result<Box<dyn DecisionPolicy>, ScenarioError> {
    match *config {
        PolicyConfig::FixedOnboard {
            max_daily_rb_onboard_pib,
            renewal_rate,
            fil_plus_rate,
            sector_duration_days,
        } => Ok(Box::new(FixedOnboardPolicy {
            max_daily_rb_onboard_pib,
            renewal_rate,
            fil_plus_rate,
            sector_duration_days,
        })),
        PolicyConfig::RoiThreshold {
            max_daily_rb_onboard_pib,
            renewal_rate,
            fil_plus_rate,
            agent_optimism,
            roi_threshold,
        } => Ok(Box::new(RoiThresholdPolicy {
            max_daily_rb_onboard_pib,
            renewal_rate,
            fil_plus_rate,
            quantile: quantile_for_optimism(agent_optimism)?,
            roi_threshold,
        })),
        PolicyConfig::RoiRamp {
            min_daily_rb_onboard_pib,
            max_daily_rb_onboard_pib,
            min_renewal_rate,
            max_renewal_rate,
            fil_plus_rate,
            agent_optimism,
            min_roi,
            max_roi,
        } => Ok(Box::new(RoiRampPolicy {
            min_daily_rb_onboard_pib,
            max_daily_rb_onboard_pib,
            min_renewal_rate,
            max_renewal_rate,
            fil_plus_rate,
            quantile: quantile_for_optimism(agent_optimism)?,
            min_roi,
            max_roi,
        })),
    }
}
