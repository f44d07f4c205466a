//! Scenario configuration: YAML structures, validation, and the default
//! geometric power-share distribution.
//!
//! All validation happens before the first simulation step; a scenario
//! that passes [`Scenario::validate`] cannot fail construction later.

use std::path::Path;

use chrono::NaiveDate;
use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{
    network_data_start, DEFAULT_LOCK_TARGET, DEFAULT_MAX_DAY_ONBOARD_RBP_PIB, MIN_SECTORS_ONBOARD,
    PIB, SECTOR_SIZE,
};
use crate::error::ScenarioError;

/// How renewals treat the two power classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalsSetting {
    /// Renew both capacity and quality-adjusted power. As deal sectors
    /// expire, equivalent deals keep arriving, so expiring QA power is
    /// effectively renewed too.
    #[default]
    Optimistic,
    /// Renew only the capacity-class share of expiring power.
    ///
    /// Known caveat: the capacity class still mixes in deal sectors
    /// without their multiplier, so this variant is less conservative
    /// than renewing true capacity-only sectors would be.
    Conservative,
}

/// Decision-policy configuration, one per agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyConfig {
    /// Onboard a fixed amount of power every day and renew a fixed share
    /// of expirations (dollar-cost averaging).
    FixedOnboard {
        #[serde(default = "default_daily_onboard")]
        max_daily_rb_onboard_pib: f64,
        #[serde(default = "default_renewal_rate")]
        renewal_rate: f64,
        #[serde(default = "default_fil_plus_rate")]
        fil_plus_rate: f64,
        #[serde(default = "default_sector_duration")]
        sector_duration_days: usize,
    },
    /// Onboard the maximum when the forecast annualized ROI over the best
    /// candidate sector duration clears a threshold, otherwise nothing.
    RoiThreshold {
        #[serde(default = "default_daily_onboard")]
        max_daily_rb_onboard_pib: f64,
        #[serde(default = "default_renewal_rate")]
        renewal_rate: f64,
        #[serde(default = "default_fil_plus_rate")]
        fil_plus_rate: f64,
        #[serde(default = "default_optimism")]
        agent_optimism: u8,
        #[serde(default = "default_roi_threshold")]
        roi_threshold: f64,
    },
    /// Ramp onboarding and renewal linearly between configured bounds as
    /// the forecast ROI moves between `min_roi` and `max_roi`.
    RoiRamp {
        #[serde(default = "default_daily_onboard")]
        min_daily_rb_onboard_pib: f64,
        #[serde(default = "default_ramp_max_onboard")]
        max_daily_rb_onboard_pib: f64,
        #[serde(default = "default_min_renewal_rate")]
        min_renewal_rate: f64,
        #[serde(default = "default_max_renewal_rate")]
        max_renewal_rate: f64,
        #[serde(default = "default_fil_plus_rate")]
        fil_plus_rate: f64,
        #[serde(default = "default_optimism")]
        agent_optimism: u8,
        #[serde(default = "default_roi_threshold")]
        min_roi: f64,
        #[serde(default = "default_max_roi")]
        max_roi: f64,
    },
}

fn default_daily_onboard() -> f64 {
    3.0
}
fn default_ramp_max_onboard() -> f64 {
    12.0
}
fn default_renewal_rate() -> f64 {
    0.6
}
fn default_min_renewal_rate() -> f64 {
    0.3
}
fn default_max_renewal_rate() -> f64 {
    0.8
}
fn default_fil_plus_rate() -> f64 {
    0.6
}
fn default_sector_duration() -> usize {
    360
}
fn default_optimism() -> u8 {
    4
}
fn default_roi_threshold() -> f64 {
    0.1
}
fn default_max_roi() -> f64 {
    0.3
}

impl PolicyConfig {
    fn optimism(&self) -> Option<u8> {
        match self {
            PolicyConfig::FixedOnboard { .. } => None,
            PolicyConfig::RoiThreshold { agent_optimism, .. }
            | PolicyConfig::RoiRamp { agent_optimism, .. } => Some(*agent_optimism),
        }
    }
}

/// One agent: its decision policy and optional explicit power share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub policy: PolicyConfig,
    /// Share of historical network power seeded to this agent. Either
    /// every agent declares one (summing to 1) or none does, in which
    /// case shares follow a geometric series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_share: Option<f64>,
}

/// A complete simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_lock_target")]
    pub lock_target: f64,
    #[serde(default = "default_max_onboard")]
    pub max_day_onboard_rbp_pib: f64,
    #[serde(default = "default_true")]
    pub use_historical_gas: bool,
    #[serde(default)]
    pub renewals_setting: RenewalsSetting,
    #[serde(default = "default_seed")]
    pub random_seed: u64,
    #[serde(default = "default_discount_rate")]
    pub discount_rate_pct: f64,
    pub agents: Vec<AgentConfig>,
}

fn default_lock_target() -> f64 {
    DEFAULT_LOCK_TARGET
}
fn default_max_onboard() -> f64 {
    DEFAULT_MAX_DAY_ONBOARD_RBP_PIB
}
fn default_true() -> bool {
    true
}
fn default_seed() -> u64 {
    1234
}
fn default_discount_rate() -> f64 {
    25.0
}

impl Scenario {
    /// Validate the scenario. Every failure here is fatal and precedes
    /// any simulation state being built.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.agents.is_empty() {
            return Err(ScenarioError::NoAgents);
        }
        let epoch = network_data_start();
        if self.start_date < epoch {
            return Err(ScenarioError::StartBeforeEpoch {
                start: self.start_date,
                epoch,
            });
        }
        if self.end_date <= self.start_date {
            return Err(ScenarioError::EndBeforeStart {
                start: self.start_date,
                end: self.end_date,
            });
        }

        // Every agent must be able to onboard at least one sector a day
        // under the network-wide cap.
        let min_per_agent = MIN_SECTORS_ONBOARD * SECTOR_SIZE / PIB;
        if self.agents.len() as f64 * min_per_agent > self.max_day_onboard_rbp_pib {
            return Err(ScenarioError::OnboardCapTooSmall {
                max_pib: self.max_day_onboard_rbp_pib,
                agents: self.agents.len(),
                min_pib: min_per_agent,
            });
        }

        for agent in &self.agents {
            if let Some(level) = agent.policy.optimism() {
                if !(1..=5).contains(&level) {
                    return Err(ScenarioError::InvalidOptimism { level });
                }
            }
        }

        // Resolving shares performs the sum-to-one check.
        self.power_shares()?;
        Ok(())
    }

    /// Resolve each agent's power share: explicit shares when configured,
    /// otherwise the default geometric-series distribution.
    pub fn power_shares(&self) -> Result<Vec<f64>, ScenarioError> {
        let explicit: Vec<f64> = self.agents.iter().filter_map(|a| a.power_share).collect();
        if explicit.is_empty() {
            return geometric_power_shares(self.agents.len(), 0.2);
        }
        if explicit.len() != self.agents.len() {
            return Err(ScenarioError::AgentCountMismatch {
                expected: self.agents.len(),
                actual: explicit.len(),
            });
        }
        let sum: f64 = explicit.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ScenarioError::PowerSharesNotNormalized { sum });
        }
        Ok(explicit)
    }

    /// Per-agent daily sealing-throughput cap in PiB.
    pub fn max_onboard_per_agent_pib(&self) -> f64 {
        self.max_day_onboard_rbp_pib / self.agents.len() as f64
    }

    pub fn sim_len_days(&self) -> usize {
        (self.end_date - self.start_date).num_days() as usize
    }
}

/// Load and validate a scenario from a YAML file.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read scenario '{}'", path.display()))?;
    let scenario: Scenario = serde_yaml::from_str(&content)
        .wrap_err_with(|| format!("Failed to parse scenario '{}'", path.display()))?;
    scenario.validate().wrap_err("Scenario failed validation")?;
    Ok(scenario)
}

/// Geometric-series power distribution: agent `i` receives `a * r^i`,
/// with `r` chosen so the shares sum to 1.
pub fn geometric_power_shares(num_agents: usize, a: f64) -> Result<Vec<f64>, ScenarioError> {
    if num_agents == 1 {
        return Ok(vec![1.0]);
    }
    let r = solve_geometric_ratio(a, num_agents)?;
    let mut shares: Vec<f64> = (0..num_agents).map(|i| a * r.powi(i as i32)).collect();
    // The solver leaves a residual; renormalize so downstream equality
    // checks against 1 hold exactly.
    let sum: f64 = shares.iter().sum();
    for share in &mut shares {
        *share /= sum;
    }
    Ok(shares)
}

/// Sum of the geometric series `a * (r^n - 1) / (r - 1)`, with the
/// removable singularity at r = 1 handled explicitly.
fn geometric_sum(a: f64, r: f64, n: usize) -> f64 {
    if (r - 1.0).abs() < 1e-12 {
        a * n as f64
    } else {
        a * (r.powi(n as i32) - 1.0) / (r - 1.0)
    }
}

/// Bisection for the ratio that makes the series sum to 1. The sum is
/// strictly increasing in r for a > 0, so the bracket is unambiguous.
fn solve_geometric_ratio(a: f64, n: usize) -> Result<f64, ScenarioError> {
    // When n equal shares of `a` already sum to 1 the root sits on the
    // removable singularity at r = 1, where bisection loses precision to
    // cancellation. Short-circuit to the exact answer.
    if (a * n as f64 - 1.0).abs() < 1e-9 {
        return Ok(1.0);
    }
    let f = |r: f64| geometric_sum(a, r, n) - 1.0;
    let (mut lo, mut hi) = (1e-9, 1.0);
    if f(hi) < 0.0 {
        // First share too small for a decaying series; the ratio exceeds 1.
        lo = 1.0;
        hi = 2.0;
        while f(hi) < 0.0 {
            hi *= 2.0;
            if hi > 1e6 {
                return Err(ScenarioError::PowerDistributionDiverged { agents: n });
            }
        }
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if f(mid) < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let r = 0.5 * (lo + hi);
    if f(r).abs() > 1e-9 {
        return Err(ScenarioError::PowerDistributionDiverged { agents: n });
    }
    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_scenario(agents: Vec<AgentConfig>) -> Scenario {
        Scenario {
            start_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            lock_target: DEFAULT_LOCK_TARGET,
            max_day_onboard_rbp_pib: DEFAULT_MAX_DAY_ONBOARD_RBP_PIB,
            use_historical_gas: true,
            renewals_setting: RenewalsSetting::Optimistic,
            random_seed: 1234,
            discount_rate_pct: 25.0,
            agents,
        }
    }

    fn fixed_agent(share: Option<f64>) -> AgentConfig {
        AgentConfig {
            policy: PolicyConfig::FixedOnboard {
                max_daily_rb_onboard_pib: 3.0,
                renewal_rate: 0.6,
                fil_plus_rate: 0.6,
                sector_duration_days: 360,
            },
            power_share: share,
        }
    }

    #[test]
    fn test_valid_scenario() {
        let s = base_scenario(vec![fixed_agent(Some(0.7)), fixed_agent(Some(0.3))]);
        s.validate().unwrap();
        assert_eq!(s.power_shares().unwrap(), vec![0.7, 0.3]);
    }

    #[test]
    fn test_shares_must_sum_to_one() {
        let s = base_scenario(vec![fixed_agent(Some(0.7)), fixed_agent(Some(0.2))]);
        assert!(matches!(
            s.validate(),
            Err(ScenarioError::PowerSharesNotNormalized { .. })
        ));
    }

    #[test]
    fn test_partial_shares_rejected() {
        let s = base_scenario(vec![fixed_agent(Some(0.7)), fixed_agent(None)]);
        assert!(matches!(
            s.validate(),
            Err(ScenarioError::AgentCountMismatch { .. })
        ));
    }

    #[test]
    fn test_start_before_epoch_rejected() {
        let mut s = base_scenario(vec![fixed_agent(None)]);
        s.start_date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(matches!(
            s.validate(),
            Err(ScenarioError::StartBeforeEpoch { .. })
        ));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let mut s = base_scenario(vec![fixed_agent(None)]);
        s.end_date = s.start_date;
        assert!(matches!(
            s.validate(),
            Err(ScenarioError::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn test_geometric_shares_sum_to_one() {
        for n in [2usize, 3, 5, 10, 25] {
            let shares = geometric_power_shares(n, 0.2).unwrap();
            assert_eq!(shares.len(), n);
            let sum: f64 = shares.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "n={n} sum={sum}");
            assert!((shares[0] - 0.2).abs() < 1e-9);
        }
    }

    #[test]
    fn test_geometric_unit_ratio_gives_equal_shares() {
        // Five shares of 0.2 already sum to 1: the ratio is exactly 1 and
        // no solver residual may creep into the shares.
        let shares = geometric_power_shares(5, 0.2).unwrap();
        for share in &shares {
            assert!((share - 0.2).abs() < 1e-12, "share {share}");
        }
        let sum: f64 = shares.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_geometric_single_agent() {
        assert_eq!(geometric_power_shares(1, 0.2).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_geometric_growing_ratio() {
        // 0.05 * 4 < 1, so the ratio must exceed 1 for four agents.
        let shares = geometric_power_shares(4, 0.05).unwrap();
        assert!(shares[3] > shares[0]);
        let sum: f64 = shares.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = r#"
start_date: 2022-01-01
end_date: 2023-01-01
agents:
  - policy:
      type: fixed_onboard
      max_daily_rb_onboard_pib: 5
  - policy:
      type: roi_threshold
      agent_optimism: 2
      roi_threshold: 0.15
"#;
        let s: Scenario = serde_yaml::from_str(yaml).unwrap();
        s.validate().unwrap();
        assert_eq!(s.agents.len(), 2);
        assert_eq!(s.lock_target, DEFAULT_LOCK_TARGET);
        assert!(matches!(
            s.agents[1].policy,
            PolicyConfig::RoiThreshold {
                agent_optimism: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_optimism_rejected() {
        let s = base_scenario(vec![AgentConfig {
            policy: PolicyConfig::RoiThreshold {
                max_daily_rb_onboard_pib: 3.0,
                renewal_rate: 0.6,
                fil_plus_rate: 0.6,
                agent_optimism: 7,
                roi_threshold: 0.1,
            },
            power_share: None,
        }]);
        assert!(matches!(
            s.validate(),
            Err(ScenarioError::InvalidOptimism { level: 7 })
        ));
    }
}
