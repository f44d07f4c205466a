//! Forward-looking series published to decision policies.
//!
//! Two processes update once per day, before any agent decides, reading
//! only yesterday's finalized network state: a rewards-per-sector
//! forecast at five confidence quantiles, and a token-supply discount
//! rate used to price pledge repayment. Policies read these; they never
//! mutate them.

use serde::{Deserialize, Serialize};

use crate::error::ScenarioError;
use crate::ledger::NetworkLedger;

/// Forecast confidence quantile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantile {
    Q05,
    Q25,
    Q50,
    Q75,
    Q95,
}

impl Quantile {
    /// Column label used in exported tables.
    pub fn label(self) -> &'static str {
        match self {
            Quantile::Q05 => "Q05",
            Quantile::Q25 => "Q25",
            Quantile::Q50 => "Q50",
            Quantile::Q75 => "Q75",
            Quantile::Q95 => "Q95",
        }
    }

    /// Multiplier applied to the median forecast path.
    fn multiplier(self) -> f64 {
        match self {
            Quantile::Q05 => 0.50,
            Quantile::Q25 => 0.80,
            Quantile::Q50 => 1.00,
            Quantile::Q75 => 1.20,
            Quantile::Q95 => 1.50,
        }
    }
}

/// Fixed optimism-level to quantile mapping. Level 1 is the most
/// pessimistic agent, 5 the most optimistic.
pub fn quantile_for_optimism(level: u8) -> Result<Quantile, ScenarioError> {
    match level {
        1 => Ok(Quantile::Q05),
        2 => Ok(Quantile::Q25),
        3 => Ok(Quantile::Q50),
        4 => Ok(Quantile::Q75),
        5 => Ok(Quantile::Q95),
        _ => Err(ScenarioError::InvalidOptimism { level }),
    }
}

/// Annualized decay applied to the forecast reward path: rewards per
/// sector shrink as the network grows and minting decays.
const FORECAST_DAILY_DECAY: f64 = 0.000_57;

/// Date-indexed rewards-per-sector forecast.
///
/// Each day the base path is re-anchored to yesterday's realized
/// reward-per-sector; forward values decay exponentially and scale per
/// quantile.
#[derive(Debug, Clone)]
pub struct RewardForecast {
    /// Base (median) estimate anchored at each day, token units per
    /// sector per day. Zero until the process first steps on that day.
    base_by_day: Vec<f64>,
}

impl RewardForecast {
    pub fn new(horizon_days: usize) -> Self {
        Self {
            base_by_day: vec![0.0; horizon_days],
        }
    }

    /// Re-anchor the forecast at day `idx` from yesterday's realized
    /// reward-per-sector.
    pub fn step(&mut self, net: &NetworkLedger, idx: usize) {
        let anchor = if idx == 0 {
            0.0
        } else {
            net.slice(idx - 1).day_rewards_per_sector
        };
        if idx < self.base_by_day.len() {
            self.base_by_day[idx] = anchor;
        }
    }

    /// Estimated reward per sector `days_ahead` days after day `idx`.
    pub fn estimate(&self, quantile: Quantile, idx: usize, days_ahead: usize) -> f64 {
        let base = self.base_by_day.get(idx).copied().unwrap_or(0.0);
        base * quantile.multiplier() * (-FORECAST_DAILY_DECAY * days_ahead as f64).exp()
    }

    /// Sum of the estimated daily rewards per sector over the next
    /// `duration_days` days from day `idx`.
    pub fn cumulative_estimate(&self, quantile: Quantile, idx: usize, duration_days: usize) -> f64 {
        let base = self.base_by_day.get(idx).copied().unwrap_or(0.0);
        if base == 0.0 || duration_days == 0 {
            return 0.0;
        }
        // Geometric sum of the decayed path.
        let r = (-FORECAST_DAILY_DECAY).exp();
        let sum = r * (1.0 - r.powi(duration_days as i32)) / (1.0 - r);
        base * quantile.multiplier() * sum
    }
}

/// Token-supply discount-rate process.
///
/// The rate is a configured constant annual percentage; the
/// `step(prev_circ_supply)` hook exists so an adaptive supply-driven rule
/// can be slotted in without touching the simulation clock.
#[derive(Debug, Clone)]
pub struct DiscountRate {
    annual_rate_pct: f64,
    last_circ_supply: f64,
}

impl DiscountRate {
    pub fn new(annual_rate_pct: f64) -> Self {
        Self {
            annual_rate_pct,
            last_circ_supply: 0.0,
        }
    }

    /// Update the process from yesterday's circulating supply.
    pub fn step(&mut self, prev_circ_supply: f64) {
        self.last_circ_supply = prev_circ_supply;
    }

    pub fn rate_pct(&self) -> f64 {
        self.annual_rate_pct
    }

    /// Amount owed after borrowing `principal` for `duration_yrs` years
    /// at the current rate, compounded annually.
    pub fn repayment_amount(&self, principal: f64, duration_yrs: f64) -> f64 {
        let r = self.annual_rate_pct / 100.0;
        principal * (1.0 + r).powf(duration_yrs)
    }
}
