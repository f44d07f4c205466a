//! The simulation orchestrator.
//!
//! Coordinates the bootstrap (replaying the historical record up to the
//! simulation start) and the daily step loop. Within one day the update
//! order is fixed: forecasts, agent decisions, power aggregation,
//! minting, terminations, pledge accounting, circulating supply, derived
//! quantities, reward distribution. Agents decide simultaneously against
//! yesterday's finalized state; nothing an agent does today is visible to
//! another agent until tomorrow.

use chrono::NaiveDate;
use color_eyre::eyre::{ensure, Result};
use log::{debug, info};
use rayon::prelude::*;

use crate::agent::{build_policy, AgentLifecycle, DayDecision, NetworkView};
use crate::config::Scenario;
use crate::constants::{network_data_start, MAX_SECTOR_DURATION_DAYS, MIN_VALUE, PIB, SECTOR_SIZE};
use crate::data::HistoricalData;
use crate::econ::supply::GasBurnMode;
use crate::econ::{
    minting::MintingEngine,
    pledge::{locked_block_rewards_delta, renewal_ratio, PledgeAccountant, DefaultOnboardRatio},
    rewards, SupplyAggregator,
};
use crate::forecast::{DiscountRate, RewardForecast};
use crate::ledger::{AgentLedger, NetworkLedger};

/// Lifecycle state of a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Replaying the historical record; no agent has decided anything.
    Bootstrapping,
    /// Stepping through simulated days.
    Running,
    /// The end date has been reached.
    Finished,
}

/// A fully constructed simulation: the network ledger, the agents, and
/// the economic engines, stepped one day at a time.
pub struct Simulation {
    scenario: Scenario,
    net: NetworkLedger,
    agents: Vec<AgentLifecycle>,
    minting: MintingEngine,
    pledge: PledgeAccountant,
    supply: SupplyAggregator,
    forecast: RewardForecast,
    discount: DiscountRate,
    phase: Phase,
    /// Index of the next day to simulate.
    current: usize,
    start_idx: usize,
    end_idx: usize,
}

impl Simulation {
    /// Build and bootstrap a simulation from a validated scenario and a
    /// historical data bundle.
    pub fn new(scenario: Scenario, data: &HistoricalData) -> Result<Self> {
        scenario.validate()?;
        let shares = scenario.power_shares()?;

        let epoch = network_data_start();
        let net = NetworkLedger::new(epoch, scenario.end_date, MAX_SECTOR_DURATION_DAYS);
        let start_idx = net.index(scenario.start_date)?;
        let end_idx = net.index(scenario.end_date)?;

        let mut agents = Vec::with_capacity(scenario.agents.len());
        for (id, (cfg, share)) in scenario.agents.iter().zip(shares).enumerate() {
            let policy = build_policy(&cfg.policy)?;
            agents.push(AgentLifecycle::new(
                id,
                share,
                scenario.renewals_setting,
                scenario.max_onboard_per_agent_pib(),
                policy,
                AgentLedger::new(epoch, net.len()),
            ));
        }

        let gas_mode = if scenario.use_historical_gas {
            GasBurnMode::Historical
        } else {
            GasBurnMode::ConstantAverage
        };

        let mut sim = Self {
            minting: MintingEngine::new(data.zero_cum_capped_power),
            pledge: PledgeAccountant::new(scenario.lock_target, Box::new(DefaultOnboardRatio)),
            supply: SupplyAggregator::new(gas_mode, data.daily_burn_average()),
            forecast: RewardForecast::new(net.len()),
            discount: DiscountRate::new(scenario.discount_rate_pct),
            phase: Phase::Bootstrapping,
            current: start_idx,
            start_idx,
            end_idx,
            scenario,
            net,
            agents,
        };
        sim.bootstrap(data)?;
        Ok(sim)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn network(&self) -> &NetworkLedger {
        &self.net
    }

    pub fn agents(&self) -> &[AgentLifecycle] {
        &self.agents
    }

    pub fn start_idx(&self) -> usize {
        self.start_idx
    }

    pub fn end_idx(&self) -> usize {
        self.end_idx
    }

    /// Date of the next day to simulate.
    pub fn current_date(&self) -> NaiveDate {
        self.net.date_at(self.current)
    }

    /// Replay the historical record so that day `start_idx - 1` is fully
    /// finalized before the first simulated decision.
    fn bootstrap(&mut self, data: &HistoricalData) -> Result<()> {
        ensure!(
            self.start_idx >= 1,
            "simulation start must leave at least one historical day before it"
        );
        ensure!(
            data.days.len() >= self.start_idx,
            "historical data covers {} days but {} are needed before {}",
            data.days.len(),
            self.start_idx,
            self.scenario.start_date
        );

        for agent in &mut self.agents {
            agent.seed_from_history(data)?;
        }

        // Network-side history: per-day lifecycle totals, cumulative
        // power, and the historical gas-burn series.
        for (i, day) in data.days.iter().take(self.start_idx).enumerate() {
            let slice = self.net.slice_mut(i);
            slice.day_onboarded_rbp_pib = day.onboarded.raw_pib;
            slice.day_onboarded_qap_pib = day.onboarded.qa_pib;
            slice.day_renewed_rbp_pib = day.renewed.raw_pib;
            slice.day_renewed_qap_pib = day.renewed.qa_pib;
            slice.day_sched_expire_rbp_pib = day.sched_expire.raw_pib;
            slice.day_sched_expire_qap_pib = day.sched_expire.qa_pib;
            slice.day_terminated_rbp_pib = day.terminated.raw_pib;
            slice.day_terminated_qap_pib = day.terminated.qa_pib;
            slice.day_network_rbp_pib = day.onboarded.raw_pib + day.renewed.raw_pib
                - day.sched_expire.raw_pib
                - day.terminated.raw_pib;
            slice.day_network_qap_pib = day.onboarded.qa_pib + day.renewed.qa_pib
                - day.sched_expire.qa_pib
                - day.terminated.qa_pib;
            slice.total_raw_power_eib = day.total_raw_power_eib.max(MIN_VALUE);
            slice.total_qa_power_eib = day.total_qa_power_eib.max(MIN_VALUE);
            if self.scenario.use_historical_gas {
                slice.network_gas_burn = data.supply[i].burnt_fil;
            }
        }

        // Known pledge releases, network-wide. Future expirations live in
        // the agent ledgers and are re-aggregated each simulated day.
        for release in &data.scheduled_releases {
            if let Ok(idx) = self.net.index(release.date) {
                self.net.slice_mut(idx).scheduled_pledge_release += release.amount;
            }
        }

        // Minting over the whole history, then backfill the epoch row.
        for i in 0..self.start_idx {
            self.minting.step(&mut self.net, i);
        }
        self.minting.backfill_first_day(&mut self.net);

        // Day-zero collateral state comes straight from the supply
        // snapshot; the pledge/reward split is not recorded historically,
        // so it is seeded half-and-half.
        let first = &data.supply[0];
        let slice = self.net.slice_mut(0);
        slice.network_locked = first.locked_fil;
        slice.network_locked_pledge = first.locked_fil / 2.0;
        slice.network_locked_reward = first.locked_fil / 2.0;
        slice.circ_supply = first.circulating_fil;

        for idx in 1..self.start_idx {
            self.replay_day(data, idx);
        }

        for agent in &mut self.agents {
            agent.ledger_mut().zero_rewards();
        }

        self.phase = Phase::Running;
        info!(
            "bootstrap complete: {} historical days replayed, {} agents, simulating {} to {}",
            self.start_idx,
            self.agents.len(),
            self.scenario.start_date,
            self.scenario.end_date
        );
        Ok(())
    }

    /// One historical day of collateral and supply accounting. Power and
    /// minting are already in place; renewal behavior comes from the
    /// record instead of agent decisions.
    fn replay_day(&mut self, data: &HistoricalData, idx: usize) {
        let day = &data.days[idx];
        let ratio = renewal_ratio(day.renewed.qa_pib, day.sched_expire.qa_pib);
        let sched_release = self.net.slice(idx).scheduled_pledge_release;
        let day_reward = self.net.slice(idx).day_network_reward;
        let prev = self.net.slice(idx - 1);
        let prev_circ = prev.circ_supply;
        let prev_locked_reward = prev.network_locked_reward;
        let total_qa = self.net.total_qa_bytes(idx);
        let baseline = self.net.slice(idx).network_baseline;

        let onboard_locked = self.pledge.required_pledge(
            day_reward,
            prev_circ,
            day.onboarded.qa_pib * PIB,
            total_qa,
            baseline,
        );
        let renew_locked = self.pledge.renewal_locked_pledge(
            day_reward,
            prev_circ,
            day.renewed.qa_pib * PIB,
            total_qa,
            baseline,
            ratio,
            sched_release,
        );
        let pledge_delta = onboard_locked + renew_locked - sched_release;
        let (locked, released) = locked_block_rewards_delta(day_reward, prev_locked_reward);
        let reward_delta = locked - released;

        {
            let slice = self.net.slice_mut(idx);
            slice.renewal_rate = ratio;
            slice.original_pledge = ratio * sched_release;
        }
        self.supply.step(
            &mut self.net,
            idx,
            pledge_delta,
            reward_delta,
            onboard_locked + renew_locked,
            renew_locked,
        );
        self.update_generated_quantities(idx);
    }

    /// Run the simulation to completion.
    pub fn run(&mut self) -> Result<()> {
        while self.phase == Phase::Running {
            self.step()?;
        }
        Ok(())
    }

    /// Advance one simulated day.
    pub fn step(&mut self) -> Result<()> {
        if self.phase != Phase::Running {
            return Ok(());
        }
        let idx = self.current;
        let date = self.net.date_at(idx);
        debug!("stepping {date} (day index {idx})");

        // Forecast processes see yesterday's finalized state only.
        self.forecast.step(&self.net, idx);
        self.discount.step(self.net.slice(idx - 1).circ_supply);

        let decisions = self.collect_decisions(idx, date);
        for (agent, decision) in self.agents.iter_mut().zip(&decisions) {
            agent.apply(date, idx, decision)?;
        }

        self.aggregate_power(idx);
        self.minting.step(&mut self.net, idx);
        self.aggregate_terminations(idx);
        let (pledge_delta, day_locked, day_renewed) = self.pledge_step(idx);

        let day_reward = self.net.slice(idx).day_network_reward;
        let prev_locked_reward = self.net.slice(idx - 1).network_locked_reward;
        let (locked, released) = locked_block_rewards_delta(day_reward, prev_locked_reward);
        self.supply.step(
            &mut self.net,
            idx,
            pledge_delta,
            locked - released,
            day_locked,
            day_renewed,
        );

        self.update_generated_quantities(idx);
        rewards::distribute(&mut self.agents, idx, day_reward);

        self.current += 1;
        if self.current >= self.end_idx {
            self.phase = Phase::Finished;
            info!("simulation finished at {}", self.scenario.end_date);
        }
        Ok(())
    }

    /// Simultaneous activation: every agent decides against the same
    /// immutable view, in parallel.
    fn collect_decisions(&self, idx: usize, date: NaiveDate) -> Vec<DayDecision> {
        let view = NetworkView {
            idx,
            date,
            net: &self.net,
            forecast: &self.forecast,
            discount: &self.discount,
            pledge: &self.pledge,
        };
        self.agents.par_iter().map(|a| a.decide(&view)).collect()
    }

    /// Sum the day's per-agent power events into network totals and roll
    /// the cumulative power forward.
    fn aggregate_power(&mut self, idx: usize) {
        let mut onboarded_rb = 0.0;
        let mut onboarded_qa = 0.0;
        let mut renewed_rb = 0.0;
        let mut renewed_qa = 0.0;
        let mut expire_rb = 0.0;
        let mut expire_qa = 0.0;
        let mut terminated_rb = 0.0;
        let mut terminated_qa = 0.0;
        for agent in &self.agents {
            let dp = agent.ledger().day_power(idx);
            onboarded_rb += dp.onboarded.raw_pib;
            onboarded_qa += dp.onboarded.qa_pib;
            renewed_rb += dp.renewed.raw_pib;
            renewed_qa += dp.renewed.qa_pib;
            // Agent ledgers carry both the seeded historical commitments
            // and the ones recorded during the simulation, so they are
            // the authoritative source of today's expirations.
            expire_rb += dp.sched_expire.raw_pib;
            expire_qa += dp.sched_expire.qa_pib;
            terminated_rb += dp.terminated.raw_pib;
            terminated_qa += dp.terminated.qa_pib;
        }

        let prev_raw = self.net.slice(idx - 1).total_raw_power_eib;
        let prev_qa = self.net.slice(idx - 1).total_qa_power_eib;
        let slice = self.net.slice_mut(idx);
        slice.day_sched_expire_rbp_pib = expire_rb;
        slice.day_sched_expire_qap_pib = expire_qa;
        slice.day_onboarded_rbp_pib = onboarded_rb;
        slice.day_onboarded_qap_pib = onboarded_qa;
        slice.day_renewed_rbp_pib = renewed_rb;
        slice.day_renewed_qap_pib = renewed_qa;
        slice.day_terminated_rbp_pib = terminated_rb;
        slice.day_terminated_qap_pib = terminated_qa;
        slice.day_network_rbp_pib = onboarded_rb + renewed_rb - expire_rb - terminated_rb;
        slice.day_network_qap_pib = onboarded_qa + renewed_qa - expire_qa - terminated_qa;
        slice.total_raw_power_eib =
            (prev_raw + slice.day_network_rbp_pib / 1024.0).max(MIN_VALUE);
        slice.total_qa_power_eib =
            (prev_qa + slice.day_network_qap_pib / 1024.0).max(MIN_VALUE);
    }

    /// Roll the cumulative termination burn forward with whatever the
    /// agents burned today.
    fn aggregate_terminations(&mut self, idx: usize) {
        let day_burn: f64 = self
            .agents
            .iter()
            .map(|a| a.ledger().accounting(idx).termination_burn)
            .sum();
        let prev = self.net.slice(idx - 1).burn_from_terminations;
        self.net.slice_mut(idx).burn_from_terminations = prev + day_burn;
    }

    /// Per-agent pledge accounting for one day: lock pledge for onboards
    /// and renewals, schedule the future releases, price the repayment
    /// obligations, and fold everything into network totals.
    ///
    /// Returns `(pledge_delta, day_locked_pledge, day_renewed_pledge)`.
    fn pledge_step(&mut self, idx: usize) -> (f64, f64, f64) {
        let day_reward = self.net.slice(idx).day_network_reward;
        let prev_circ = self.net.slice(idx - 1).circ_supply;
        let total_qa = self.net.total_qa_bytes(idx);
        let baseline = self.net.slice(idx).network_baseline;
        let horizon = self.net.len();

        let mut pledge_delta = 0.0;
        let mut day_locked = 0.0;
        let mut day_renewed = 0.0;
        let mut ratio_product = 1.0;
        let mut original_pledge = 0.0;

        for agent in &mut self.agents {
            let dp = agent.ledger().day_power(idx);
            let sched_release = agent.ledger().accounting(idx).scheduled_pledge_release;
            let ratio = renewal_ratio(dp.renewed.qa_pib, dp.sched_expire.qa_pib);

            let onboard_pledge = self.pledge.required_pledge(
                day_reward,
                prev_circ,
                dp.onboarded.qa_pib * PIB,
                total_qa,
                baseline,
            );
            let renew_pledge = self.pledge.renewal_locked_pledge(
                day_reward,
                prev_circ,
                dp.renewed.qa_pib * PIB,
                total_qa,
                baseline,
                ratio,
                sched_release,
            );

            {
                let row = agent.ledger_mut().accounting_mut(idx);
                row.onboard_pledge = onboard_pledge;
                row.renew_pledge = renew_pledge;
                row.repayment_onboard = self
                    .discount
                    .repayment_amount(onboard_pledge, dp.onboard_duration_days as f64 / 365.0);
                row.repayment_renew = self
                    .discount
                    .repayment_amount(renew_pledge, dp.renew_duration_days as f64 / 365.0);
            }

            // Locked pledge releases when the commitment it backs ends.
            // Releases past the ledger horizon land past the simulation
            // window and are dropped, matching the expiration handling.
            if onboard_pledge > 0.0 {
                let release_idx = idx + dp.onboard_duration_days;
                if release_idx < horizon {
                    let row = agent.ledger_mut().accounting_mut(release_idx);
                    row.onboard_scheduled_release += onboard_pledge;
                    row.scheduled_pledge_release += onboard_pledge;
                    self.net.slice_mut(release_idx).scheduled_pledge_release += onboard_pledge;
                }
            }
            if renew_pledge > 0.0 {
                let release_idx = idx + dp.renew_duration_days;
                if release_idx < horizon {
                    let row = agent.ledger_mut().accounting_mut(release_idx);
                    row.renew_scheduled_release += renew_pledge;
                    row.scheduled_pledge_release += renew_pledge;
                    self.net.slice_mut(release_idx).scheduled_pledge_release += renew_pledge;
                }
            }

            pledge_delta += onboard_pledge + renew_pledge - sched_release;
            day_locked += onboard_pledge + renew_pledge;
            day_renewed += renew_pledge;
            ratio_product *= ratio;
            original_pledge += ratio * sched_release;
        }

        let slice = self.net.slice_mut(idx);
        slice.renewal_rate = ratio_product;
        slice.original_pledge = original_pledge;
        (pledge_delta, day_locked, day_renewed)
    }

    /// Per-unit quantities derived after the day's totals are final; the
    /// forecast anchors to these tomorrow.
    fn update_generated_quantities(&mut self, idx: usize) {
        let total_qa = self.net.total_qa_bytes(idx);
        let rate = self.discount.rate_pct();
        let slice = self.net.slice_mut(idx);
        // Pledge per sector is priced off new onboards only; renewal
        // pledge tops up commitments that already exist.
        let onboard_qa_bytes = slice.day_onboarded_qap_pib * PIB;
        slice.day_pledge_per_qap = SECTOR_SIZE
            * (slice.day_locked_pledge - slice.day_renewed_pledge)
            / onboard_qa_bytes.max(MIN_VALUE);
        slice.day_rewards_per_sector =
            slice.day_network_reward * SECTOR_SIZE / total_qa.max(MIN_VALUE);
        slice.discount_rate_pct = rate;
    }
}
