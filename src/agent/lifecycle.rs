//! Agent lifecycle: ledger ownership, historical seeding, and the
//! application of policy decisions.

use chrono::NaiveDate;
use log::debug;

use crate::config::RenewalsSetting;
use crate::constants::{MIN_SECTORS_ONBOARD, PIB, SECTOR_SIZE};
use crate::data::HistoricalData;
use crate::error::LedgerError;
use crate::ledger::{AgentLedger, PowerEvent, PowerPair};

use super::policy::{AgentView, DayDecision, DecisionPolicy, NetworkView, PowerRequest};

/// One simulated storage provider: its share-scaled history, its live
/// ledger, and the policy that drives it.
pub struct AgentLifecycle {
    id: usize,
    power_share: f64,
    renewals: RenewalsSetting,
    max_onboard_pib: f64,
    policy: Box<dyn DecisionPolicy>,
    ledger: AgentLedger,
}

impl AgentLifecycle {
    pub fn new(
        id: usize,
        power_share: f64,
        renewals: RenewalsSetting,
        max_onboard_pib: f64,
        policy: Box<dyn DecisionPolicy>,
        ledger: AgentLedger,
    ) -> Self {
        Self {
            id,
            power_share,
            renewals,
            max_onboard_pib,
            policy,
            ledger,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn power_share(&self) -> f64 {
        self.power_share
    }

    pub fn ledger(&self) -> &AgentLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut AgentLedger {
        &mut self.ledger
    }

    /// Seed this agent's share of the historical record: daily lifecycle
    /// stats, commitments expiring after simulation start, and known
    /// pledge releases. Everything scales by the agent's power share.
    pub fn seed_from_history(&mut self, data: &HistoricalData) -> Result<(), LedgerError> {
        let share = self.power_share;
        for (i, day) in data.days.iter().enumerate() {
            self.ledger.seed_history(
                i,
                day.onboarded.scaled(share),
                day.renewed.scaled(share),
                day.sched_expire.scaled(share),
                day.terminated.scaled(share),
            );
        }
        for exp in &data.future_expirations {
            let idx = self.ledger.index(exp.date)?;
            self.ledger
                .seed_future_expiration(idx, exp.power.scaled(share));
        }
        for release in &data.scheduled_releases {
            // Releases past the horizon cannot affect the simulation.
            if let Ok(idx) = self.ledger.index(release.date) {
                self.ledger
                    .seed_scheduled_release(idx, release.amount * share);
            }
        }
        debug!("agent {} seeded with power share {share}", self.id);
        Ok(())
    }

    /// Ask the policy for today's decision. The expiring power handed to
    /// the policy is adjusted for the scenario's renewal setting.
    pub fn decide(&self, view: &NetworkView<'_>) -> DayDecision {
        let expiring = match self.renewals {
            RenewalsSetting::Optimistic => self.ledger.expiring_power(view.idx),
            RenewalsSetting::Conservative => {
                let raw = self.ledger.expiring_power(view.idx).raw_pib;
                PowerPair::new(raw, raw)
            }
        };
        let agent_view = AgentView {
            expiring,
            max_onboard_pib: self.max_onboard_pib,
        };
        self.policy.decide(view, &agent_view)
    }

    /// Record today's decision in the ledger. Onboarding is clamped to
    /// the sealing-throughput cap and dropped entirely below one sector;
    /// renewals are clamped to what is actually expiring.
    pub fn apply(
        &mut self,
        date: NaiveDate,
        idx: usize,
        decision: &DayDecision,
    ) -> Result<(), LedgerError> {
        if let Some(req) = decision.onboard {
            if let Some(power) = self.clamp_onboard(req) {
                self.ledger.record(
                    date,
                    PowerEvent::Onboard {
                        power,
                        duration_days: req.duration_days,
                    },
                )?;
            }
        }
        if let Some(req) = decision.renew {
            if let Some(power) = self.clamp_renew(req, idx) {
                self.ledger.record(
                    date,
                    PowerEvent::Renew {
                        power,
                        duration_days: req.duration_days,
                    },
                )?;
            }
        }
        Ok(())
    }

    fn clamp_onboard(&self, req: PowerRequest) -> Option<PowerPair> {
        let min_pib = MIN_SECTORS_ONBOARD * SECTOR_SIZE / PIB;
        if req.power.raw_pib < min_pib {
            return None;
        }
        if req.power.raw_pib <= self.max_onboard_pib {
            return Some(req.power);
        }
        Some(req.power.scaled(self.max_onboard_pib / req.power.raw_pib))
    }

    fn clamp_renew(&self, req: PowerRequest, idx: usize) -> Option<PowerPair> {
        let expiring = self.ledger.expiring_power(idx);
        let power = PowerPair::new(
            req.power.raw_pib.min(expiring.raw_pib.max(0.0)),
            req.power.qa_pib.min(expiring.qa_pib.max(0.0)),
        );
        if power.is_zero() {
            return None;
        }
        Some(power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::policy::FixedOnboardPolicy;
    use crate::constants::network_data_start;

    fn lifecycle(max_onboard: f64, renewals: RenewalsSetting) -> AgentLifecycle {
        let epoch = network_data_start();
        AgentLifecycle::new(
            0,
            0.5,
            renewals,
            max_onboard,
            Box::new(FixedOnboardPolicy {
                max_daily_rb_onboard_pib: 3.0,
                renewal_rate: 0.6,
                fil_plus_rate: 0.0,
                sector_duration_days: 360,
            }),
            AgentLedger::new(epoch, 600),
        )
    }

    #[test]
    fn test_apply_records_onboard_and_renew() {
        let mut agent = lifecycle(10.0, RenewalsSetting::Optimistic);
        let epoch = network_data_start();
        agent
            .ledger_mut()
            .seed_future_expiration(5, PowerPair::new(4.0, 8.0));

        let decision = DayDecision {
            onboard: Some(PowerRequest {
                power: PowerPair::new(3.0, 3.0),
                duration_days: 360,
            }),
            renew: Some(PowerRequest {
                power: PowerPair::new(2.0, 4.0),
                duration_days: 360,
            }),
        };
        let date = epoch + chrono::Duration::days(5);
        agent.apply(date, 5, &decision).unwrap();

        let dp = agent.ledger().day_power(5);
        assert_eq!(dp.onboarded, PowerPair::new(3.0, 3.0));
        assert_eq!(dp.renewed, PowerPair::new(2.0, 4.0));
        // Both commitments expire 360 days out.
        assert_eq!(
            agent.ledger().day_power(365).sched_expire,
            PowerPair::new(5.0, 7.0)
        );
    }

    #[test]
    fn test_onboard_clamped_to_throughput() {
        let mut agent = lifecycle(1.5, RenewalsSetting::Optimistic);
        let epoch = network_data_start();
        let decision = DayDecision {
            onboard: Some(PowerRequest {
                power: PowerPair::new(3.0, 6.0),
                duration_days: 360,
            }),
            renew: None,
        };
        agent.apply(epoch, 0, &decision).unwrap();
        let dp = agent.ledger().day_power(0);
        assert!((dp.onboarded.raw_pib - 1.5).abs() < 1e-12);
        // QA scales with the clamp.
        assert!((dp.onboarded.qa_pib - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_sub_sector_onboard_dropped() {
        let mut agent = lifecycle(10.0, RenewalsSetting::Optimistic);
        let epoch = network_data_start();
        let tiny = SECTOR_SIZE / PIB / 2.0;
        let decision = DayDecision {
            onboard: Some(PowerRequest {
                power: PowerPair::new(tiny, tiny),
                duration_days: 360,
            }),
            renew: None,
        };
        agent.apply(epoch, 0, &decision).unwrap();
        assert!(agent.ledger().day_power(0).onboarded.is_zero());
    }

    #[test]
    fn test_renew_clamped_to_expiring() {
        let mut agent = lifecycle(10.0, RenewalsSetting::Optimistic);
        let epoch = network_data_start();
        agent
            .ledger_mut()
            .seed_future_expiration(0, PowerPair::new(1.0, 2.0));
        let decision = DayDecision {
            onboard: None,
            renew: Some(PowerRequest {
                power: PowerPair::new(5.0, 10.0),
                duration_days: 180,
            }),
        };
        agent.apply(epoch, 0, &decision).unwrap();
        assert_eq!(
            agent.ledger().day_power(0).renewed,
            PowerPair::new(1.0, 2.0)
        );
    }

    #[test]
    fn test_conservative_renewal_clamp_keeps_raw_amount() {
        let mut agent = lifecycle(10.0, RenewalsSetting::Conservative);
        agent
            .ledger_mut()
            .seed_future_expiration(3, PowerPair::new(2.0, 9.0));
        // A conservative policy only ever requests the capacity class.
        let clamped = agent.clamp_renew(
            PowerRequest {
                power: PowerPair::new(2.0, 2.0),
                duration_days: 360,
            },
            3,
        );
        assert_eq!(clamped, Some(PowerPair::new(2.0, 2.0)));
    }

    #[test]
    fn test_seed_from_history_scales_by_share() {
        let start = network_data_start() + chrono::Duration::days(60);
        let end = start + chrono::Duration::days(30);
        let data = HistoricalData::synthetic(start, end, 3);

        let mut agent = AgentLifecycle::new(
            1,
            0.5,
            RenewalsSetting::Optimistic,
            10.0,
            Box::new(FixedOnboardPolicy {
                max_daily_rb_onboard_pib: 3.0,
                renewal_rate: 0.6,
                fil_plus_rate: 0.0,
                sector_duration_days: 360,
            }),
            AgentLedger::new(network_data_start(), 2000),
        );
        agent.seed_from_history(&data).unwrap();

        let dp = agent.ledger().day_power(10);
        assert!((dp.onboarded.raw_pib - data.days[10].onboarded.raw_pib * 0.5).abs() < 1e-12);
        assert!(
            (agent.ledger().accounting(0).scheduled_pledge_release
                - data.scheduled_releases[0].amount * 0.5)
                .abs()
                < 1e-9
        );
    }
}
