//! Per-agent power-lifecycle ledger and accounting table.
//!
//! Each agent exclusively owns one [`AgentLedger`]. The orchestrator reads
//! it when aggregating network deltas and writes the accounting side
//! (pledge locks, reward vesting) after the day's totals are known; the
//! agent itself only records power events.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// A (raw, quality-adjusted) power amount in PiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerPair {
    pub raw_pib: f64,
    pub qa_pib: f64,
}

impl PowerPair {
    pub fn new(raw_pib: f64, qa_pib: f64) -> Self {
        Self { raw_pib, qa_pib }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            raw_pib: self.raw_pib * factor,
            qa_pib: self.qa_pib * factor,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.raw_pib == 0.0 && self.qa_pib == 0.0
    }
}

impl std::ops::Add for PowerPair {
    type Output = PowerPair;
    fn add(self, rhs: PowerPair) -> PowerPair {
        PowerPair {
            raw_pib: self.raw_pib + rhs.raw_pib,
            qa_pib: self.qa_pib + rhs.qa_pib,
        }
    }
}

impl std::ops::AddAssign for PowerPair {
    fn add_assign(&mut self, rhs: PowerPair) {
        self.raw_pib += rhs.raw_pib;
        self.qa_pib += rhs.qa_pib;
    }
}

impl std::ops::Sub for PowerPair {
    type Output = PowerPair;
    fn sub(self, rhs: PowerPair) -> PowerPair {
        PowerPair {
            raw_pib: self.raw_pib - rhs.raw_pib,
            qa_pib: self.qa_pib - rhs.qa_pib,
        }
    }
}

/// A power-lifecycle event recorded against a single day.
#[derive(Debug, Clone, Copy)]
pub enum PowerEvent {
    /// New power committed for `duration_days`; its expiration is
    /// scheduled automatically.
    Onboard {
        power: PowerPair,
        duration_days: usize,
    },
    /// Expiring power recommitted for `duration_days`; the new expiration
    /// is scheduled automatically.
    Renew {
        power: PowerPair,
        duration_days: usize,
    },
    /// Power whose commitment ends on this day.
    ScheduledExpire { power: PowerPair },
    /// Power removed from the network before its commitment ended.
    Terminate { power: PowerPair },
}

/// One day of per-agent token accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountingRow {
    /// Pledge locked for power onboarded this day.
    pub onboard_pledge: f64,
    /// Pledge locked for power renewed this day.
    pub renew_pledge: f64,
    /// Portion of `scheduled_pledge_release` inherited from prior onboards.
    pub onboard_scheduled_release: f64,
    /// Portion of `scheduled_pledge_release` inherited from prior renewals.
    pub renew_scheduled_release: f64,
    /// Total pledge scheduled to release on this day.
    pub scheduled_pledge_release: f64,
    /// Reward credited this day, post vesting split.
    pub reward: f64,
    /// Full pre-split reward attributable to this agent's power share.
    pub full_reward_for_power: f64,
    /// Repayment obligation priced for pledge borrowed for onboarding.
    pub repayment_onboard: f64,
    /// Repayment obligation priced for pledge borrowed for renewal.
    pub repayment_renew: f64,
    /// Collateral burned by terminations this day.
    pub termination_burn: f64,
}

/// The six raw power values for one day, plus the committed durations.
#[derive(Debug, Clone, Copy, Default)]
pub struct DayPower {
    pub onboarded: PowerPair,
    pub renewed: PowerPair,
    pub sched_expire: PowerPair,
    pub terminated: PowerPair,
    pub onboard_duration_days: usize,
    pub renew_duration_days: usize,
}

/// Per-agent time-indexed ledger sharing the network ledger's epoch and
/// horizon.
#[derive(Debug, Clone)]
pub struct AgentLedger {
    epoch: NaiveDate,
    onboarded: Vec<PowerPair>,
    onboarded_duration: Vec<usize>,
    renewed: Vec<PowerPair>,
    renewed_duration: Vec<usize>,
    sched_expire: Vec<PowerPair>,
    terminated: Vec<PowerPair>,
    accounting: Vec<AccountingRow>,
}

impl AgentLedger {
    pub fn new(epoch: NaiveDate, len: usize) -> Self {
        Self {
            epoch,
            onboarded: vec![PowerPair::zero(); len],
            onboarded_duration: vec![0; len],
            renewed: vec![PowerPair::zero(); len],
            renewed_duration: vec![0; len],
            sched_expire: vec![PowerPair::zero(); len],
            terminated: vec![PowerPair::zero(); len],
            accounting: vec![AccountingRow::default(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.onboarded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.onboarded.is_empty()
    }

    pub fn epoch(&self) -> NaiveDate {
        self.epoch
    }

    pub fn index(&self, date: NaiveDate) -> Result<usize, LedgerError> {
        let offset = (date - self.epoch).num_days();
        if offset < 0 {
            return Err(LedgerError::BeforeEpoch {
                date,
                epoch: self.epoch,
            });
        }
        let idx = offset as usize;
        if idx >= self.len() {
            return Err(LedgerError::BeyondHorizon {
                date,
                horizon_end: self.epoch + chrono::Duration::days(self.len() as i64 - 1),
            });
        }
        Ok(idx)
    }

    /// Record a power event against `date`.
    ///
    /// Onboard and renew events also schedule the expiration of the
    /// committed power at `date + duration_days`. An expiration landing
    /// beyond the ledger horizon is silently dropped: the horizon is sized
    /// so this only happens past the simulation window, where it has no
    /// effect.
    pub fn record(&mut self, date: NaiveDate, event: PowerEvent) -> Result<(), LedgerError> {
        let idx = self.index(date)?;
        match event {
            PowerEvent::Onboard {
                power,
                duration_days,
            } => {
                self.onboarded[idx] += power;
                self.onboarded_duration[idx] = duration_days;
                if let Some(exp) = self.sched_expire.get_mut(idx + duration_days) {
                    *exp += power;
                }
            }
            PowerEvent::Renew {
                power,
                duration_days,
            } => {
                self.renewed[idx] += power;
                self.renewed_duration[idx] = duration_days;
                if let Some(exp) = self.sched_expire.get_mut(idx + duration_days) {
                    *exp += power;
                }
            }
            PowerEvent::ScheduledExpire { power } => {
                self.sched_expire[idx] += power;
            }
            PowerEvent::Terminate { power } => {
                self.terminated[idx] += power;
            }
        }
        Ok(())
    }

    /// The six raw power values (and committed durations) for one day.
    pub fn day_power(&self, idx: usize) -> DayPower {
        DayPower {
            onboarded: self.onboarded[idx],
            renewed: self.renewed[idx],
            sched_expire: self.sched_expire[idx],
            terminated: self.terminated[idx],
            onboard_duration_days: self.onboarded_duration[idx],
            renew_duration_days: self.renewed_duration[idx],
        }
    }

    /// Cumulative quality-adjusted power still live at `idx`, in PiB,
    /// floored at zero. Used for reward-share computation.
    pub fn active_qa_power_pib(&self, idx: usize) -> f64 {
        let mut total = 0.0;
        for i in 0..=idx {
            total += self.onboarded[i].qa_pib + self.renewed[i].qa_pib
                - self.sched_expire[i].qa_pib
                - self.terminated[i].qa_pib;
        }
        total.max(0.0)
    }

    /// Quality-adjusted power scheduled to expire on `idx` that has not
    /// been renewed yet today, split is the caller's concern.
    pub fn expiring_power(&self, idx: usize) -> PowerPair {
        self.sched_expire[idx]
    }

    pub fn accounting(&self, idx: usize) -> &AccountingRow {
        &self.accounting[idx]
    }

    pub fn accounting_mut(&mut self, idx: usize) -> &mut AccountingRow {
        &mut self.accounting[idx]
    }

    pub fn accounting_rows(&self) -> &[AccountingRow] {
        &self.accounting
    }

    /// Zero out every credited reward. Run once at simulation start so all
    /// rewards observed afterwards are caused by simulated decisions.
    pub fn zero_rewards(&mut self) {
        for row in &mut self.accounting {
            row.reward = 0.0;
        }
    }

    /// Seed one historical day directly. Bootstrap-only: rows written here
    /// are never touched again.
    pub fn seed_history(
        &mut self,
        idx: usize,
        onboarded: PowerPair,
        renewed: PowerPair,
        sched_expire: PowerPair,
        terminated: PowerPair,
    ) {
        self.onboarded[idx] = onboarded;
        self.renewed[idx] = renewed;
        self.sched_expire[idx] = sched_expire;
        self.terminated[idx] = terminated;
    }

    /// Seed a future scheduled expiration from historical commitments.
    pub fn seed_future_expiration(&mut self, idx: usize, power: PowerPair) {
        self.sched_expire[idx] = power;
    }

    /// Seed this agent's share of the known scheduled pledge releases.
    pub fn seed_scheduled_release(&mut self, idx: usize, amount: f64) {
        self.accounting[idx].scheduled_pledge_release = amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, 15).unwrap()
    }

    #[test]
    fn test_onboard_schedules_expiration() {
        let mut ledger = AgentLedger::new(epoch(), 400);
        let date = epoch() + chrono::Duration::days(10);
        ledger
            .record(
                date,
                PowerEvent::Onboard {
                    power: PowerPair::new(3.0, 9.0),
                    duration_days: 180,
                },
            )
            .unwrap();
        assert_eq!(ledger.day_power(10).onboarded, PowerPair::new(3.0, 9.0));
        assert_eq!(ledger.day_power(190).sched_expire, PowerPair::new(3.0, 9.0));
    }

    #[test]
    fn test_expiration_beyond_horizon_dropped() {
        let mut ledger = AgentLedger::new(epoch(), 100);
        let date = epoch() + chrono::Duration::days(50);
        // Lands at index 410, past the horizon: recorded power stays, the
        // expiration vanishes.
        ledger
            .record(
                date,
                PowerEvent::Onboard {
                    power: PowerPair::new(1.0, 1.0),
                    duration_days: 360,
                },
            )
            .unwrap();
        assert_eq!(ledger.day_power(50).onboarded, PowerPair::new(1.0, 1.0));
        let total_se: f64 = (0..100).map(|i| ledger.day_power(i).sched_expire.qa_pib).sum();
        assert_eq!(total_se, 0.0);
    }

    #[test]
    fn test_active_qa_power_accumulates() {
        let mut ledger = AgentLedger::new(epoch(), 400);
        for day in 0..5 {
            let date = epoch() + chrono::Duration::days(day);
            ledger
                .record(
                    date,
                    PowerEvent::Onboard {
                        power: PowerPair::new(2.0, 4.0),
                        duration_days: 360,
                    },
                )
                .unwrap();
        }
        assert!((ledger.active_qa_power_pib(4) - 20.0).abs() < 1e-12);
        // Before any expiration the balance holds steady.
        assert!((ledger.active_qa_power_pib(300) - 20.0).abs() < 1e-12);
        // After all five commitments expire it returns to zero.
        assert_eq!(ledger.active_qa_power_pib(380), 0.0);
    }

    #[test]
    fn test_active_qa_power_floored_at_zero() {
        let mut ledger = AgentLedger::new(epoch(), 10);
        ledger
            .record(
                epoch(),
                PowerEvent::ScheduledExpire {
                    power: PowerPair::new(5.0, 5.0),
                },
            )
            .unwrap();
        assert_eq!(ledger.active_qa_power_pib(5), 0.0);
    }

    #[test]
    fn test_record_out_of_range_fails() {
        let mut ledger = AgentLedger::new(epoch(), 10);
        let late = epoch() + chrono::Duration::days(10);
        assert!(ledger
            .record(
                late,
                PowerEvent::Terminate {
                    power: PowerPair::new(1.0, 1.0)
                }
            )
            .is_err());
    }

    #[test]
    fn test_zero_rewards() {
        let mut ledger = AgentLedger::new(epoch(), 10);
        ledger.accounting_mut(3).reward = 12.5;
        ledger.accounting_mut(3).full_reward_for_power = 50.0;
        ledger.zero_rewards();
        assert_eq!(ledger.accounting(3).reward, 0.0);
        // Only the credited reward is zeroed.
        assert_eq!(ledger.accounting(3).full_reward_for_power, 50.0);
    }
}
