//! Daily reward distribution across agents.
//!
//! Each agent's share of the day's network reward is its live
//! quality-adjusted power divided by the sum across agents, renormalized
//! so the shares sum to exactly 1 despite floating-point drift. Rewards
//! vest 25% immediately, the rest in 180 equal daily installments
//! starting the next day.

use log::warn;

use crate::agent::AgentLifecycle;
use crate::constants::{REWARD_IMMEDIATE_FRACTION, REWARD_VEST_DAYS};

/// Normalized power shares at day `idx`. If no agent holds live power the
/// result is all zeros and nothing will be distributed.
pub fn power_shares(agents: &[AgentLifecycle], idx: usize) -> Vec<f64> {
    let raw: Vec<f64> = agents
        .iter()
        .map(|a| a.ledger().active_qa_power_pib(idx))
        .collect();
    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return vec![0.0; agents.len()];
    }
    raw.into_iter().map(|p| p / total).collect()
}

/// Distribute `day_network_reward` across agents at day `idx`, applying
/// the split-vesting schedule. Installments that would land beyond the
/// ledger horizon are truncated; within the simulation window that is a
/// sizing violation and is flagged rather than silently passed.
pub fn distribute(agents: &mut [AgentLifecycle], idx: usize, day_network_reward: f64) {
    let shares = power_shares(agents, idx);

    for (agent, share) in agents.iter_mut().zip(shares) {
        let reward = day_network_reward * share;
        if reward == 0.0 {
            continue;
        }

        let ledger = agent.ledger_mut();
        ledger.accounting_mut(idx).reward += reward * REWARD_IMMEDIATE_FRACTION;
        ledger.accounting_mut(idx).full_reward_for_power += reward;

        let installment = reward * (1.0 - REWARD_IMMEDIATE_FRACTION) / REWARD_VEST_DAYS as f64;
        let last = idx + REWARD_VEST_DAYS;
        if last >= ledger.len() {
            warn!(
                "reward vesting truncated at ledger horizon (day {idx}, {} installments lost)",
                last + 1 - ledger.len()
            );
        }
        for k in (idx + 1)..=last.min(ledger.len() - 1) {
            ledger.accounting_mut(k).reward += installment;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::policy::FixedOnboardPolicy;
    use crate::config::RenewalsSetting;
    use crate::constants::network_data_start;
    use crate::ledger::{AgentLedger, PowerEvent, PowerPair};

    fn agent_with_qa(id: usize, len: usize, qa_pib: f64) -> AgentLifecycle {
        let epoch = network_data_start();
        let mut ledger = AgentLedger::new(epoch, len);
        if qa_pib > 0.0 {
            ledger
                .record(
                    epoch,
                    PowerEvent::Onboard {
                        power: PowerPair::new(qa_pib, qa_pib),
                        duration_days: len,
                    },
                )
                .unwrap();
        }
        AgentLifecycle::new(
            id,
            1.0,
            RenewalsSetting::Optimistic,
            10.0,
            Box::new(FixedOnboardPolicy {
                max_daily_rb_onboard_pib: 3.0,
                renewal_rate: 0.6,
                fil_plus_rate: 0.0,
                sector_duration_days: 360,
            }),
            ledger,
        )
    }

    #[test]
    fn test_shares_sum_to_one() {
        let agents = vec![
            agent_with_qa(0, 400, 7.0),
            agent_with_qa(1, 400, 2.0),
            agent_with_qa(2, 400, 1.0),
        ];
        let shares = power_shares(&agents, 10);
        let sum: f64 = shares.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!((shares[0] - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_shares_all_zero_power() {
        let agents = vec![agent_with_qa(0, 10, 0.0), agent_with_qa(1, 10, 0.0)];
        assert_eq!(power_shares(&agents, 5), vec![0.0, 0.0]);
    }

    #[test]
    fn test_split_vesting_arithmetic() {
        let mut agents = vec![agent_with_qa(0, 400, 7.0), agent_with_qa(1, 400, 3.0)];
        distribute(&mut agents, 10, 100.0);

        // 70/30 power split: immediate credits are 25% of each share.
        assert!((agents[0].ledger().accounting(10).reward - 17.5).abs() < 1e-9);
        assert!((agents[1].ledger().accounting(10).reward - 7.5).abs() < 1e-9);
        assert!((agents[0].ledger().accounting(10).full_reward_for_power - 70.0).abs() < 1e-9);

        // 75% spreads over exactly 180 installments from the next day.
        let installment = 70.0 * 0.75 / 180.0;
        assert!((agents[0].ledger().accounting(11).reward - installment).abs() < 1e-12);
        assert!((agents[0].ledger().accounting(190).reward - installment).abs() < 1e-12);
        assert_eq!(agents[0].ledger().accounting(191).reward, 0.0);

        // Total credited equals the full share.
        let total: f64 = (0..400)
            .map(|i| agents[0].ledger().accounting(i).reward)
            .sum();
        assert!((total - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_vesting_truncated_at_horizon() {
        let mut agents = vec![agent_with_qa(0, 100, 5.0)];
        distribute(&mut agents, 50, 100.0);
        let total: f64 = (0..100)
            .map(|i| agents[0].ledger().accounting(i).reward)
            .sum();
        // 49 of 180 installments fit; the rest are lost at the horizon.
        let expected = 100.0 * 0.25 + 49.0 * (100.0 * 0.75 / 180.0);
        assert!((total - expected).abs() < 1e-9);
    }
}
