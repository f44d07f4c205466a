//! CSV export of simulation results.
//!
//! One network-level table plus one table per agent, written into the
//! output directory. Rows cover the simulated window only; the bootstrap
//! history and the post-simulation horizon are bookkeeping, not results.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use log::info;

use crate::orchestrator::Simulation;

const NETWORK_HEADER: &str = "date,day_onboarded_rbp_pib,day_onboarded_qap_pib,\
day_renewed_rbp_pib,day_renewed_qap_pib,day_sched_expire_rbp_pib,day_sched_expire_qap_pib,\
day_terminated_rbp_pib,day_terminated_qap_pib,total_raw_power_eib,total_qa_power_eib,\
day_network_reward,cum_network_reward,renewal_rate,day_locked_pledge,day_renewed_pledge,\
network_locked_pledge,network_locked_reward,network_locked,circ_supply,network_gas_burn,\
day_pledge_per_qap,day_rewards_per_sector,discount_rate_pct";

const AGENT_HEADER: &str = "date,onboarded_rbp_pib,onboarded_qap_pib,renewed_rbp_pib,\
renewed_qap_pib,sched_expire_rbp_pib,sched_expire_qap_pib,terminated_rbp_pib,\
terminated_qap_pib,onboard_pledge,renew_pledge,scheduled_pledge_release,reward,\
full_reward_for_power,repayment_onboard,repayment_renew,termination_burn";

/// Write all result tables for a finished (or partially run) simulation.
pub fn write_results(sim: &Simulation, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir).wrap_err_with(|| {
        format!("Failed to create output directory '{}'", output_dir.display())
    })?;

    let network_path = output_dir.join("network.csv");
    write_network_table(sim, &network_path)?;

    for agent in sim.agents() {
        let path = output_dir.join(format!("agent_{}.csv", agent.id()));
        write_agent_table(sim, agent.id(), &path)?;
    }

    info!(
        "wrote {} result tables to {}",
        sim.agents().len() + 1,
        output_dir.display()
    );
    Ok(())
}

fn write_network_table(sim: &Simulation, path: &Path) -> Result<()> {
    let file = File::create(path)
        .wrap_err_with(|| format!("Failed to create '{}'", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{NETWORK_HEADER}")?;

    for idx in sim.start_idx()..sim.end_idx() {
        let s = sim.network().slice(idx);
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            s.date,
            s.day_onboarded_rbp_pib,
            s.day_onboarded_qap_pib,
            s.day_renewed_rbp_pib,
            s.day_renewed_qap_pib,
            s.day_sched_expire_rbp_pib,
            s.day_sched_expire_qap_pib,
            s.day_terminated_rbp_pib,
            s.day_terminated_qap_pib,
            s.total_raw_power_eib,
            s.total_qa_power_eib,
            s.day_network_reward,
            s.cum_network_reward,
            s.renewal_rate,
            s.day_locked_pledge,
            s.day_renewed_pledge,
            s.network_locked_pledge,
            s.network_locked_reward,
            s.network_locked,
            s.circ_supply,
            s.network_gas_burn,
            s.day_pledge_per_qap,
            s.day_rewards_per_sector,
            s.discount_rate_pct,
        )?;
    }
    out.flush()?;
    Ok(())
}

fn write_agent_table(sim: &Simulation, agent_id: usize, path: &Path) -> Result<()> {
    let agent = &sim.agents()[agent_id];
    let file = File::create(path)
        .wrap_err_with(|| format!("Failed to create '{}'", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{AGENT_HEADER}")?;

    for idx in sim.start_idx()..sim.end_idx() {
        let date = sim.network().date_at(idx);
        let dp = agent.ledger().day_power(idx);
        let row = agent.ledger().accounting(idx);
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            date,
            dp.onboarded.raw_pib,
            dp.onboarded.qa_pib,
            dp.renewed.raw_pib,
            dp.renewed.qa_pib,
            dp.sched_expire.raw_pib,
            dp.sched_expire.qa_pib,
            dp.terminated.raw_pib,
            dp.terminated.qa_pib,
            row.onboard_pledge,
            row.renew_pledge,
            row.scheduled_pledge_release,
            row.reward,
            row.full_reward_for_power,
            row.repayment_onboard,
            row.repayment_renew,
            row.termination_burn,
        )?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentConfig, PolicyConfig, RenewalsSetting, Scenario};
    use crate::constants::network_data_start;
    use crate::data::HistoricalData;
    use tempfile::TempDir;

    fn small_sim() -> Simulation {
        let start = network_data_start() + chrono::Duration::days(90);
        let scenario = Scenario {
            start_date: start,
            end_date: start + chrono::Duration::days(10),
            lock_target: 0.3,
            max_day_onboard_rbp_pib: 25.0,
            use_historical_gas: true,
            renewals_setting: RenewalsSetting::Optimistic,
            random_seed: 9,
            discount_rate_pct: 25.0,
            agents: vec![AgentConfig {
                policy: PolicyConfig::FixedOnboard {
                    max_daily_rb_onboard_pib: 3.0,
                    renewal_rate: 0.6,
                    fil_plus_rate: 0.6,
                    sector_duration_days: 360,
                },
                power_share: None,
            }],
        };
        let data = HistoricalData::synthetic(scenario.start_date, scenario.end_date, 9);
        let mut sim = Simulation::new(scenario, &data).unwrap();
        sim.run().unwrap();
        sim
    }

    #[test]
    fn test_tables_written_with_expected_shape() {
        let sim = small_sim();
        let dir = TempDir::new().unwrap();
        write_results(&sim, dir.path()).unwrap();

        let network = std::fs::read_to_string(dir.path().join("network.csv")).unwrap();
        let lines: Vec<&str> = network.lines().collect();
        // Header plus one row per simulated day.
        assert_eq!(lines.len(), 11);
        assert!(lines[0].starts_with("date,day_onboarded_rbp_pib"));
        assert_eq!(
            lines[0].split(',').count(),
            lines[1].split(',').count()
        );

        let agent = std::fs::read_to_string(dir.path().join("agent_0.csv")).unwrap();
        assert_eq!(agent.lines().count(), 11);
    }
}
