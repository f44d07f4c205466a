use clap::Parser;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use filsim::config::load_scenario;
use filsim::data::HistoricalData;
use filsim::export::write_results;
use filsim::orchestrator::Simulation;

/// Agent-based storage-network economics simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the scenario YAML file
    #[arg(short, long)]
    scenario: PathBuf,

    /// Path to the historical data bundle (JSON). When omitted, a
    /// synthetic bundle is generated from the scenario's random seed.
    #[arg(long)]
    historical_data: Option<PathBuf>,

    /// Output directory for result tables
    #[arg(short, long, default_value = "results")]
    output: PathBuf,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Loading scenario from {:?}", args.scenario);
    let scenario = load_scenario(&args.scenario)?;
    info!(
        "Scenario: {} agents, {} to {}",
        scenario.agents.len(),
        scenario.start_date,
        scenario.end_date
    );

    let data = match &args.historical_data {
        Some(path) => {
            info!("Loading historical data from {:?}", path);
            HistoricalData::load_with_cache(path)?
        }
        None => {
            info!(
                "No historical data supplied, generating a synthetic bundle (seed {})",
                scenario.random_seed
            );
            HistoricalData::synthetic(scenario.start_date, scenario.end_date, scenario.random_seed)
        }
    };

    let mut sim = Simulation::new(scenario, &data)?;
    sim.run()?;

    write_results(&sim, &args.output)?;
    info!("Results written to {:?}", args.output);

    Ok(())
}
