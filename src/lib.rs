//! # Filsim - Agent-based storage-network economics simulator
//!
//! This library simulates the token economics of a proof-of-storage
//! network as a population of autonomous storage providers. Each agent
//! owns a share of the network's historical power, runs a decision
//! policy every simulated day, and the engine aggregates the results
//! into network-wide power, minting, collateral, and circulating-supply
//! trajectories.
//!
//! ## Overview
//!
//! A simulation is driven by a YAML scenario (dates, agents, economic
//! parameters) and a historical data bundle (the network's recorded
//! power and supply series). The orchestrator replays the history up to
//! the simulation start, then steps one day at a time: agents decide
//! simultaneously against yesterday's finalized state, their power
//! events are aggregated, and the economic engines derive the day's
//! minting, pledge, and supply.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `config`: scenario structures, YAML parsing, and validation
//! - `constants`: storage units, epoch dates, and protocol parameters
//! - `curves`: closed-form minting and vesting curves
//! - `data`: historical data loading, caching, and synthesis
//! - `ledger`: time-indexed network and per-agent state tables
//! - `econ`: pledge, minting, supply, and reward-distribution engines
//! - `forecast`: reward and discount-rate processes agents decide against
//! - `agent`: agent lifecycle and decision policies
//! - `orchestrator`: bootstrap and the daily step loop
//! - `export`: CSV result tables
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use filsim::data::HistoricalData;
//! use filsim::orchestrator::Simulation;
//!
//! let scenario = filsim::config::load_scenario("scenario.yaml".as_ref())?;
//! let data = HistoricalData::synthetic(scenario.start_date, scenario.end_date, 1234);
//! let mut sim = Simulation::new(scenario, &data)?;
//! sim.run()?;
//! filsim::export::write_results(&sim, "results".as_ref())?;
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Validation and ledger indexing use typed errors (`thiserror`);
//! application-level flows return `color_eyre` results with context.

pub mod agent;
pub mod config;
pub mod constants;
pub mod curves;
pub mod data;
pub mod econ;
pub mod error;
pub mod export;
pub mod forecast;
pub mod ledger;
pub mod orchestrator;
