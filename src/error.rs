//! Typed error taxonomy for the simulator.
//!
//! Construction-time validation problems are fatal and surface before any
//! simulation step runs; ledger lookups outside the precomputed horizon
//! indicate a sizing bug and also fail loudly. Numerical degeneracy (zero
//! denominators) is never an error; those paths clamp instead.

use chrono::NaiveDate;

/// Errors raised while validating a scenario before the simulation starts.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("agent power shares must sum to 1.0 (got {sum})")]
    PowerSharesNotNormalized { sum: f64 },

    #[error("start date {start} is before the network data epoch {epoch}")]
    StartBeforeEpoch { start: NaiveDate, epoch: NaiveDate },

    #[error("end date {end} is not after start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("expected {expected} agent configurations, got {actual}")]
    AgentCountMismatch { expected: usize, actual: usize },

    #[error(
        "max_day_onboard_rbp_pib {max_pib} is too small for {agents} agents \
         (minimum {min_pib} PiB per agent)"
    )]
    OnboardCapTooSmall {
        max_pib: f64,
        agents: usize,
        min_pib: f64,
    },

    #[error("scenario must define at least one agent")]
    NoAgents,

    #[error("agent optimism must be in 1..=5, got {level}")]
    InvalidOptimism { level: u8 },

    #[error("geometric power distribution did not converge for {agents} agents")]
    PowerDistributionDiverged { agents: usize },
}

/// Errors raised by time-indexed ledger lookups.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("date {date} is before the ledger epoch {epoch}")]
    BeforeEpoch { date: NaiveDate, epoch: NaiveDate },

    #[error("date {date} is beyond the ledger horizon (last row {horizon_end})")]
    BeyondHorizon {
        date: NaiveDate,
        horizon_end: NaiveDate,
    },
}
