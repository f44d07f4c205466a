//! The network economic state engine: pledge accounting, minting,
//! circulating supply, and reward distribution.

pub mod minting;
pub mod pledge;
pub mod rewards;
pub mod supply;

pub use minting::MintingEngine;
pub use pledge::{OnboardRatio, PledgeAccountant, DefaultOnboardRatio};
pub use supply::SupplyAggregator;
