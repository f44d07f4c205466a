//! Time-indexed ledgers for network-wide and per-agent state.
//!
//! Both ledgers share the same indexing scheme: an append-only array whose
//! position `i` is the calendar date `epoch + i` days. Date-to-index
//! translation is a single subtraction, never a table scan.

pub mod agent;
pub mod network;

pub use agent::{AccountingRow, AgentLedger, PowerEvent, PowerPair};
pub use network::{DaySlice, NetworkLedger};
