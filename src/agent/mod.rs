//! Agents: a power-lifecycle ledger paired with a pluggable decision
//! policy.

pub mod lifecycle;
pub mod policy;

pub use lifecycle::AgentLifecycle;
pub use policy::{
    build_policy, AgentView, DayDecision, DecisionPolicy, NetworkView, PowerRequest,
};
