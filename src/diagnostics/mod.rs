//! Reachability diagnostics for the walled garden.

pub mod monitor;
pub mod probe;
