//! Access policy.

pub mod entitlement;
