//! Data-entitlement evaluation.
//!
//! Turns the usage lookup into a decision:
//! - No checks at all: unmetered account, access granted
//! - At least one check with remaining data above the floor: access granted
//! - Checks present, none usable: no entitlement

use crate::protocol::models::{UsageCheck, UsageResponse};
use serde::Serialize;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Remaining balance of one quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckBalance {
    /// Allotted bytes.
    pub value: u64,
    /// Consumed bytes.
    pub result: u64,
    /// `value - result`, never negative.
    pub remaining: u64,
    /// `remaining > floor`.
    pub has_data: bool,
}

impl CheckBalance {
    fn evaluate(check: &UsageCheck, floor_bytes: u64) -> Self {
        let remaining = check.value.saturating_sub(check.result);
        Self {
            value: check.value,
            result: check.result,
            remaining,
            has_data: remaining > floor_bytes,
        }
    }
}

/// Outcome of an entitlement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitlementDecision {
    /// No quota configured on the account.
    Unmetered,
    /// At least one check has usable data.
    HasData,
    /// Checks exist but none has usable data.
    Exhausted,
}

/// Evaluated usage lookup. Rebuilt on every successful lookup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitlementRecord {
    checks: Vec<CheckBalance>,
    floor_bytes: u64,
}

impl EntitlementRecord {
    /// Evaluate a usage response against a remaining-data floor.
    pub fn from_usage(usage: &UsageResponse, floor_bytes: u64) -> Self {
        let checks = usage
            .checks
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|c| CheckBalance::evaluate(c, floor_bytes))
            .collect();
        Self {
            checks,
            floor_bytes,
        }
    }

    /// Per-check balances.
    pub fn checks(&self) -> &[CheckBalance] {
        &self.checks
    }

    /// Floor used for `has_data`.
    pub fn floor_bytes(&self) -> u64 {
        self.floor_bytes
    }

    /// Whether any check has usable data.
    pub fn has_data(&self) -> bool {
        self.checks.iter().any(|c| c.has_data)
    }

    /// Access decision.
    pub fn decision(&self) -> EntitlementDecision {
        if self.checks.is_empty() {
            EntitlementDecision::Unmetered
        } else if self.has_data() {
            EntitlementDecision::HasData
        } else {
            EntitlementDecision::Exhausted
        }
    }

    /// Usable remaining bytes: the sum over checks that have data.
    pub fn usable_bytes(&self) -> u64 {
        self.checks
            .iter()
            .filter(|c| c.has_data)
            .map(|c| c.remaining)
            .fold(0u64, u64::saturating_add)
    }

    /// Usable remaining data in MB with two decimals, e.g. `"512.00"`.
    pub fn remaining_mb(&self) -> String {
        format!("{:.2}", self.usable_bytes() as f64 / BYTES_PER_MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_DATA_FLOOR_BYTES;

    fn usage(checks: &[(u64, u64)]) -> UsageResponse {
        UsageResponse {
            checks: Some(
                checks
                    .iter()
                    .map(|&(value, result)| UsageCheck { value, result })
                    .collect(),
            ),
        }
    }

    #[test]
    fn absent_checks_are_unmetered() {
        let record = EntitlementRecord::from_usage(&UsageResponse::default(), DEFAULT_DATA_FLOOR_BYTES);
        assert_eq!(record.decision(), EntitlementDecision::Unmetered);
        assert_eq!(record.remaining_mb(), "0.00");
    }

    #[test]
    fn empty_checks_are_unmetered() {
        let record = EntitlementRecord::from_usage(&usage(&[]), DEFAULT_DATA_FLOOR_BYTES);
        assert_eq!(record.decision(), EntitlementDecision::Unmetered);
    }

    #[test]
    fn balance_above_floor_has_data() {
        let record = EntitlementRecord::from_usage(&usage(&[(1024 * 1024 * 1024, 512 * 1024 * 1024)]), DEFAULT_DATA_FLOOR_BYTES);
        assert_eq!(record.decision(), EntitlementDecision::HasData);
        assert_eq!(record.remaining_mb(), "512.00");
    }

    #[test]
    fn dust_balance_is_exhausted() {
        let record = EntitlementRecord::from_usage(&usage(&[(100_000, 60_000)]), DEFAULT_DATA_FLOOR_BYTES);
        assert_eq!(record.checks()[0].remaining, 40_000);
        assert!(!record.checks()[0].has_data);
        assert_eq!(record.decision(), EntitlementDecision::Exhausted);
        assert_eq!(record.remaining_mb(), "0.00");
    }

    #[test]
    fn balance_exactly_at_floor_is_exhausted() {
        let floor = DEFAULT_DATA_FLOOR_BYTES;
        let record = EntitlementRecord::from_usage(&usage(&[(floor, 0)]), floor);
        assert_eq!(record.decision(), EntitlementDecision::Exhausted);
    }

    #[test]
    fn overconsumed_clamps_to_zero() {
        let record = EntitlementRecord::from_usage(&usage(&[(100, 5_000)]), 0);
        assert_eq!(record.checks()[0].remaining, 0);
        assert_eq!(record.decision(), EntitlementDecision::Exhausted);
    }

    #[test]
    fn any_usable_check_grants_access() {
        let record = EntitlementRecord::from_usage(
            &usage(&[(1000, 1000), (3 * 1024 * 1024, 1024 * 1024)]),
            DEFAULT_DATA_FLOOR_BYTES,
        );
        assert_eq!(record.decision(), EntitlementDecision::HasData);
        assert_eq!(record.usable_bytes(), 2 * 1024 * 1024);
        assert_eq!(record.remaining_mb(), "2.00");
    }

    #[test]
    fn zero_floor_counts_any_byte() {
        let record = EntitlementRecord::from_usage(&usage(&[(10, 9)]), 0);
        assert_eq!(record.decision(), EntitlementDecision::HasData);
    }
}
