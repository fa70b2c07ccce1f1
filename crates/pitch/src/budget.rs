//! Expansion budget for navigation queries.
//!
//! Budgets are counted in search-node expansions rather than wall-clock time
//! so that the same query against the same data always spends the same
//! amount. A tick can hand every AI entity its own budget and know up front
//! that no query will exceed its slice.

use serde::{Deserialize, Serialize};

/// Remaining node expansions a query may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryBudget {
    limit: u32,
    spent: u32,
}

impl QueryBudget {
    /// Creates a budget allowing `limit` expansions.
    #[must_use]
    pub const fn new(limit: u32) -> Self {
        Self { limit, spent: 0 }
    }

    /// Attempts to spend one expansion.
    ///
    /// Returns `false` once the budget is exhausted; the caller must then
    /// abandon the query.
    pub fn try_spend(&mut self) -> bool {
        if self.spent >= self.limit {
            return false;
        }
        self.spent += 1;
        true
    }

    /// Expansions spent so far.
    #[must_use]
    pub const fn spent(&self) -> u32 {
        self.spent
    }

    /// Expansions still available.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.spent)
    }

    /// Returns `true` if no expansions remain.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.spent >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spends_until_limit() {
        let mut budget = QueryBudget::new(2);
        assert!(budget.try_spend());
        assert!(budget.try_spend());
        assert!(!budget.try_spend());
        assert!(budget.is_exhausted());
        assert_eq!(budget.spent(), 2);
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn zero_budget_is_exhausted_immediately() {
        let mut budget = QueryBudget::new(0);
        assert!(budget.is_exhausted());
        assert!(!budget.try_spend());
    }
}
