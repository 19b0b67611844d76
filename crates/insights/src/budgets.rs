//! Budget spend and status.
//!
//! A budget's spent amount is never read from storage. Every read goes back
//! to the transactions for the budget's month and category.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use tally_core::{Amount, BudgetId, DomainError, Month, UserId, percent_of, round2};
use tally_ledger::{
    Budget, BudgetQuery, LedgerReader, LedgerWriter, StoreError, Transaction, TransactionQuery,
};

use crate::error::{InsightsError, InsightsResult};

/// Sum of absolute debit amounts in `month` for `category`.
///
/// `transactions` may contain anything; rows outside the month, other
/// categories and credits are ignored.
pub fn compute_spent(transactions: &[Transaction], month: Month, category: &str) -> Amount {
    let query = TransactionQuery::new()
        .in_month(month)
        .debits()
        .in_category(category);
    transactions
        .iter()
        .filter(|t| query.matches(t))
        .map(Transaction::magnitude)
        .sum()
}

/// A budget with its recomputed spend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    #[serde(flatten)]
    pub budget: Budget,
    pub spent_amount: Amount,
    pub remaining_amount: Amount,
    pub percentage_spent: Decimal,
    pub is_over_budget: bool,
}

impl BudgetStatus {
    pub fn new(budget: Budget, spent_amount: Amount) -> Self {
        let limit = budget.limit_amount;
        Self {
            remaining_amount: limit - spent_amount,
            percentage_spent: percent_of(spent_amount, limit),
            is_over_budget: spent_amount > limit,
            spent_amount,
            budget,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub total_budgets: usize,
    pub total_limit_amount: Amount,
    pub total_spent_amount: Amount,
    pub total_remaining_amount: Amount,
    pub over_budget_count: usize,
    /// Plain mean of the per-budget percentages, not weighted by limit.
    pub average_percentage_spent: Decimal,
}

pub fn summarize_budgets(budgets: &[BudgetStatus]) -> BudgetSummary {
    let total_limit_amount: Amount = budgets.iter().map(|b| b.budget.limit_amount).sum();
    let total_spent_amount: Amount = budgets.iter().map(|b| b.spent_amount).sum();
    let percentage_total: Decimal = budgets.iter().map(|b| b.percentage_spent).sum();

    BudgetSummary {
        total_budgets: budgets.len(),
        total_limit_amount,
        total_spent_amount,
        total_remaining_amount: total_limit_amount - total_spent_amount,
        over_budget_count: budgets.iter().filter(|b| b.is_over_budget).count(),
        average_percentage_spent: round2(tally_core::ratio(
            percentage_total,
            Decimal::from(budgets.len()),
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetStats {
    pub summary: BudgetSummary,
    pub budgets: Vec<BudgetStatus>,
}

/// Listing filter with 1-based paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetListQuery {
    pub month: Option<Month>,
    pub category: Option<String>,
    pub page: usize,
    pub limit: usize,
}

impl BudgetListQuery {
    pub const DEFAULT_LIMIT: usize = 20;
    pub const MAX_LIMIT: usize = 100;
}

impl Default for BudgetListQuery {
    fn default() -> Self {
        Self {
            month: None,
            category: None,
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetPage {
    pub budgets: Vec<BudgetStatus>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBudget {
    pub month: Month,
    pub category: String,
    pub limit_amount: Amount,
}

/// Budget reads and writes with spend always recomputed.
#[derive(Debug, Clone)]
pub struct BudgetService<S> {
    store: S,
}

impl<S> BudgetService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: LedgerReader> BudgetService<S> {
    pub fn spent(&self, user_id: UserId, month: Month, category: &str) -> InsightsResult<Amount> {
        let query = TransactionQuery::new()
            .in_month(month)
            .debits()
            .in_category(category);
        let rows = self.store.transactions(user_id, &query)?;
        Ok(compute_spent(&rows, month, category))
    }

    fn status(&self, budget: Budget) -> InsightsResult<BudgetStatus> {
        let spent = self.spent(budget.user_id, budget.month, &budget.category)?;
        Ok(BudgetStatus::new(budget, spent))
    }

    /// Budgets ordered newest month first, then by category.
    fn sorted(&self, user_id: UserId, query: &BudgetQuery) -> InsightsResult<Vec<Budget>> {
        let mut budgets = self.store.budgets(user_id, query)?;
        budgets.sort_by(|a, b| b.month.cmp(&a.month).then_with(|| a.category.cmp(&b.category)));
        Ok(budgets)
    }

    pub fn list(&self, user_id: UserId, query: &BudgetListQuery) -> InsightsResult<BudgetPage> {
        let page = query.page.max(1);
        let limit = query.limit.clamp(1, BudgetListQuery::MAX_LIMIT);

        let all = self.sorted(
            user_id,
            &BudgetQuery {
                month: query.month,
                category: query.category.clone(),
            },
        )?;
        let total = all.len();

        let budgets = all
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .map(|b| self.status(b))
            .collect::<InsightsResult<Vec<_>>>()?;

        Ok(BudgetPage {
            budgets,
            pagination: Pagination {
                page,
                limit,
                total,
                pages: total.div_ceil(limit),
            },
        })
    }

    pub fn get(&self, user_id: UserId, budget_id: BudgetId) -> InsightsResult<BudgetStatus> {
        let budget = self
            .store
            .budget(user_id, budget_id)?
            .ok_or_else(|| DomainError::not_found("budget"))?;
        self.status(budget)
    }

    pub fn stats(&self, user_id: UserId, month: Option<Month>) -> InsightsResult<BudgetStats> {
        let budgets = self
            .sorted(user_id, &BudgetQuery { month, category: None })?
            .into_iter()
            .map(|b| self.status(b))
            .collect::<InsightsResult<Vec<_>>>()?;

        Ok(BudgetStats {
            summary: summarize_budgets(&budgets),
            budgets,
        })
    }

    /// Distinct budget categories, alphabetical.
    pub fn categories(&self, user_id: UserId) -> InsightsResult<Vec<String>> {
        let budgets = self.store.budgets(user_id, &BudgetQuery::default())?;
        let distinct: BTreeSet<String> = budgets.into_iter().map(|b| b.category).collect();
        Ok(distinct.into_iter().collect())
    }

    /// Distinct budget months, newest first.
    pub fn months(&self, user_id: UserId) -> InsightsResult<Vec<Month>> {
        let budgets = self.store.budgets(user_id, &BudgetQuery::default())?;
        let distinct: BTreeSet<Month> = budgets.into_iter().map(|b| b.month).collect();
        Ok(distinct.into_iter().rev().collect())
    }
}

impl<S: LedgerReader + LedgerWriter> BudgetService<S> {
    pub fn create(&self, user_id: UserId, new: NewBudget) -> InsightsResult<BudgetStatus> {
        let existing = self.store.budgets(
            user_id,
            &BudgetQuery {
                month: Some(new.month),
                category: Some(new.category.clone()),
            },
        )?;
        if !existing.is_empty() {
            return Err(duplicate_budget().into());
        }

        let budget = Budget::new(user_id, new.month, new.category, new.limit_amount)?;
        self.store.insert_budget(budget.clone()).map_err(|e| -> InsightsError {
            match e {
                StoreError::Conflict(_) => duplicate_budget().into(),
                other => other.into(),
            }
        })?;

        info!(user_id = %user_id, budget_id = %budget.id, month = %budget.month, category = %budget.category, "budget created");
        self.status(budget)
    }

    /// Change the limit; `None` leaves the budget as it is.
    pub fn update_limit(
        &self,
        user_id: UserId,
        budget_id: BudgetId,
        limit_amount: Option<Amount>,
    ) -> InsightsResult<BudgetStatus> {
        let mut budget = self
            .store
            .budget(user_id, budget_id)?
            .ok_or_else(|| DomainError::not_found("budget"))?;

        if let Some(limit) = limit_amount {
            budget.set_limit(limit)?;
            self.store.update_budget(&budget)?;
        }

        self.status(budget)
    }

    pub fn delete(&self, user_id: UserId, budget_id: BudgetId) -> InsightsResult<()> {
        if !self.store.delete_budget(user_id, budget_id)? {
            return Err(DomainError::not_found("budget").into());
        }
        info!(user_id = %user_id, budget_id = %budget_id, "budget deleted");
        Ok(())
    }
}

fn duplicate_budget() -> DomainError {
    DomainError::conflict("budget already exists for this month and category")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, dec, txn};
    use proptest::prelude::*;

    fn jan() -> Month {
        "2024-01".parse().unwrap()
    }

    fn budget(category: &str, limit: &str) -> Budget {
        Budget::new(UserId::new(), jan(), category, dec(limit)).unwrap()
    }

    #[test]
    fn spent_sums_only_matching_debits() {
        let rows = vec![
            txn("-25.50", Some("Food"), Some("Cafe"), at(2024, 1, 5)),
            txn("-89.45", Some("Food"), Some("Grocer"), at(2024, 1, 20)),
            txn("2000.00", Some("Food"), Some("Payroll"), at(2024, 1, 31)),
            txn("-40.00", Some("Travel"), Some("Air"), at(2024, 1, 10)),
            txn("-12.00", Some("Food"), Some("Cafe"), at(2024, 2, 1)),
        ];
        assert_eq!(compute_spent(&rows, jan(), "Food"), dec("114.95"));
    }

    #[test]
    fn spent_is_zero_without_matches() {
        assert_eq!(compute_spent(&[], jan(), "Food"), Decimal::ZERO);
    }

    #[test]
    fn status_flags_overspend() {
        let status = BudgetStatus::new(budget("food", "100"), dec("150"));
        assert_eq!(status.remaining_amount, dec("-50"));
        assert_eq!(status.percentage_spent, dec("150"));
        assert!(status.is_over_budget);

        let exact = BudgetStatus::new(budget("food", "100"), dec("100"));
        assert!(!exact.is_over_budget);
    }

    #[test]
    fn zero_limit_reports_zero_percent() {
        let status = BudgetStatus::new(budget("food", "0"), dec("10"));
        assert_eq!(status.percentage_spent, Decimal::ZERO);
        assert!(status.is_over_budget);
    }

    #[test]
    fn summary_uses_unweighted_mean_of_percentages() {
        let budgets = vec![
            BudgetStatus::new(budget("food", "100"), dec("50")),   // 50%
            BudgetStatus::new(budget("rent", "1000"), dec("1000")), // 100%
            BudgetStatus::new(budget("fun", "30"), dec("10")),      // 33.33%
        ];
        let summary = summarize_budgets(&budgets);
        assert_eq!(summary.total_budgets, 3);
        assert_eq!(summary.total_limit_amount, dec("1130"));
        assert_eq!(summary.total_spent_amount, dec("1060"));
        assert_eq!(summary.total_remaining_amount, dec("70"));
        assert_eq!(summary.over_budget_count, 0);
        // (50 + 100 + 33.33) / 3 = 61.11; a spend-weighted figure would be 93.81.
        assert_eq!(summary.average_percentage_spent, dec("61.11"));
    }

    #[test]
    fn empty_summary_is_all_zero() {
        assert_eq!(summarize_budgets(&[]), BudgetSummary::default());
    }

    #[test]
    fn status_serializes_flat() {
        let json = serde_json::to_value(BudgetStatus::new(budget("food", "100"), dec("25"))).unwrap();
        assert_eq!(json["category"], "food");
        assert_eq!(json["month"], "2024-01");
        assert_eq!(json["isOverBudget"], false);
    }

    proptest! {
        /// Property: remaining + spent always equals the limit.
        #[test]
        fn remaining_plus_spent_equals_limit(limit in 0i64..10_000_000, spent in 0i64..10_000_000) {
            let limit = Decimal::new(limit, 2);
            let spent = Decimal::new(spent, 2);
            let status = BudgetStatus::new(
                Budget::new(UserId::new(), "2024-01".parse().unwrap(), "food", limit).unwrap(),
                spent,
            );
            prop_assert_eq!(status.remaining_amount + status.spent_amount, limit);
        }
    }
}
