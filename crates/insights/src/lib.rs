//! `tally-insights`
//!
//! **Responsibility:** read-time aggregation over the ledger.
//!
//! Every figure here is recomputed from transaction and account rows at call
//! time; nothing is cached or persisted. The computations are plain functions
//! over slices of rows, and [`InsightsService`] / [`BudgetService`] only fetch
//! the rows through a [`LedgerReader`](tally_ledger::LedgerReader) and hand
//! them over.
//!
//! [`TransactionService`] is the one writer here besides budgets: it handles
//! manual entries and edits.
//!
//! Empty data is a valid state: sums over nothing are zero and every division
//! by zero yields zero.

pub mod budgets;
pub mod cashflow;
pub mod categories;
pub mod error;
pub mod merchants;
pub mod networth;
pub mod service;
pub mod stats;
pub mod transactions;
pub mod trends;

#[cfg(test)]
pub(crate) mod fixtures;

pub use budgets::{
    BudgetListQuery, BudgetPage, BudgetService, BudgetStats, BudgetStatus, BudgetSummary,
    NewBudget, Pagination, compute_spent, summarize_budgets,
};
pub use cashflow::{Cashflow, CashflowPeriod, CashflowSummary, MonthlyCashflow, cashflow};
pub use categories::{CategorySpending, CategorySpendingSummary, SpendingByCategory, spending_by_category};
pub use error::{InsightsError, InsightsResult};
pub use merchants::{MerchantSpending, top_merchants};
pub use networth::{AccountBalance, NetWorth, NetWorthSummary, TypeBalance, net_worth};
pub use service::InsightsService;
pub use stats::{CategoryStat, TransactionStats, transaction_categories, transaction_stats};
pub use transactions::{
    NewTransaction, TransactionListQuery, TransactionPage, TransactionService, TransactionUpdate,
};
pub use trends::{MonthlySpending, SpendingTrends, Trend, TrendAnalysis, analyze_trend, spending_trends};
