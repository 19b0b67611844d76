//! Month-over-month spending trend.
//!
//! The trend compares only the first and last month of the window. It is not
//! a regression: an unusual first or last month moves the result.

use std::collections::BTreeMap;

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tally_core::{Amount, Month, ratio, round2};
use tally_ledger::Transaction;

/// Default trailing window, in months.
pub const DEFAULT_TREND_MONTHS: u32 = 6;

/// Change (in percent) beyond which spending counts as moving.
const TREND_THRESHOLD: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl Trend {
    /// Strictly above +10% increases, strictly below -10% decreases.
    pub fn classify(change_percentage: Decimal) -> Self {
        let threshold = Decimal::from(TREND_THRESHOLD);
        if change_percentage > threshold {
            Self::Increasing
        } else if change_percentage < -threshold {
            Self::Decreasing
        } else {
            Self::Stable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySpending {
    pub month: Month,
    pub total_spent: Amount,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub trend: Trend,
    pub change_percentage: Decimal,
    pub change_amount: Amount,
    pub average_monthly_spending: Amount,
    pub first_month: Option<Month>,
    pub last_month: Option<Month>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingTrends {
    pub months: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub monthly_trends: Vec<MonthlySpending>,
    pub trend_analysis: TrendAnalysis,
}

/// Compare the first and last entries of chronologically sorted months.
pub fn analyze_trend(monthly: &[MonthlySpending]) -> TrendAnalysis {
    let (first, last) = match monthly {
        [first, .., last] => (first, last),
        _ => {
            return TrendAnalysis {
                trend: Trend::InsufficientData,
                change_percentage: Decimal::ZERO,
                change_amount: Decimal::ZERO,
                average_monthly_spending: monthly
                    .first()
                    .map_or(Decimal::ZERO, |m| m.total_spent),
                first_month: monthly.first().map(|m| m.month),
                last_month: monthly.first().map(|m| m.month),
            };
        }
    };

    let change_amount = last.total_spent - first.total_spent;
    // Classify on the exact change; only the reported figure is rounded.
    let raw_change = ratio(change_amount, first.total_spent) * Decimal::ONE_HUNDRED;
    let total: Amount = monthly.iter().map(|m| m.total_spent).sum();

    TrendAnalysis {
        trend: Trend::classify(raw_change),
        change_percentage: round2(raw_change),
        change_amount,
        average_monthly_spending: round2(ratio(total, Decimal::from(monthly.len()))),
        first_month: Some(first.month),
        last_month: Some(last.month),
    }
}

/// Debit totals per month over the `months` before `now`, with the trend.
pub fn spending_trends(transactions: &[Transaction], months: u32, now: DateTime<Utc>) -> SpendingTrends {
    let start_date = now.checked_sub_months(Months::new(months)).unwrap_or(now);

    let mut by_month: BTreeMap<Month, (Amount, usize)> = BTreeMap::new();
    for txn in transactions
        .iter()
        .filter(|t| t.is_debit() && t.posted_at >= start_date && t.posted_at <= now)
    {
        let entry = by_month
            .entry(Month::of(txn.posted_at))
            .or_insert((Decimal::ZERO, 0));
        entry.0 += txn.magnitude();
        entry.1 += 1;
    }

    let monthly_trends: Vec<MonthlySpending> = by_month
        .into_iter()
        .map(|(month, (total_spent, transaction_count))| MonthlySpending {
            month,
            total_spent,
            transaction_count,
        })
        .collect();

    SpendingTrends {
        months,
        start_date,
        end_date: now,
        trend_analysis: analyze_trend(&monthly_trends),
        monthly_trends,
    }
}
