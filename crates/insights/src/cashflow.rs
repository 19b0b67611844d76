//! Monthly income vs expenses over a trailing period.

use std::collections::BTreeMap;

use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tally_core::{Amount, Month, ratio};
use tally_ledger::{Transaction, TransactionType};

/// Trailing window for cashflow queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CashflowPeriod {
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    SixMonths,
    #[default]
    #[serde(rename = "12months")]
    TwelveMonths,
    #[serde(rename = "all")]
    All,
}

impl CashflowPeriod {
    /// Parse a period keyword; anything unrecognized means twelve months.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "3months" => Self::ThreeMonths,
            "6months" => Self::SixMonths,
            "all" => Self::All,
            _ => Self::TwelveMonths,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThreeMonths => "3months",
            Self::SixMonths => "6months",
            Self::TwelveMonths => "12months",
            Self::All => "all",
        }
    }

    /// First instant covered when the window ends at `now`.
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let months = match self {
            Self::ThreeMonths => 3,
            Self::SixMonths => 6,
            Self::TwelveMonths => 12,
            Self::All => return all_time_floor(),
        };
        now.checked_sub_months(Months::new(months))
            .unwrap_or_else(all_time_floor)
    }
}

/// Earliest date the `all` period looks at.
fn all_time_floor() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCashflow {
    pub month: Month,
    pub income: Amount,
    pub expenses: Amount,
    pub net: Amount,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashflowSummary {
    pub total_income: Amount,
    pub total_expenses: Amount,
    pub net_cashflow: Amount,
    pub average_monthly_income: Amount,
    pub average_monthly_expenses: Amount,
    pub average_monthly_net: Amount,
    pub month_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cashflow {
    pub period: CashflowPeriod,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub summary: CashflowSummary,
    pub monthly_data: Vec<MonthlyCashflow>,
}

/// Cashflow for `period` ending at `now`.
///
/// Months with no transactions are absent from `monthly_data` and do not
/// count toward the averages.
pub fn cashflow(transactions: &[Transaction], period: CashflowPeriod, now: DateTime<Utc>) -> Cashflow {
    let start_date = period.start(now);

    let mut by_month: BTreeMap<Month, MonthlyCashflow> = BTreeMap::new();
    for txn in transactions
        .iter()
        .filter(|t| t.posted_at >= start_date && t.posted_at <= now)
    {
        let month = Month::of(txn.posted_at);
        let entry = by_month.entry(month).or_insert_with(|| MonthlyCashflow {
            month,
            income: Decimal::ZERO,
            expenses: Decimal::ZERO,
            net: Decimal::ZERO,
            transaction_count: 0,
        });
        match txn.kind {
            TransactionType::Credit => entry.income += txn.amount,
            TransactionType::Debit => entry.expenses += txn.magnitude(),
        }
        entry.transaction_count += 1;
    }

    let monthly_data: Vec<MonthlyCashflow> = by_month
        .into_values()
        .map(|mut m| {
            m.net = m.income - m.expenses;
            m
        })
        .collect();

    let total_income: Amount = monthly_data.iter().map(|m| m.income).sum();
    let total_expenses: Amount = monthly_data.iter().map(|m| m.expenses).sum();
    let net_cashflow = total_income - total_expenses;
    let months = Decimal::from(monthly_data.len());

    Cashflow {
        period,
        start_date,
        end_date: now,
        summary: CashflowSummary {
            total_income,
            total_expenses,
            net_cashflow,
            average_monthly_income: ratio(total_income, months),
            average_monthly_expenses: ratio(total_expenses, months),
            average_monthly_net: ratio(net_cashflow, months),
            month_count: monthly_data.len(),
        },
        monthly_data,
    }
}
