use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tally_core::{Amount, BudgetId, DomainError, DomainResult, Month, UserId};

/// A monthly spending limit for one category.
///
/// The amount spent is never stored here; it is recomputed from transactions
/// whenever a budget is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: BudgetId,
    pub user_id: UserId,
    pub month: Month,
    pub category: String,
    pub limit_amount: Amount,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(
        user_id: UserId,
        month: Month,
        category: impl Into<String>,
        limit_amount: Amount,
    ) -> DomainResult<Self> {
        let category = category.into();
        if category.trim().is_empty() {
            return Err(DomainError::validation("budget category must not be empty"));
        }
        validate_limit(limit_amount)?;

        let now = Utc::now();
        Ok(Self {
            id: BudgetId::new(),
            user_id,
            month,
            category,
            limit_amount,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn set_limit(&mut self, limit_amount: Amount) -> DomainResult<()> {
        validate_limit(limit_amount)?;
        self.limit_amount = limit_amount;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn validate_limit(limit_amount: Amount) -> DomainResult<()> {
    if limit_amount < Decimal::ZERO {
        return Err(DomainError::validation("budget limit must not be negative"));
    }
    Ok(())
}

/// Filter for reading a user's budgets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetQuery {
    pub month: Option<Month>,
    pub category: Option<String>,
}

impl BudgetQuery {
    pub fn matches(&self, budget: &Budget) -> bool {
        self.month.is_none_or(|m| budget.month == m)
            && self.category.as_ref().is_none_or(|c| &budget.category == c)
    }
}
