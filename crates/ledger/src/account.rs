use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{AccountId, Amount, UserId};

/// A linked bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub name: String,
    /// Account kind as reported by the institution (`depository`, `credit`, ...).
    #[serde(rename = "type")]
    pub account_type: String,
    pub balance: Amount,
    /// ISO currency code; may be empty when the institution did not report one.
    pub currency: String,
    pub institution_name: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(
        user_id: UserId,
        name: impl Into<String>,
        account_type: impl Into<String>,
        balance: Amount,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            user_id,
            name: name.into(),
            account_type: account_type.into(),
            balance,
            currency: currency.into(),
            institution_name: None,
            last_synced_at: None,
        }
    }

    pub fn with_institution(mut self, institution_name: impl Into<String>) -> Self {
        self.institution_name = Some(institution_name.into());
        self
    }
}
