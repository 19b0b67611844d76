//! Net worth from account balances.
//!
//! Balances in different currencies are added together as-is. There is no
//! conversion; the per-currency breakdown is there so callers can tell.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tally_core::{AccountId, Amount};
use tally_ledger::Account;

/// Currency assumed for accounts that report none.
pub const DEFAULT_CURRENCY: &str = "CAD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub id: AccountId,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub balance: Amount,
    pub currency: String,
    pub institution_name: Option<String>,
}

impl From<&Account> for AccountBalance {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            account_type: account.account_type.clone(),
            balance: account.balance,
            currency: currency_of(account).to_string(),
            institution_name: account.institution_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeBalance {
    pub total_balance: Amount,
    pub account_count: usize,
    pub accounts: Vec<AccountBalance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetWorthSummary {
    pub total_networth: Amount,
    pub total_accounts: usize,
    pub currency_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetWorth {
    pub as_of_date: DateTime<Utc>,
    pub summary: NetWorthSummary,
    pub networth_by_type: BTreeMap<String, TypeBalance>,
    pub networth_by_currency: BTreeMap<String, Amount>,
    pub accounts: Vec<AccountBalance>,
}

fn currency_of(account: &Account) -> &str {
    if account.currency.is_empty() {
        DEFAULT_CURRENCY
    } else {
        &account.currency
    }
}

pub fn net_worth(accounts: &[Account], as_of_date: DateTime<Utc>) -> NetWorth {
    let mut by_type: BTreeMap<String, TypeBalance> = BTreeMap::new();
    let mut by_currency: BTreeMap<String, Amount> = BTreeMap::new();

    for account in accounts {
        let group = by_type.entry(account.account_type.clone()).or_default();
        group.total_balance += account.balance;
        group.account_count += 1;
        group.accounts.push(AccountBalance::from(account));

        *by_currency
            .entry(currency_of(account).to_string())
            .or_insert(Decimal::ZERO) += account.balance;
    }

    NetWorth {
        as_of_date,
        summary: NetWorthSummary {
            total_networth: accounts.iter().map(|a| a.balance).sum(),
            total_accounts: accounts.len(),
            currency_count: by_currency.len(),
        },
        networth_by_type: by_type,
        networth_by_currency: by_currency,
        accounts: accounts.iter().map(AccountBalance::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, dec};
    use tally_core::UserId;

    #[test]
    fn sums_across_currencies_without_conversion() {
        let user = UserId::new();
        let accounts = vec![
            Account::new(user, "Chequing", "depository", dec("1500.00"), "CAD"),
            Account::new(user, "Savings", "depository", dec("500.00"), "USD"),
            Account::new(user, "Visa", "credit", dec("-250.00"), ""),
        ];
        let worth = net_worth(&accounts, at(2024, 1, 31));

        assert_eq!(worth.summary.total_networth, dec("1750.00"));
        assert_eq!(worth.summary.total_accounts, 3);
        assert_eq!(worth.summary.currency_count, 2);
        assert_eq!(worth.networth_by_currency["CAD"], dec("1250.00"));
        assert_eq!(worth.networth_by_currency["USD"], dec("500.00"));

        let depository = &worth.networth_by_type["depository"];
        assert_eq!(depository.total_balance, dec("2000.00"));
        assert_eq!(depository.account_count, 2);
        assert_eq!(worth.networth_by_type["credit"].accounts[0].currency, "CAD");
    }

    #[test]
    fn no_accounts_is_zero() {
        let worth = net_worth(&[], at(2024, 1, 31));
        assert_eq!(worth.summary, NetWorthSummary::default());
        assert!(worth.networth_by_type.is_empty());
    }
}
