//! Row builders shared by the unit tests.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use tally_core::{AccountId, TransactionId};
use tally_ledger::{Transaction, TransactionType};

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

pub fn txn(amount: &str, category: Option<&str>, merchant: Option<&str>, posted_at: DateTime<Utc>) -> Transaction {
    let amount = dec(amount);
    Transaction {
        id: TransactionId::new(),
        account_id: AccountId::new(),
        source_id: None,
        posted_at,
        amount,
        kind: TransactionType::from_amount(amount),
        merchant: merchant.map(str::to_string),
        normalized_name: merchant.unwrap_or_default().to_lowercase(),
        category: category.map(str::to_string),
        raw_category: None,
        notes: None,
        is_manual: true,
    }
}
