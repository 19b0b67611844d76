use chrono::{DateTime, Months, Utc};
use tracing::debug;

use tally_core::{Month, UserId};
use tally_ledger::{LedgerReader, TransactionQuery};

use crate::cashflow::{Cashflow, CashflowPeriod, cashflow};
use crate::categories::{SpendingByCategory, spending_by_category};
use crate::error::InsightsResult;
use crate::merchants::{MerchantSpending, top_merchants};
use crate::networth::{NetWorth, net_worth};
use crate::stats::{TransactionStats, transaction_categories, transaction_stats};
use crate::trends::{SpendingTrends, spending_trends};

/// Dashboard figures for one user, read straight from the ledger.
///
/// Methods that depend on "now" have an `_at` variant taking it explicitly.
#[derive(Debug, Clone)]
pub struct InsightsService<R> {
    reader: R,
}

impl<R: LedgerReader> InsightsService<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn cashflow(&self, user_id: UserId, period: CashflowPeriod) -> InsightsResult<Cashflow> {
        self.cashflow_at(user_id, period, Utc::now())
    }

    pub fn cashflow_at(
        &self,
        user_id: UserId,
        period: CashflowPeriod,
        now: DateTime<Utc>,
    ) -> InsightsResult<Cashflow> {
        let query = TransactionQuery::new().between(period.start(now), now);
        let rows = self.reader.transactions(user_id, &query)?;
        debug!(user_id = %user_id, period = period.as_str(), rows = rows.len(), "cashflow");
        Ok(cashflow(&rows, period, now))
    }

    pub fn spending_by_category(&self, user_id: UserId, month: Month) -> InsightsResult<SpendingByCategory> {
        let query = TransactionQuery::new().in_month(month).debits();
        let rows = self.reader.transactions(user_id, &query)?;
        Ok(spending_by_category(&rows, month))
    }

    pub fn net_worth(&self, user_id: UserId) -> InsightsResult<NetWorth> {
        self.net_worth_at(user_id, Utc::now())
    }

    pub fn net_worth_at(&self, user_id: UserId, as_of: DateTime<Utc>) -> InsightsResult<NetWorth> {
        let accounts = self.reader.accounts(user_id)?;
        Ok(net_worth(&accounts, as_of))
    }

    pub fn spending_trends(&self, user_id: UserId, months: u32) -> InsightsResult<SpendingTrends> {
        self.spending_trends_at(user_id, months, Utc::now())
    }

    pub fn spending_trends_at(
        &self,
        user_id: UserId,
        months: u32,
        now: DateTime<Utc>,
    ) -> InsightsResult<SpendingTrends> {
        let start = now.checked_sub_months(Months::new(months)).unwrap_or(now);
        let query = TransactionQuery::new().between(start, now).debits();
        let rows = self.reader.transactions(user_id, &query)?;
        Ok(spending_trends(&rows, months, now))
    }

    pub fn top_merchants(
        &self,
        user_id: UserId,
        month: Option<Month>,
        limit: usize,
    ) -> InsightsResult<Vec<MerchantSpending>> {
        let query = match month {
            Some(month) => TransactionQuery::new().in_month(month).debits(),
            None => TransactionQuery::new().debits(),
        };
        let rows = self.reader.transactions(user_id, &query)?;
        Ok(top_merchants(&rows, month, limit))
    }

    pub fn transaction_stats(
        &self,
        user_id: UserId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> InsightsResult<TransactionStats> {
        let query = TransactionQuery {
            from,
            to,
            ..TransactionQuery::default()
        };
        let rows = self.reader.transactions(user_id, &query)?;
        Ok(transaction_stats(&rows, from, to))
    }

    pub fn transaction_categories(&self, user_id: UserId) -> InsightsResult<Vec<String>> {
        let rows = self.reader.transactions(user_id, &TransactionQuery::new())?;
        Ok(transaction_categories(&rows))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::TimeZone;

    use tally_core::{AccountId, BudgetId, TransactionId};
    use tally_ledger::{Account, Budget, BudgetQuery, StoreError, Transaction};

    use super::*;
    use crate::fixtures::{at, txn};

    /// Serves fixed rows and remembers the last query it was asked.
    struct RecordingReader {
        rows: Vec<Transaction>,
        last_query: Mutex<Option<TransactionQuery>>,
    }

    impl RecordingReader {
        fn new(rows: Vec<Transaction>) -> Self {
            Self {
                rows,
                last_query: Mutex::new(None),
            }
        }

        fn last_query(&self) -> TransactionQuery {
            self.last_query.lock().unwrap().clone().unwrap()
        }
    }

    impl LedgerReader for RecordingReader {
        fn account(&self, _: AccountId) -> Result<Option<Account>, StoreError> {
            Ok(None)
        }

        fn accounts(&self, _: UserId) -> Result<Vec<Account>, StoreError> {
            Ok(Vec::new())
        }

        fn transactions(&self, _: UserId, query: &TransactionQuery) -> Result<Vec<Transaction>, StoreError> {
            *self.last_query.lock().unwrap() = Some(query.clone());
            Ok(self.rows.iter().filter(|t| query.matches(t)).cloned().collect())
        }

        fn transaction(&self, _: UserId, _: TransactionId) -> Result<Option<Transaction>, StoreError> {
            Ok(None)
        }

        fn budget(&self, _: UserId, _: BudgetId) -> Result<Option<Budget>, StoreError> {
            Ok(None)
        }

        fn budgets(&self, _: UserId, _: &BudgetQuery) -> Result<Vec<Budget>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn trends_read_only_the_window() {
        let reader = Arc::new(RecordingReader::new(vec![
            txn("-10", Some("food"), Some("Cafe"), at(2023, 1, 10)),
            txn("-20", Some("food"), Some("Cafe"), at(2024, 5, 10)),
            txn("-30", Some("food"), Some("Cafe"), at(2024, 6, 10)),
        ]));
        let service = InsightsService::new(Arc::clone(&reader));
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();

        let trends = service.spending_trends_at(UserId::new(), 6, now).unwrap();
        assert_eq!(trends.monthly_trends.len(), 2);

        let query = reader.last_query();
        assert_eq!(query.from, Some(Utc.with_ymd_and_hms(2023, 12, 30, 0, 0, 0).unwrap()));
        assert_eq!(query.to, Some(now));
        assert_eq!(query.kind, Some(tally_ledger::TransactionType::Debit));
    }

    #[test]
    fn stats_pass_their_bounds_to_the_reader() {
        let reader = Arc::new(RecordingReader::new(vec![
            txn("-10", Some("food"), Some("Cafe"), at(2024, 1, 10)),
            txn("500", Some("income"), None, at(2024, 2, 10)),
        ]));
        let service = InsightsService::new(Arc::clone(&reader));
        let from = at(2024, 2, 1);

        let stats = service.transaction_stats(UserId::new(), Some(from), None).unwrap();
        assert_eq!(stats.total_transactions, 1);

        let query = reader.last_query();
        assert_eq!(query.from, Some(from));
        assert_eq!(query.to, None);
    }
}
