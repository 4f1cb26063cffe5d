//! The cash ledger.
//!
//! Append-only income/expense entries, logically independent of
//! scheduling but stamped by the same injected clock. Daily revenue is
//! income-only; expenses are recorded but never subtracted (net cash
//! flow is a different query this engine does not define).

use chrono::NaiveDate;
use tracing::info;

use crate::domain::{CashTransaction, TransactionId, TransactionKind};
use crate::store::{Collection, Studio};

impl Studio {
    /// All transactions in insertion order.
    pub fn transactions(&self) -> Vec<CashTransaction> {
        self.read().transactions.clone()
    }

    /// Append a cash book entry, stamped with the injected clock.
    pub fn add_transaction(
        &self,
        kind: TransactionKind,
        amount: f64,
        description: impl Into<String>,
    ) -> CashTransaction {
        let transaction = CashTransaction {
            id: TransactionId(format!("txn-{}", self.ids.next_id())),
            kind,
            amount,
            date: self.clock.now(),
            description: description.into(),
        };
        let mut state = self.write();
        state.transactions.push(transaction.clone());
        self.persist(&state, &[Collection::Transactions]);
        info!(
            transaction = %transaction.id,
            kind = ?kind,
            amount,
            "transaction recorded"
        );
        transaction
    }

    /// Sum of income amounts whose timestamp falls on the given UTC
    /// calendar day.
    pub fn daily_revenue(&self, date: NaiveDate) -> f64 {
        self.read()
            .transactions
            .iter()
            .filter(|t| t.kind == TransactionKind::Income)
            .filter(|t| t.date.date_naive() == date)
            .map(|t| t.amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{FixedClock, MemoryStorage, SequentialSource};
    use crate::store::{Studio, StudioConfig};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn studio_with_clock() -> (Studio, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at(
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        ));
        let studio = Studio::open(
            StudioConfig::default(),
            Box::new(MemoryStorage::new()),
            Box::new(SharedClock(clock.clone())),
            Box::new(SequentialSource::new("id")),
        )
        .unwrap();
        (studio, clock)
    }

    struct SharedClock(Arc<FixedClock>);
    impl crate::env::Clock for SharedClock {
        fn now(&self) -> chrono::DateTime<Utc> {
            self.0.now()
        }
    }

    #[test]
    fn test_daily_revenue_sums_income_for_the_day() {
        let (studio, clock) = studio_with_clock();
        studio.add_transaction(TransactionKind::Income, 500.0, "Manicure");
        studio.add_transaction(TransactionKind::Income, 200.0, "Design");
        clock.advance(Duration::days(1));
        studio.add_transaction(TransactionKind::Income, 999.0, "next day");

        let june_first = chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(studio.daily_revenue(june_first), 700.0);
        assert_eq!(
            studio.daily_revenue(chrono::NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()),
            999.0
        );
        assert_eq!(
            studio.daily_revenue(chrono::NaiveDate::from_ymd_opt(2025, 6, 3).unwrap()),
            0.0
        );
    }

    #[test]
    fn test_expenses_never_reduce_revenue() {
        let (studio, _clock) = studio_with_clock();
        studio.add_transaction(TransactionKind::Income, 500.0, "Manicure");
        studio.add_transaction(TransactionKind::Expense, 300.0, "supplies");

        let june_first = chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(studio.daily_revenue(june_first), 500.0);
        assert_eq!(studio.transactions().len(), 2);
    }

    #[test]
    fn test_transactions_keep_insertion_order() {
        let (studio, _clock) = studio_with_clock();
        studio.add_transaction(TransactionKind::Income, 1.0, "a");
        studio.add_transaction(TransactionKind::Expense, 2.0, "b");
        let all = studio.transactions();
        assert_eq!(all[0].description, "a");
        assert_eq!(all[1].description, "b");
        assert!(all[0].id != all[1].id);
    }
}
