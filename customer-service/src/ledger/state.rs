//! The per-customer ledger: one authoritative row per billing period.
//!
//! `remaining` and `fully_paid` are derived from `paid` and the row's total due, so they
//! can never disagree with each other or with the projections written to storage.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Period;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    BankTransfer,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
        }
    }
}

/// Receipt metadata kept once a payment has been taken against a period.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// Total due at the time the first payment was recorded.
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub month: Period,
    pub date: DateTime<Utc>,
    pub monthly_fee: Decimal,
    pub previous_balance: Decimal,
    pub paid: Decimal,
    pub paid_date: Option<DateTime<Utc>>,
    pub receipt: Option<Receipt>,
}

impl LedgerEntry {
    /// A fresh, unpaid row.
    pub fn open(
        month: Period,
        date: DateTime<Utc>,
        monthly_fee: Decimal,
        previous_balance: Decimal,
    ) -> Self {
        Self {
            month,
            date,
            monthly_fee,
            previous_balance,
            paid: Decimal::ZERO,
            paid_date: None,
            receipt: None,
        }
    }

    pub fn total_due(&self) -> Decimal {
        self.previous_balance + self.monthly_fee
    }

    /// Never negative; overpayment clamps to zero.
    pub fn remaining(&self) -> Decimal {
        (self.total_due() - self.paid).max(Decimal::ZERO)
    }

    pub fn is_fully_paid(&self) -> bool {
        self.remaining().is_zero()
    }

    /// What this row carries into the following period; fully paid rows carry nothing.
    pub fn carry_over(&self) -> Decimal {
        self.remaining()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: BTreeMap<Period, LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, period: Period) -> Option<&LedgerEntry> {
        self.entries.get(&period)
    }

    pub fn get_mut(&mut self, period: Period) -> Option<&mut LedgerEntry> {
        self.entries.get_mut(&period)
    }

    pub fn contains(&self, period: Period) -> bool {
        self.entries.contains_key(&period)
    }

    /// Insert or replace the row for `entry.month`.
    pub fn upsert(&mut self, entry: LedgerEntry) {
        self.entries.insert(entry.month, entry);
    }

    /// Row for `period`, created with `open` if missing.
    pub fn entry_or_insert_with(
        &mut self,
        period: Period,
        open: impl FnOnce() -> LedgerEntry,
    ) -> &mut LedgerEntry {
        self.entries.entry(period).or_insert_with(open)
    }

    /// Rows in chronological order.
    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    /// Rows strictly after `period`, in chronological order.
    pub fn periods_after(&self, period: Period) -> Vec<Period> {
        self.entries
            .range(period.next()..)
            .map(|(p, _)| *p)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn period(s: &str) -> Period {
        s.parse().unwrap()
    }

    #[test]
    fn test_remaining_clamps_at_zero() {
        let mut entry = LedgerEntry::open(period("2024-03"), Utc::now(), dec!(100), dec!(20));
        assert_eq!(entry.total_due(), dec!(120));
        assert_eq!(entry.remaining(), dec!(120));
        assert!(!entry.is_fully_paid());

        entry.paid = dec!(150);
        assert_eq!(entry.remaining(), Decimal::ZERO);
        assert!(entry.is_fully_paid());
        assert_eq!(entry.carry_over(), Decimal::ZERO);
    }

    #[test]
    fn test_zero_fee_row_is_trivially_paid() {
        let entry = LedgerEntry::open(period("2024-03"), Utc::now(), Decimal::ZERO, Decimal::ZERO);
        assert!(entry.is_fully_paid());
    }

    #[test]
    fn test_upsert_keeps_one_row_per_period() {
        let mut ledger = Ledger::new();
        ledger.upsert(LedgerEntry::open(period("2024-03"), Utc::now(), dec!(100), dec!(0)));
        ledger.upsert(LedgerEntry::open(period("2024-03"), Utc::now(), dec!(50), dec!(0)));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get(period("2024-03")).unwrap().monthly_fee, dec!(50));
    }

    #[test]
    fn test_periods_after_is_ordered() {
        let mut ledger = Ledger::new();
        for p in ["2024-05", "2024-01", "2024-03"] {
            ledger.upsert(LedgerEntry::open(period(p), Utc::now(), dec!(10), dec!(0)));
        }
        assert_eq!(
            ledger.periods_after(period("2024-01")),
            vec![period("2024-03"), period("2024-05")]
        );
        assert!(ledger.periods_after(period("2024-05")).is_empty());
    }

    #[test]
    fn test_payment_method_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::BankTransfer).unwrap(),
            "\"bank_transfer\""
        );
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
    }
}
