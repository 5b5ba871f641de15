//! Ledger transitions: initialize a month, settle it, take partial payments, or force it
//! paid. Each transition recomputes the row's carry-over from the previous period, then
//! re-chains any later rows so every `total_due` keeps reflecting the remainder before it.
//!
//! Persistence is the caller's job; these functions only mutate the in-memory customer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::balance::previous_balance;
use super::{LedgerEntry, LedgerError, PaymentMethod, Period, Receipt};
use crate::models::Customer;

/// How much a settle request pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// Pay exactly the period's total due.
    Full,
    /// Set the paid amount to this value.
    Amount(Decimal),
}

impl Settle {
    fn resolve(self, total_due: Decimal) -> Result<Decimal, LedgerError> {
        match self {
            Settle::Full => Ok(total_due),
            Settle::Amount(amount) if amount < Decimal::ZERO => Err(LedgerError::NegativePaid),
            Settle::Amount(amount) => Ok(amount),
        }
    }
}

/// Optional receipt details supplied with a payment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaymentDetails {
    pub paid_date: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
}

/// Create the row for `period` or refresh an existing one's date and carry-over.
///
/// The paid amount of an existing row is left alone, so calling this twice without a
/// payment in between is a no-op the second time.
pub fn initialize_month(customer: &mut Customer, period: Period, date: DateTime<Utc>) {
    let carry = previous_balance(&customer.ledger, period);
    let fee = customer.monthly_fee;

    let entry = customer
        .ledger
        .entry_or_insert_with(period, || LedgerEntry::open(period, date, fee, carry));
    entry.date = date;
    entry.monthly_fee = fee;
    entry.previous_balance = carry;

    rechain_after(customer, period);
}

/// Set the paid amount for `period`, either to an explicit value or to the total due.
pub fn record_payment(
    customer: &mut Customer,
    period: Period,
    settle: Settle,
    details: PaymentDetails,
    now: DateTime<Utc>,
) -> Result<(), LedgerError> {
    let total_due = previous_balance(&customer.ledger, period) + customer.monthly_fee;
    let paid = settle.resolve(total_due)?;

    apply_payment(customer, period, paid, details, now);
    Ok(())
}

/// Add `amount` on top of whatever has already been paid for `period`.
pub fn record_partial_payment(
    customer: &mut Customer,
    period: Period,
    amount: Decimal,
    details: PaymentDetails,
    now: DateTime<Utc>,
) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount);
    }

    let already_paid = customer
        .ledger
        .get(period)
        .map(|entry| entry.paid)
        .unwrap_or(Decimal::ZERO);

    apply_payment(customer, period, already_paid + amount, details, now);
    Ok(())
}

/// Force `period` to fully paid as of `now`, keeping any recorded payment method.
pub fn mark_paid(customer: &mut Customer, period: Period, now: DateTime<Utc>) {
    let total_due = previous_balance(&customer.ledger, period) + customer.monthly_fee;

    apply_payment(
        customer,
        period,
        total_due,
        PaymentDetails {
            paid_date: Some(now),
            method: None,
        },
        now,
    );

    if let Some(receipt) = customer
        .ledger
        .get_mut(period)
        .and_then(|entry| entry.receipt.as_mut())
    {
        receipt.amount = total_due;
    }
}

fn apply_payment(
    customer: &mut Customer,
    period: Period,
    paid: Decimal,
    details: PaymentDetails,
    now: DateTime<Utc>,
) {
    let carry = previous_balance(&customer.ledger, period);
    let fee = customer.monthly_fee;

    let entry = customer
        .ledger
        .entry_or_insert_with(period, || LedgerEntry::open(period, now, fee, carry));
    entry.monthly_fee = fee;
    entry.previous_balance = carry;
    entry.paid = paid;
    if let Some(paid_date) = details.paid_date {
        entry.paid_date = Some(paid_date);
    }

    let total_due = entry.total_due();
    let receipt = entry.receipt.get_or_insert_with(|| Receipt {
        amount: total_due,
        method: PaymentMethod::default(),
        date: now,
    });
    if let Some(method) = details.method {
        receipt.method = method;
    }

    rechain_after(customer, period);
}

/// Refresh `previous_balance` on every row after `period`, oldest first.
fn rechain_after(customer: &mut Customer, period: Period) {
    for later in customer.ledger.periods_after(period) {
        let carry = previous_balance(&customer.ledger, later);
        if let Some(entry) = customer.ledger.get_mut(later) {
            entry.previous_balance = carry;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn period(s: &str) -> Period {
        s.parse().unwrap()
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()
    }

    fn customer(fee: Decimal) -> Customer {
        let mut customer = Customer::new("Jonas Okafor", "0711111111", "River Lane 2");
        customer.monthly_fee = fee;
        customer
    }

    fn row(customer: &Customer, p: &str) -> LedgerEntry {
        customer.ledger.get(period(p)).cloned().unwrap()
    }

    #[test]
    fn test_initialize_creates_unpaid_row() {
        let mut c = customer(dec!(100));
        initialize_month(&mut c, period("2024-03"), at(1));

        let march = row(&c, "2024-03");
        assert_eq!(march.paid, Decimal::ZERO);
        assert_eq!(march.total_due(), dec!(100));
        assert_eq!(march.remaining(), dec!(100));
        assert!(!march.is_fully_paid());
        assert!(march.receipt.is_none());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut c = customer(dec!(100));
        initialize_month(&mut c, period("2024-03"), at(1));
        let first = c.ledger.clone();
        initialize_month(&mut c, period("2024-03"), at(1));

        assert_eq!(c.ledger, first);
        assert_eq!(c.ledger.len(), 1);
    }

    #[test]
    fn test_initialize_existing_row_keeps_paid() {
        let mut c = customer(dec!(100));
        record_partial_payment(&mut c, period("2024-03"), dec!(30), PaymentDetails::default(), at(2))
            .unwrap();
        initialize_month(&mut c, period("2024-03"), at(5));

        let march = row(&c, "2024-03");
        assert_eq!(march.paid, dec!(30));
        assert_eq!(march.remaining(), dec!(70));
        assert_eq!(march.date, at(5));
    }

    #[test]
    fn test_walkthrough_partial_payments_then_rollover() {
        let mut c = customer(dec!(100));
        initialize_month(&mut c, period("2024-03"), at(1));

        record_partial_payment(&mut c, period("2024-03"), dec!(40), PaymentDetails::default(), at(3))
            .unwrap();
        let march = row(&c, "2024-03");
        assert_eq!((march.paid, march.remaining(), march.is_fully_paid()), (dec!(40), dec!(60), false));

        record_partial_payment(&mut c, period("2024-03"), dec!(60), PaymentDetails::default(), at(4))
            .unwrap();
        let march = row(&c, "2024-03");
        assert_eq!((march.paid, march.remaining(), march.is_fully_paid()), (dec!(100), dec!(0), true));

        initialize_month(&mut c, period("2024-04"), at(30));
        let april = row(&c, "2024-04");
        assert_eq!(april.previous_balance, Decimal::ZERO);
        assert_eq!(april.total_due(), dec!(100));
    }

    #[test]
    fn test_unpaid_remainder_carries_forward() {
        let mut c = customer(dec!(100));
        initialize_month(&mut c, period("2024-03"), at(1));
        record_partial_payment(&mut c, period("2024-03"), dec!(40), PaymentDetails::default(), at(3))
            .unwrap();
        initialize_month(&mut c, period("2024-04"), at(30));

        assert_eq!(row(&c, "2024-04").total_due(), dec!(160));
    }

    #[test]
    fn test_partial_payment_rejects_non_positive() {
        let mut c = customer(dec!(100));
        for amount in [dec!(0), dec!(-5)] {
            assert_eq!(
                record_partial_payment(&mut c, period("2024-03"), amount, PaymentDetails::default(), at(1)),
                Err(LedgerError::NonPositiveAmount)
            );
        }
        assert!(c.ledger.is_empty());
    }

    #[test]
    fn test_partial_payments_accumulate_past_total() {
        let mut c = customer(dec!(50));
        record_partial_payment(&mut c, period("2024-03"), dec!(30), PaymentDetails::default(), at(1))
            .unwrap();
        record_partial_payment(&mut c, period("2024-03"), dec!(45), PaymentDetails::default(), at(2))
            .unwrap();

        let march = row(&c, "2024-03");
        assert_eq!(march.paid, dec!(75));
        assert_eq!(march.remaining(), Decimal::ZERO);
        assert!(march.is_fully_paid());
    }

    #[test]
    fn test_settle_full_pays_total_due() {
        let mut c = customer(dec!(100));
        initialize_month(&mut c, period("2024-02"), at(1));
        initialize_month(&mut c, period("2024-03"), at(1));

        record_payment(
            &mut c,
            period("2024-03"),
            Settle::Full,
            PaymentDetails {
                paid_date: Some(at(10)),
                method: Some(PaymentMethod::Card),
            },
            at(10),
        )
        .unwrap();

        let march = row(&c, "2024-03");
        assert_eq!(march.paid, dec!(200));
        assert!(march.is_fully_paid());
        assert_eq!(march.paid_date, Some(at(10)));
        let receipt = march.receipt.unwrap();
        assert_eq!(receipt.amount, dec!(200));
        assert_eq!(receipt.method, PaymentMethod::Card);
    }

    #[test]
    fn test_settle_amount_overwrites_not_adds() {
        let mut c = customer(dec!(100));
        record_payment(&mut c, period("2024-03"), Settle::Amount(dec!(70)), PaymentDetails::default(), at(1))
            .unwrap();
        record_payment(&mut c, period("2024-03"), Settle::Amount(dec!(20)), PaymentDetails::default(), at(2))
            .unwrap();

        let march = row(&c, "2024-03");
        assert_eq!(march.paid, dec!(20));
        assert_eq!(march.remaining(), dec!(80));
    }

    #[test]
    fn test_settle_rejects_negative_amount() {
        let mut c = customer(dec!(100));
        assert_eq!(
            record_payment(&mut c, period("2024-03"), Settle::Amount(dec!(-1)), PaymentDetails::default(), at(1)),
            Err(LedgerError::NegativePaid)
        );
        assert!(c.ledger.is_empty());
    }

    #[test]
    fn test_first_payment_creates_row_and_receipt() {
        let mut c = customer(dec!(100));
        record_payment(&mut c, period("2024-03"), Settle::Amount(dec!(10)), PaymentDetails::default(), at(7))
            .unwrap();

        let march = row(&c, "2024-03");
        assert_eq!(march.date, at(7));
        let receipt = march.receipt.unwrap();
        assert_eq!(receipt.method, PaymentMethod::Cash);
        assert_eq!(receipt.amount, dec!(100));
        assert_eq!(receipt.date, at(7));
    }

    #[test]
    fn test_later_payment_keeps_receipt_unless_method_given() {
        let mut c = customer(dec!(100));
        let card = PaymentDetails {
            paid_date: None,
            method: Some(PaymentMethod::Card),
        };
        record_partial_payment(&mut c, period("2024-03"), dec!(10), card, at(1)).unwrap();
        record_partial_payment(&mut c, period("2024-03"), dec!(10), PaymentDetails::default(), at(2))
            .unwrap();

        let receipt = row(&c, "2024-03").receipt.unwrap();
        assert_eq!(receipt.method, PaymentMethod::Card);
        assert_eq!(receipt.date, at(1));
    }

    #[test]
    fn test_mark_paid_forces_full_payment() {
        let mut c = customer(dec!(100));
        initialize_month(&mut c, period("2024-02"), at(1));
        record_partial_payment(&mut c, period("2024-03"), dec!(10), PaymentDetails::default(), at(2))
            .unwrap();

        mark_paid(&mut c, period("2024-03"), at(20));

        let march = row(&c, "2024-03");
        assert_eq!(march.paid, dec!(200));
        assert_eq!(march.remaining(), Decimal::ZERO);
        assert!(march.is_fully_paid());
        assert_eq!(march.paid_date, Some(at(20)));
        assert_eq!(march.receipt.unwrap().amount, dec!(200));
    }

    #[test]
    fn test_mark_paid_with_zero_fee_is_trivially_paid() {
        let mut c = customer(Decimal::ZERO);
        mark_paid(&mut c, period("2024-03"), at(1));

        let march = row(&c, "2024-03");
        assert_eq!(march.paid, Decimal::ZERO);
        assert!(march.is_fully_paid());
    }

    #[test]
    fn test_paying_earlier_period_rechains_later_rows() {
        let mut c = customer(dec!(100));
        initialize_month(&mut c, period("2024-03"), at(1));
        initialize_month(&mut c, period("2024-04"), at(30));
        assert_eq!(row(&c, "2024-04").total_due(), dec!(200));

        record_payment(&mut c, period("2024-03"), Settle::Full, PaymentDetails::default(), at(31))
            .unwrap();

        assert_eq!(row(&c, "2024-04").previous_balance, Decimal::ZERO);
        assert_eq!(row(&c, "2024-04").total_due(), dec!(100));
    }

    #[test]
    fn test_rechain_follows_consecutive_rows() {
        let mut c = customer(dec!(10));
        for p in ["2024-01", "2024-02", "2024-03"] {
            initialize_month(&mut c, period(p), at(1));
        }
        assert_eq!(row(&c, "2024-03").total_due(), dec!(30));

        record_payment(&mut c, period("2024-01"), Settle::Full, PaymentDetails::default(), at(2))
            .unwrap();

        assert_eq!(row(&c, "2024-02").total_due(), dec!(10));
        assert_eq!(row(&c, "2024-03").total_due(), dec!(20));
    }

    #[test]
    fn test_remaining_never_negative_across_operations() {
        let mut c = customer(dec!(25));
        record_payment(&mut c, period("2024-03"), Settle::Amount(dec!(500)), PaymentDetails::default(), at(1))
            .unwrap();
        record_partial_payment(&mut c, period("2024-03"), dec!(1), PaymentDetails::default(), at(2))
            .unwrap();
        initialize_month(&mut c, period("2024-04"), at(3));
        mark_paid(&mut c, period("2024-05"), at(4));

        for entry in c.ledger.entries() {
            assert!(entry.remaining() >= Decimal::ZERO);
            assert_eq!(entry.is_fully_paid(), entry.remaining().is_zero());
        }
    }
}
