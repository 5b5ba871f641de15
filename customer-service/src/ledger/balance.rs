//! Carry-over arithmetic. Pure functions, no I/O.

use rust_decimal::Decimal;

use super::{Ledger, LedgerError, Period};
use crate::models::Customer;

/// `"2024-01"` → `"2023-12"`.
pub fn previous_period_key(key: &str) -> Result<String, LedgerError> {
    let period: Period = key.parse()?;
    Ok(period.previous().to_string())
}

/// Unpaid remainder of the period before `period`; zero when that row is fully paid
/// or does not exist.
pub fn previous_balance(ledger: &Ledger, period: Period) -> Decimal {
    ledger
        .get(period.previous())
        .map(|entry| entry.carry_over())
        .unwrap_or(Decimal::ZERO)
}

/// Previous balance plus the customer's current monthly fee.
pub fn total_due(customer: &Customer, period: Period) -> Decimal {
    previous_balance(&customer.ledger, period) + customer.monthly_fee
}

/// Read-only snapshot of what a period looks like now, whether or not a row exists.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    pub month: Period,
    pub previous_balance: Decimal,
    pub monthly_fee: Decimal,
    pub total_due: Decimal,
    pub paid: Decimal,
    pub remaining: Decimal,
    pub fully_paid: bool,
    pub initialized: bool,
}

pub fn balance_view(customer: &Customer, period: Period) -> BalanceView {
    let previous_balance = previous_balance(&customer.ledger, period);
    let total_due = previous_balance + customer.monthly_fee;
    let paid = customer
        .ledger
        .get(period)
        .map(|entry| entry.paid)
        .unwrap_or(Decimal::ZERO);
    let remaining = (total_due - paid).max(Decimal::ZERO);

    BalanceView {
        month: period,
        previous_balance,
        monthly_fee: customer.monthly_fee,
        total_due,
        paid,
        remaining,
        fully_paid: remaining.is_zero(),
        initialized: customer.ledger.contains(period),
    }
}
