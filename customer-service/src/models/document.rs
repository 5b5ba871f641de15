//! Stored and wire shape of a customer.
//!
//! Older consumers read three views of the same payment state: `monthlyPayments` (one row
//! per period), the legacy `payments` map keyed by period, and `paymentHistory` (receipts).
//! All three are rendered from [`Ledger`] on write, so they agree by construction. On read
//! they are folded back into one ledger: `monthlyPayments` wins, `payments` keys with no
//! row are lifted, and `paymentHistory` supplies receipt data.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::customer::{Customer, CustomerStatus};
use crate::ledger::{Ledger, LedgerEntry, PaymentMethod, Period, Receipt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub village_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub monthly_fee: Decimal,
    #[serde(default)]
    pub status: CustomerStatus,
    #[serde(default)]
    pub payment_history: Vec<PaymentHistoryEntry>,
    #[serde(default)]
    pub monthly_payments: Vec<MonthlyPaymentRow>,
    #[serde(default)]
    pub payments: BTreeMap<Period, LegacyPayment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPaymentRow {
    pub month: Period,
    pub date: DateTime<Utc>,
    pub monthly_fee: Decimal,
    #[serde(default)]
    pub previous_balance: Decimal,
    #[serde(default)]
    pub paid: Decimal,
    pub remaining: Decimal,
    #[serde(default)]
    pub fully_paid: bool,
    #[serde(default)]
    pub paid_date: Option<DateTime<Utc>>,
    pub total_due: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPayment {
    #[serde(default)]
    pub paid: Decimal,
    #[serde(default)]
    pub remaining: Option<Decimal>,
    #[serde(default)]
    pub fully_paid: bool,
    #[serde(default)]
    pub paid_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub previous_balance: Decimal,
    #[serde(default)]
    pub total_due: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHistoryEntry {
    pub month: Period,
    pub amount: Decimal,
    #[serde(default)]
    pub paid: Decimal,
    #[serde(default)]
    pub paid_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl From<&LedgerEntry> for MonthlyPaymentRow {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            month: entry.month,
            date: entry.date,
            monthly_fee: entry.monthly_fee,
            previous_balance: entry.previous_balance,
            paid: entry.paid,
            remaining: entry.remaining(),
            fully_paid: entry.is_fully_paid(),
            paid_date: entry.paid_date,
            total_due: entry.total_due(),
        }
    }
}

impl From<&LedgerEntry> for LegacyPayment {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            paid: entry.paid,
            remaining: Some(entry.remaining()),
            fully_paid: entry.is_fully_paid(),
            paid_date: entry.paid_date,
            date: Some(entry.date),
            previous_balance: entry.previous_balance,
            total_due: Some(entry.total_due()),
        }
    }
}

impl PaymentHistoryEntry {
    fn from_entry(entry: &LedgerEntry) -> Option<Self> {
        entry.receipt.as_ref().map(|receipt| Self {
            month: entry.month,
            amount: receipt.amount,
            paid: entry.paid,
            paid_date: entry.paid_date,
            method: receipt.method,
            date: Some(receipt.date),
        })
    }

    fn receipt(&self, fallback: DateTime<Utc>) -> Receipt {
        Receipt {
            amount: self.amount,
            method: self.method,
            date: self.date.or(self.paid_date).unwrap_or(fallback),
        }
    }
}

/// A stored `fullyPaid` flag is honoured even when the stored `paid` falls short.
fn settled_paid(paid: Decimal, fully_paid: bool, total_due: Decimal) -> Decimal {
    if fully_paid {
        paid.max(total_due)
    } else {
        paid
    }
}

impl MonthlyPaymentRow {
    fn into_entry(self) -> LedgerEntry {
        let mut entry =
            LedgerEntry::open(self.month, self.date, self.monthly_fee, self.previous_balance);
        entry.paid = settled_paid(self.paid, self.fully_paid, entry.total_due());
        entry.paid_date = self.paid_date;
        entry
    }
}

impl LegacyPayment {
    fn into_entry(self, month: Period, customer_fee: Decimal, fallback: DateTime<Utc>) -> LedgerEntry {
        let fee = self
            .total_due
            .map(|total| (total - self.previous_balance).max(Decimal::ZERO))
            .unwrap_or(customer_fee);
        let date = self.date.or(self.paid_date).unwrap_or(fallback);

        let mut entry = LedgerEntry::open(month, date, fee, self.previous_balance);
        entry.paid = settled_paid(self.paid, self.fully_paid, entry.total_due());
        entry.paid_date = self.paid_date;
        entry
    }
}

impl From<Customer> for CustomerDocument {
    fn from(customer: Customer) -> Self {
        let ledger = &customer.ledger;

        Self {
            monthly_payments: ledger.entries().map(MonthlyPaymentRow::from).collect(),
            payments: ledger
                .entries()
                .map(|entry| (entry.month, LegacyPayment::from(entry)))
                .collect(),
            payment_history: ledger
                .entries()
                .filter_map(PaymentHistoryEntry::from_entry)
                .collect(),
            id: customer.id,
            full_name: customer.full_name,
            phone_number: customer.phone_number,
            email: customer.email,
            address: customer.address,
            village_id: customer.village_id,
            zone_id: customer.zone_id,
            monthly_fee: customer.monthly_fee,
            status: customer.status,
            created_at: customer.created_at,
            updated_at: customer.updated_at,
        }
    }
}

impl From<CustomerDocument> for Customer {
    fn from(doc: CustomerDocument) -> Self {
        let fallback = doc.updated_at;
        let mut ledger = Ledger::new();

        for (month, legacy) in doc.payments {
            ledger.upsert(legacy.into_entry(month, doc.monthly_fee, fallback));
        }
        for row in doc.monthly_payments {
            ledger.upsert(row.into_entry());
        }
        for history in doc.payment_history {
            let receipt = history.receipt(fallback);
            match ledger.get_mut(history.month) {
                Some(entry) => entry.receipt = Some(receipt),
                None => {
                    let previous_balance = (history.amount - doc.monthly_fee).max(Decimal::ZERO);
                    let mut entry = LedgerEntry::open(
                        history.month,
                        receipt.date,
                        doc.monthly_fee,
                        previous_balance,
                    );
                    entry.paid = history.paid;
                    entry.paid_date = history.paid_date;
                    entry.receipt = Some(receipt);
                    ledger.upsert(entry);
                }
            }
        }

        Self {
            id: doc.id,
            full_name: doc.full_name,
            phone_number: doc.phone_number,
            email: doc.email,
            address: doc.address,
            village_id: doc.village_id,
            zone_id: doc.zone_id,
            monthly_fee: doc.monthly_fee,
            status: doc.status,
            ledger,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}
