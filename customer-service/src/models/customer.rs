use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::document::CustomerDocument;
use crate::ledger::Ledger;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "active",
            CustomerStatus::Inactive => "inactive",
            CustomerStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A billed household or business.
///
/// The ledger is the only payment state held in memory. The stored and JSON shapes
/// (`monthlyPayments`, `payments`, `paymentHistory`) are produced from it on the way out
/// and folded back into it on the way in, see [`CustomerDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "CustomerDocument", from = "CustomerDocument")]
pub struct Customer {
    pub id: String,
    pub full_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub address: String,
    pub village_id: Option<String>,
    pub zone_id: Option<String>,
    pub monthly_fee: Decimal,
    pub status: CustomerStatus,
    pub ledger: Ledger,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(
        full_name: impl Into<String>,
        phone_number: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            full_name: full_name.into(),
            phone_number: phone_number.into(),
            email: None,
            address: address.into(),
            village_id: None,
            zone_id: None,
            monthly_fee: Decimal::ZERO,
            status: CustomerStatus::Active,
            ledger: Ledger::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
