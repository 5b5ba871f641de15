use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::{Customer, CustomerStatus};

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("negative"));
    }
    Ok(())
}

fn normalize_email(email: String) -> Option<String> {
    let email = email.trim().to_lowercase();
    (!email.is_empty()).then_some(email)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    #[validate(custom(function = "not_blank"))]
    pub full_name: String,
    #[validate(custom(function = "not_blank"))]
    pub phone_number: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub address: String,
    pub village_id: Option<String>,
    pub zone_id: Option<String>,
    #[validate(custom(function = "non_negative"))]
    pub monthly_fee: Option<Decimal>,
    pub status: Option<CustomerStatus>,
}

impl CreateCustomerRequest {
    pub fn into_customer(self) -> Customer {
        let mut customer = Customer::new(
            self.full_name.trim(),
            self.phone_number.trim(),
            self.address.trim(),
        );
        customer.email = self.email.and_then(normalize_email);
        customer.village_id = self.village_id;
        customer.zone_id = self.zone_id;
        customer.monthly_fee = self.monthly_fee.unwrap_or(Decimal::ZERO);
        customer.status = self.status.unwrap_or_default();
        customer
    }
}

/// Partial update of the non-ledger fields. Absent fields, `zoneId` included, keep their
/// stored value.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    #[validate(custom(function = "not_blank"))]
    pub full_name: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub phone_number: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub address: Option<String>,
    pub village_id: Option<String>,
    pub zone_id: Option<String>,
    #[validate(custom(function = "non_negative"))]
    pub monthly_fee: Option<Decimal>,
    pub status: Option<CustomerStatus>,
}

impl UpdateCustomerRequest {
    pub fn apply(self, customer: &mut Customer) {
        if let Some(full_name) = self.full_name {
            customer.full_name = full_name.trim().to_string();
        }
        if let Some(phone_number) = self.phone_number {
            customer.phone_number = phone_number.trim().to_string();
        }
        if let Some(email) = self.email {
            customer.email = normalize_email(email);
        }
        if let Some(address) = self.address {
            customer.address = address.trim().to_string();
        }
        if let Some(village_id) = self.village_id {
            customer.village_id = Some(village_id);
        }
        if let Some(zone_id) = self.zone_id {
            customer.zone_id = Some(zone_id);
        }
        if let Some(monthly_fee) = self.monthly_fee {
            customer.monthly_fee = monthly_fee;
        }
        if let Some(status) = self.status {
            customer.status = status;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStats {
    pub total_customers: u64,
    pub active_customers: u64,
    pub pending_payments: u64,
}
