use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use service_core::error::AppError;
use validator::{Validate, ValidationError};

use crate::ledger::{LedgerError, PaymentDetails, PaymentMethod, Period, Settle};

fn required<T>(value: Option<T>, message: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::BadRequest(anyhow::anyhow!(message.to_string())))
}

fn period(month: Option<String>, message: &str) -> Result<Period, AppError> {
    Ok(required(month, message)?.parse::<Period>()?)
}

fn valid_period(month: &str) -> Result<(), ValidationError> {
    month
        .parse::<Period>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("period").with_message("Month must be YYYY-MM".into()))
}

fn positive(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(ValidationError::new("positive")
            .with_message(LedgerError::NonPositiveAmount.to_string().into()));
    }
    Ok(())
}

/// RFC 3339, a bare `YYYY-MM-DDTHH:MM:SS` read as UTC, or a plain `YYYY-MM-DD` at
/// midnight UTC.
pub fn parse_date(text: &str) -> Result<DateTime<Utc>, String> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| format!("Invalid date '{text}': expected YYYY-MM-DD or RFC 3339"))
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|text| parse_date(&text).map_err(serde::de::Error::custom))
        .transpose()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitializeMonthRequest {
    #[validate(
        required(message = "Month and date are required"),
        custom(function = "valid_period")
    )]
    pub month: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    #[validate(required(message = "Month and date are required"))]
    pub date: Option<DateTime<Utc>>,
}

impl InitializeMonthRequest {
    pub fn into_parts(self) -> Result<(Period, DateTime<Utc>), AppError> {
        const MESSAGE: &str = "Month and date are required";
        let date = required(self.date, MESSAGE)?;
        Ok((period(self.month, MESSAGE)?, date))
    }
}

/// `paid` is either a flag (`true` settles the total due, `false` records nothing paid)
/// or an explicit amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaidValue {
    Flag(bool),
    Amount(Decimal),
}

impl From<PaidValue> for Settle {
    fn from(value: PaidValue) -> Self {
        match value {
            PaidValue::Flag(true) => Settle::Full,
            PaidValue::Flag(false) => Settle::Amount(Decimal::ZERO),
            PaidValue::Amount(amount) => Settle::Amount(amount),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    #[validate(
        required(message = "Month and paid are required"),
        custom(function = "valid_period")
    )]
    pub month: Option<String>,
    #[validate(required(message = "Month and paid are required"))]
    pub paid: Option<PaidValue>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub paid_date: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
}

impl RecordPaymentRequest {
    pub fn into_parts(self) -> Result<(Period, Settle, PaymentDetails), AppError> {
        const MESSAGE: &str = "Month and paid are required";
        let settle = Settle::from(required(self.paid, MESSAGE)?);
        let details = PaymentDetails {
            paid_date: self.paid_date,
            method: self.method,
        };
        Ok((period(self.month, MESSAGE)?, settle, details))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PartialPaymentRequest {
    #[validate(required(message = "Month is required"), custom(function = "valid_period"))]
    pub month: Option<String>,
    #[validate(
        required(message = "Valid payment amount is required"),
        custom(function = "positive")
    )]
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub paid_date: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
}

impl PartialPaymentRequest {
    pub fn into_parts(self) -> Result<(Period, Decimal, PaymentDetails), AppError> {
        let period = period(self.month, "Month is required")?;
        let amount = self.amount.ok_or(LedgerError::NonPositiveAmount)?;
        let details = PaymentDetails {
            paid_date: self.paid_date,
            method: self.method,
        };
        Ok((period, amount, details))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct MarkAllPaidRequest {
    #[validate(required(message = "Month is required"), custom(function = "valid_period"))]
    pub month: Option<String>,
}

impl MarkAllPaidRequest {
    pub fn into_period(self) -> Result<Period, AppError> {
        period(self.month, "Month is required")
    }
}
