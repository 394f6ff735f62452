use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub id: i64,
    pub month_id: i64,
    pub category_id: i64,
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub expected: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActualLine {
    pub id: i64,
    pub budget_line_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub actual: Decimal,
}

/// Budget line joined with its category and (if recorded) actual, the shape
/// every read path works from. A line with no actual yet carries
/// `actual_amount = 0` and `actual_id = None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub id: i64,
    pub month_id: i64,
    pub category_id: i64,
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub expected: Decimal,
    pub category_name: String,
    pub category_color: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub actual_amount: Decimal,
    pub actual_id: Option<i64>,
}

/// Rejects negative amounts and settles the value at cent precision,
/// half-up, before it reaches storage.
pub fn normalize_amount(field: &'static str, value: Decimal) -> Result<Decimal, DomainError> {
    if value < Decimal::ZERO {
        return Err(DomainError::NegativeAmount { field, value });
    }

    Ok(value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

pub fn require_text(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::EmptyField(field));
    }

    Ok(trimmed.to_string())
}
