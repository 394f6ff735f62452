use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::month::MonthState;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid month transition from {from:?} to {to:?}")]
    InvalidMonthTransition { from: MonthState, to: MonthState },
    #[error("{field} must not be negative, got {value}")]
    NegativeAmount { field: &'static str, value: Decimal },
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::DomainError;
    use crate::domain::month::MonthState;

    #[test]
    fn messages_name_the_offending_field() {
        let negative = DomainError::NegativeAmount {
            field: "expected",
            value: Decimal::new(-150, 2),
        };
        assert_eq!(negative.to_string(), "expected must not be negative, got -1.50");

        let empty = DomainError::EmptyField("label");
        assert_eq!(empty.to_string(), "label must not be empty");
    }

    #[test]
    fn transition_error_reports_both_states() {
        let error = DomainError::InvalidMonthTransition {
            from: MonthState::Finalized,
            to: MonthState::Open,
        };
        assert!(error.to_string().contains("Finalized"));
        assert!(error.to_string().contains("Open"));
    }
}
