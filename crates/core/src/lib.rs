pub mod config;
pub mod dashboard;
pub mod domain;
pub mod errors;

pub use config::{
    AppConfig, ConfigError, ConfigOverrides, DatabaseConfig, LoadOptions, LogFormat,
    LoggingConfig, ServerConfig,
};
pub use dashboard::{build_dashboard, BudgetLineDetail, CategorySummary, DashboardPayload};
pub use domain::ledger::{
    normalize_amount, require_text, ActualLine, BudgetLine, Category, LedgerRow,
};
pub use domain::month::{month_name, next_period, Month, MonthState};
pub use errors::DomainError;
