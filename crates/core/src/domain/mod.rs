pub mod ledger;
pub mod month;
