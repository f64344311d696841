pub mod autobid;
pub mod commands;
pub mod ledger;
pub mod rate_limit;
