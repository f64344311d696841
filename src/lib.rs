pub mod auction;
pub mod bidding;
pub mod clock;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod policy;
pub mod scheduler;
pub mod store;
