//! Fixed-allocation portfolio ledger
//!
//! Tracks buy-and-hold portfolios of equities or option contracts: the budget
//! of each holding is locked into a quantity on the allocation date, and the
//! portfolio is then valued on every trading date of the window.

pub mod cache;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod errors;
pub mod export;
pub mod ledger;
pub mod prices;
pub mod render;
pub mod server;
pub mod yahoo_finance;
