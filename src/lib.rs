pub mod analysis;
pub mod api;
pub mod backtest;
pub mod charts;
pub mod collector;
pub mod database;
pub mod models;
