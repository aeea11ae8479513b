pub mod calendar;
pub mod canonical;
pub mod catalogue;
pub mod chart;
pub mod config;
pub mod grid;
pub mod metrics;
pub mod parser;
pub mod row;
pub mod session;
pub mod velocity;
pub mod warn;
pub mod watcher;
