//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod execution;
pub mod indicator;
pub mod metrics;
pub mod ohlcv;
pub mod pattern;
pub mod portfolio;
pub mod position;
pub mod regime;
pub mod selector;
pub mod signal;
pub mod strategy;
