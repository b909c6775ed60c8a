pub mod alerts;
pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod exchange;
pub mod helpers;
pub mod indicators;
pub mod manager;
pub mod models;
pub mod services;
pub mod strategy;
pub mod telegram;

pub use error::{Error, EvalError, Result};
