//! Error types
//!
//! Runtime conditions (placement exhaustion, missing arena) are never errors;
//! they fall back or skip a cycle. Only setup bugs and purchases surface here.

use thiserror::Error;

use crate::sim::Upgrade;

/// Invalid tuning, detected once at initialization
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a finite, non-negative number (got {value})")]
    InvalidNumber { name: &'static str, value: f32 },
    #[error("{name} must be greater than zero (got {value})")]
    NotPositive { name: &'static str, value: f32 },
    #[error("{name} thresholds must be strictly ascending ({previous} then {next})")]
    UnorderedThresholds {
        name: &'static str,
        previous: u32,
        next: u32,
    },
    #[error("{name} needs at least one threshold")]
    EmptyThresholds { name: &'static str },
    #[error("{name} range is inverted (min {min} > max {max})")]
    InvertedRange {
        name: &'static str,
        min: f32,
        max: f32,
    },
    #[error("population cap {max} is below base population {base}")]
    CapBelowBase { base: u32, max: u32 },
    #[error("buff spawner has no buff kinds to choose from")]
    NoBuffKinds,
    #[error("failed to parse tuning: {0}")]
    Parse(String),
    #[error("failed to read tuning from {path}: {message}")]
    Read { path: String, message: String },
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Market purchase rejected
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseError {
    #[error("no shop session is open")]
    NoMarket,
    #[error("cannot afford upgrade: costs {cost}, balance is {balance}")]
    InsufficientBalance { cost: u32, balance: u32 },
    #[error("upgrade {0:?} is already owned")]
    AlreadyOwned(Upgrade),
    #[error("purchases are only possible during a run")]
    NotPlaying,
}
