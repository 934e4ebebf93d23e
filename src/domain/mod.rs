//! Core domain types and logic.

pub mod series;
pub mod signal;
pub mod classifier;
pub mod state;
pub mod detector;
pub mod scheduler;
pub mod simulator;
pub mod error;
