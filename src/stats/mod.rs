//! Stats module - Quartile statistics

mod calculator;

pub use calculator::{Quartiles, StatsCalculator};
