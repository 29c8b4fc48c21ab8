//! Derived analysis: statistics, anomalies, health, advisories, trend chart.

pub mod anomaly;
pub mod chart;
pub mod health;
pub mod recommendations;
pub mod statistics;
