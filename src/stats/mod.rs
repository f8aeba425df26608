//! Statistics for client sessions

pub mod metrics;

pub use metrics::SessionStats;
