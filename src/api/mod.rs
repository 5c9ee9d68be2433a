pub mod health;
pub mod latency;
pub mod routes;

pub use health::CycleStats;
pub use latency::CycleLatency;
