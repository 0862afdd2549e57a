// Analyzer module: aggregates submodules for different aspects of analysis.

pub mod recommend;
pub mod robust;
pub mod summary;

// Re-export the engine for ease of use.
pub use summary::{AnalyticsEngine, AnalyticsRequest};
