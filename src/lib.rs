//! Normalization and robust-statistics analytics for secondhand-marketplace
//! phone listings: canonical identity resolution from noisy free text,
//! multi-format price/date parsing, outlier-resistant windowed statistics,
//! and a step-rounded listing-price recommendation.
//!
//! Fetching, storage, and any request routing live outside this crate; the
//! engine operates on an already-retrieved, in-memory slice of records.

pub mod analyzer;
pub mod clock;
pub mod config;
pub mod model;
pub mod normalizer;
pub mod parser;

pub use analyzer::{AnalyticsEngine, AnalyticsRequest};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{SynonymConfig, load_config};
pub use model::{
    CanonicalIdentity, ConditionTier, ListingRecord, MarketSummary, PlatformStat, PriceStatistic,
    Recommendation, TimeWindow, TrendBucket, TrendReport,
};
pub use normalizer::Normalizer;
