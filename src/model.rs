// Core structs: ListingRecord, CanonicalIdentity, analytics outputs
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::price::PriceField;

/// A raw marketplace listing as handed over by the storage collaborator.
/// Every field except the title may be missing or garbage; consumers must
/// skip what they cannot parse instead of defaulting to zero.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingRecord {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<PriceField>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub upload_time: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Coarse condition grade. Each tier owns a disjoint group of canonical
/// condition labels (see `Normalizer::expand_tier`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionTier {
    S,
    A,
    B,
    C,
}

impl ConditionTier {
    pub const ALL: [ConditionTier; 4] = [
        ConditionTier::S,
        ConditionTier::A,
        ConditionTier::B,
        ConditionTier::C,
    ];

    pub fn as_key(&self) -> &'static str {
        match self {
            ConditionTier::S => "s",
            ConditionTier::A => "a",
            ConditionTier::B => "b",
            ConditionTier::C => "c",
        }
    }

    /// Accepts the bare tier letter or the Korean grade spelling ("s급").
    /// Input is expected to be lowercased and whitespace-stripped already.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "s" | "s급" => Some(ConditionTier::S),
            "a" | "a급" => Some(ConditionTier::A),
            "b" | "b급" => Some(ConditionTier::B),
            "c" | "c급" => Some(ConditionTier::C),
            _ => None,
        }
    }
}

/// Canonical identity resolved from free text. `None` fields mean the
/// resolver found nothing, which callers treat as "no filter applied".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CanonicalIdentity {
    pub model: Option<String>,
    pub storage: Option<String>,
    pub condition_tier: Option<ConditionTier>,
}

/// Closed time interval used to bucket records. Both boundaries inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn trailing_days(end: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    /// Window of the same length ending where this one starts.
    pub fn previous(&self) -> Self {
        let span = self.end - self.start;
        Self {
            start: self.start - span,
            end: self.start,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Every calendar day the window touches, in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let last = self.end.date_naive();
        self.start
            .date_naive()
            .iter_days()
            .take_while(move |day| *day <= last)
    }
}

/// Robust summary over one bucket of prices. `average == None` means
/// "no usable data", never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStatistic {
    pub average: Option<i64>,
    pub low: Option<i64>,
    pub high: Option<i64>,
    pub count: usize,
}

/// Per-platform trimmed average over the current window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStat {
    pub platform: String,
    pub average_price: i64,
}

/// Period-over-period market summary for one canonical identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummary {
    pub average_price: i64,
    pub low_price: Option<i64>,
    pub high_price: Option<i64>,
    pub listing_count: usize,
    pub price_change_pct: Option<f64>,
    pub listing_change_pct: Option<f64>,
    pub platform_breakdown: Vec<PlatformStat>,
}

/// One calendar day in a trend window. Present even when no listing was
/// uploaded that day (`count == 0`, `average == None`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendBucket {
    pub date: NaiveDate,
    pub average: Option<i64>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub timeline: Vec<TrendBucket>,
    pub platform_averages: Vec<PlatformStat>,
}

/// Step-rounded listing-price recommendation. All four recommended prices
/// are exact multiples of the 5000-won step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub average_price: i64,
    pub low_price: i64,
    pub high_price: i64,
    pub recommended_price: i64,
    pub recommended_min: i64,
    pub recommended_max: i64,
    pub fast_sale_price: i64,
    pub sample_count: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}
