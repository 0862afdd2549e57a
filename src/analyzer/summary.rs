//! Windowed market analytics: filter records by canonical identity, split
//! them into current/previous windows, and aggregate with the robust
//! statistics. Every call is a pure function over the record slice handed
//! in; the engine itself only carries the read-only tables and two clocks.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::analyzer::robust::{percent_change, summarize_prices, trimmed_mean};
use crate::clock::{Clock, SystemClock};
use crate::config::SynonymConfig;
use crate::model::{
    CanonicalIdentity, ConditionTier, ListingRecord, MarketSummary, PlatformStat, TimeWindow,
    TrendBucket, TrendReport,
};
use crate::normalizer::Normalizer;
use crate::parser::price::parse_price;
use crate::parser::time::parse_upload_time;

pub const DEFAULT_WINDOW_DAYS: i64 = 7;
pub const MAX_SUMMARY_DAYS: i64 = 90;
pub const MAX_TREND_DAYS: i64 = 30;

const MEAN_FRACTION: f64 = 0.10;
const RANGE_FRACTION: f64 = 0.10;

/// Platform bucket for listings that carry no platform field.
const FALLBACK_PLATFORM: &str = "기타";

/// Variant markers that disqualify a listing when the keyword asks for a
/// base iPhone ("아이폰 15" must not match "아이폰 15 프로"). Compared on
/// folded text, so both scripts are covered.
const VARIANT_MARKERS: [&str; 4] = ["mini", "pro", "plus", "max"];

/// Raw request parameters as the presentation layer received them. Invalid
/// values fall back to documented defaults instead of erroring.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsRequest {
    pub keyword: Option<String>,
    pub model: Option<String>,
    pub storage: Option<String>,
    pub condition: Option<String>,
    pub platform: Option<String>,
    pub days: Option<String>,
}

/// `raw` parsed as a positive day count, clamped to `max`; anything else
/// falls back to `default`.
pub fn parse_window_days(raw: Option<&str>, default: i64, max: i64) -> i64 {
    match raw.and_then(|value| value.trim().parse::<i64>().ok()) {
        Some(days) if days > 0 => days.min(max),
        _ => default,
    }
}

/// A record that survived price and upload-time parsing, with its canonical
/// identity resolved.
#[derive(Debug, Clone)]
pub struct ParsedListing {
    pub price: i64,
    pub uploaded_at: DateTime<Utc>,
    pub platform: String,
    pub identity: CanonicalIdentity,
    folded_text: String,
    title_lower: String,
}

/// Resolved filter built from an [`AnalyticsRequest`].
#[derive(Debug, Clone)]
struct ListingFilter {
    model: Option<String>,
    storage: Option<String>,
    tiers: Vec<ConditionTier>,
    platforms: Vec<String>,
    keyword: Option<String>,
    base_iphone_guard: bool,
    exclude_keywords: Vec<String>,
}

impl ListingFilter {
    fn matches(&self, listing: &ParsedListing) -> bool {
        for excluded in &self.exclude_keywords {
            if listing.title_lower.contains(excluded.as_str()) {
                return false;
            }
        }
        if let Some(model) = &self.model {
            if listing.identity.model.as_deref() != Some(model.as_str()) {
                return false;
            }
        }
        if let Some(storage) = &self.storage {
            if listing.identity.storage.as_deref() != Some(storage.as_str()) {
                return false;
            }
        }
        if !self.tiers.is_empty() {
            match listing.identity.condition_tier {
                Some(tier) if self.tiers.contains(&tier) => {}
                _ => return false,
            }
        }
        if !self.platforms.is_empty() && !self.platforms.contains(&listing.platform) {
            return false;
        }
        if let Some(keyword) = &self.keyword {
            if !listing.folded_text.contains(keyword.as_str()) {
                return false;
            }
            if self.base_iphone_guard
                && VARIANT_MARKERS
                    .iter()
                    .any(|marker| listing.folded_text.contains(marker))
            {
                return false;
            }
        }
        true
    }
}

pub struct AnalyticsEngine {
    normalizer: Normalizer,
    reference_clock: Box<dyn Clock>,
    wall_clock: Box<dyn Clock>,
}

impl AnalyticsEngine {
    pub fn new(config: &SynonymConfig) -> Self {
        Self::with_clocks(config, Box::new(SystemClock), Box::new(SystemClock))
    }

    /// Window boundaries come from `reference`, relative upload phrases from
    /// `wall`. They are deliberately separate (see `clock.rs`).
    pub fn with_clocks(
        config: &SynonymConfig,
        reference: Box<dyn Clock>,
        wall: Box<dyn Clock>,
    ) -> Self {
        Self {
            normalizer: Normalizer::new(config),
            reference_clock: reference,
            wall_clock: wall,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Drops records with unusable price or upload time and resolves each
    /// survivor's canonical identity. Model and storage fall back to the
    /// title (and raw capacity numbers) when the dedicated fields are absent.
    pub fn prepare(&self, records: &[ListingRecord]) -> Vec<ParsedListing> {
        let wall_now = self.wall_clock.now();
        let parsed: Vec<ParsedListing> = records
            .iter()
            .filter_map(|record| {
                let price = record.price.as_ref().and_then(parse_price)?;
                let uploaded_at = record
                    .upload_time
                    .as_deref()
                    .and_then(|raw| parse_upload_time(raw, wall_now))?;

                let model = record
                    .model_name
                    .as_deref()
                    .and_then(|text| self.normalizer.canonicalize_model(text))
                    .or_else(|| self.normalizer.canonicalize_model(&record.title));
                let description = record.description.as_deref().unwrap_or("");
                let storage = record
                    .storage
                    .as_deref()
                    .and_then(|text| self.normalizer.resolve_storage(text))
                    .or_else(|| self.normalizer.canonicalize_storage(&record.title))
                    .or_else(|| {
                        self.normalizer
                            .infer_storage_from_text(&[&record.title, description])
                    });
                let condition_tier = record
                    .condition
                    .as_deref()
                    .and_then(|text| self.normalizer.canonicalize_condition(text));

                let platform = record
                    .platform
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .unwrap_or(FALLBACK_PLATFORM)
                    .to_string();

                let searchable = format!(
                    "{} {} {}",
                    record.title,
                    description,
                    record.model_name.as_deref().unwrap_or("")
                );

                Some(ParsedListing {
                    price,
                    uploaded_at,
                    platform,
                    identity: CanonicalIdentity {
                        model,
                        storage,
                        condition_tier,
                    },
                    folded_text: self.normalizer.fold_keyword(&searchable),
                    title_lower: record.title.to_lowercase(),
                })
            })
            .collect();
        debug!(
            total = records.len(),
            usable = parsed.len(),
            "prepared listing records"
        );
        parsed
    }

    fn build_filter(&self, request: &AnalyticsRequest) -> ListingFilter {
        let model = request
            .model
            .as_deref()
            .and_then(|text| self.normalizer.canonicalize_model(text));
        let storage = request
            .storage
            .as_deref()
            .and_then(|text| self.normalizer.resolve_storage(text));
        let tiers = request
            .condition
            .as_deref()
            .map(|raw| self.normalizer.parse_condition_param(raw))
            .unwrap_or_default();
        let platforms: Vec<String> = request
            .platform
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let keyword = request
            .keyword
            .as_deref()
            .map(|raw| self.normalizer.fold_keyword(raw))
            .filter(|folded| !folded.is_empty());
        let base_iphone_guard = keyword.as_deref().is_some_and(|folded| {
            folded.contains("iphone")
                && !VARIANT_MARKERS
                    .iter()
                    .any(|marker| folded.contains(marker))
        });

        ListingFilter {
            model,
            storage,
            tiers,
            platforms,
            keyword,
            base_iphone_guard,
            exclude_keywords: self.normalizer.exclude_keywords().to_vec(),
        }
    }

    /// Period-over-period summary for the requested identity. `None` when
    /// the current window holds no usable listing.
    pub fn market_summary(
        &self,
        records: &[ListingRecord],
        request: &AnalyticsRequest,
    ) -> Option<MarketSummary> {
        let days = parse_window_days(
            request.days.as_deref(),
            DEFAULT_WINDOW_DAYS,
            MAX_SUMMARY_DAYS,
        );
        let current = TimeWindow::trailing_days(self.reference_clock.now(), days);
        let previous = current.previous();
        let filter = self.build_filter(request);

        let mut current_prices = Vec::new();
        let mut previous_prices = Vec::new();
        let mut platform_buckets: HashMap<String, Vec<i64>> = HashMap::new();
        for listing in self.prepare(records).iter().filter(|l| filter.matches(l)) {
            if current.contains(listing.uploaded_at) {
                current_prices.push(listing.price);
                if self.platform_allowed(&listing.platform) {
                    platform_buckets
                        .entry(listing.platform.clone())
                        .or_default()
                        .push(listing.price);
                }
            } else if previous.contains(listing.uploaded_at) {
                previous_prices.push(listing.price);
            }
        }

        let current_stats = summarize_prices(&current_prices, MEAN_FRACTION, RANGE_FRACTION)?;
        let previous_stats = summarize_prices(&previous_prices, MEAN_FRACTION, RANGE_FRACTION);

        let price_change_pct = match (&current_stats.average, &previous_stats) {
            (Some(current_avg), Some(prev)) => prev
                .average
                .and_then(|prev_avg| percent_change(*current_avg, prev_avg)),
            _ => None,
        };
        let listing_change_pct = previous_stats
            .as_ref()
            .and_then(|prev| percent_change(current_stats.count as i64, prev.count as i64));

        Some(MarketSummary {
            average_price: current_stats.average.unwrap_or_default(),
            low_price: current_stats.low,
            high_price: current_stats.high,
            listing_count: current_stats.count,
            price_change_pct,
            listing_change_pct,
            platform_breakdown: platform_stats(platform_buckets),
        })
    }

    /// One bucket per calendar day in the trailing window, zero-filled, plus
    /// the per-platform averages over the same window.
    pub fn daily_trend(&self, records: &[ListingRecord], request: &AnalyticsRequest) -> TrendReport {
        let days = parse_window_days(request.days.as_deref(), DEFAULT_WINDOW_DAYS, MAX_TREND_DAYS);
        // A 7-day trend shows 7 calendar dates, so the span is days - 1.
        let window = TimeWindow::trailing_days(self.reference_clock.now(), days - 1);
        let filter = self.build_filter(request);

        let mut day_buckets: BTreeMap<_, Vec<i64>> =
            window.days().map(|day| (day, Vec::new())).collect();
        let mut platform_buckets: HashMap<String, Vec<i64>> = HashMap::new();
        for listing in self.prepare(records).iter().filter(|l| filter.matches(l)) {
            if !window.contains(listing.uploaded_at) {
                continue;
            }
            day_buckets
                .entry(listing.uploaded_at.date_naive())
                .or_default()
                .push(listing.price);
            if self.platform_allowed(&listing.platform) {
                platform_buckets
                    .entry(listing.platform.clone())
                    .or_default()
                    .push(listing.price);
            }
        }

        let timeline = day_buckets
            .into_iter()
            .map(|(date, prices)| TrendBucket {
                date,
                average: trimmed_mean(&prices, MEAN_FRACTION),
                count: prices.len(),
            })
            .collect();

        TrendReport {
            timeline,
            platform_averages: platform_stats(platform_buckets),
        }
    }

    fn platform_allowed(&self, platform: &str) -> bool {
        let allowed = self.normalizer.platforms();
        allowed.is_empty() || allowed.iter().any(|p| p == platform)
    }

    pub(crate) fn reference_now(&self) -> DateTime<Utc> {
        self.reference_clock.now()
    }
}

/// Trimmed average per platform, cheapest first.
fn platform_stats(buckets: HashMap<String, Vec<i64>>) -> Vec<PlatformStat> {
    let mut stats: Vec<PlatformStat> = buckets
        .into_iter()
        .filter_map(|(platform, prices)| {
            trimmed_mean(&prices, MEAN_FRACTION).map(|average_price| PlatformStat {
                platform,
                average_price,
            })
        })
        .collect();
    stats.sort_by(|a, b| {
        a.average_price
            .cmp(&b.average_price)
            .then_with(|| a.platform.cmp(&b.platform))
    });
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::parser::price::PriceField;
    use chrono::TimeZone;

    fn reference_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 23, 12, 0, 0).unwrap()
    }

    fn engine() -> AnalyticsEngine {
        AnalyticsEngine::with_clocks(
            &SynonymConfig::builtin(),
            Box::new(FixedClock(reference_now())),
            Box::new(FixedClock(reference_now())),
        )
    }

    fn record(title: &str, price: &str, upload_time: &str, platform: &str) -> ListingRecord {
        ListingRecord {
            title: title.to_string(),
            description: None,
            price: Some(PriceField::Text(price.to_string())),
            condition: Some("사용감 적음".to_string()),
            upload_time: Some(upload_time.to_string()),
            platform: Some(platform.to_string()),
            model_name: None,
            storage: None,
            url: None,
            image_url: None,
        }
    }

    fn request(keyword: &str) -> AnalyticsRequest {
        AnalyticsRequest {
            keyword: Some(keyword.to_string()),
            ..AnalyticsRequest::default()
        }
    }

    #[test]
    fn test_parse_window_days_falls_back() {
        assert_eq!(parse_window_days(Some("14"), 7, 90), 14);
        assert_eq!(parse_window_days(Some("abc"), 7, 90), 7);
        assert_eq!(parse_window_days(Some("0"), 7, 90), 7);
        assert_eq!(parse_window_days(Some("-3"), 7, 90), 7);
        assert_eq!(parse_window_days(Some("500"), 7, 90), 90);
        assert_eq!(parse_window_days(None, 7, 90), 7);
    }

    #[test]
    fn test_summary_compares_current_and_previous_windows() {
        let records = vec![
            // current window
            record("아이폰 15 프로 256기가", "1,000,000원", "2025-09-22", "중고나라"),
            record("아이폰 15 프로 256기가", "1,100,000원", "2025-09-21", "번개장터"),
            // previous window
            record("아이폰 15 프로 256기가", "1,000,000원", "2025-09-12", "중고나라"),
        ];
        let summary = engine()
            .market_summary(&records, &request("아이폰 15 프로"))
            .unwrap();

        assert_eq!(summary.average_price, 1_050_000);
        assert_eq!(summary.listing_count, 2);
        assert_eq!(summary.low_price, Some(1_000_000));
        assert_eq!(summary.high_price, Some(1_100_000));
        // (1_050_000 - 1_000_000) / 1_000_000 = +5.0 %
        assert_eq!(summary.price_change_pct, Some(5.0));
        // 2 listings vs 1 listing = +100.0 %
        assert_eq!(summary.listing_change_pct, Some(100.0));
    }

    #[test]
    fn test_summary_is_none_without_current_data() {
        let records = vec![record(
            "아이폰 15 프로",
            "1,000,000원",
            "2025-06-01",
            "중고나라",
        )];
        assert!(engine()
            .market_summary(&records, &request("아이폰 15 프로"))
            .is_none());
        assert!(engine().market_summary(&[], &request("아이폰 15 프로")).is_none());
    }

    #[test]
    fn test_deltas_are_none_without_previous_data() {
        let records = vec![record(
            "아이폰 15 프로",
            "1,000,000원",
            "2025-09-22",
            "중고나라",
        )];
        let summary = engine()
            .market_summary(&records, &request("아이폰 15 프로"))
            .unwrap();
        assert_eq!(summary.price_change_pct, None);
        assert_eq!(summary.listing_change_pct, None);
    }

    #[test]
    fn test_unparseable_records_are_skipped_not_fatal() {
        let mut broken = record("아이폰 15 프로", "가격협의", "2025-09-22", "중고나라");
        broken.price = Some(PriceField::Text("가격협의".to_string()));
        let mut no_time = record("아이폰 15 프로", "900,000원", "", "중고나라");
        no_time.upload_time = Some("시간 정보 없음".to_string());
        let good = record("아이폰 15 프로", "1,000,000원", "2025-09-22", "중고나라");

        let summary = engine()
            .market_summary(&[broken, no_time, good], &request("아이폰 15 프로"))
            .unwrap();
        assert_eq!(summary.listing_count, 1);
        assert_eq!(summary.average_price, 1_000_000);
    }

    #[test]
    fn test_condition_tier_filter_expands_to_label_group() {
        let mut new_item = record("갤럭시 S24 울트라", "1,200,000원", "2025-09-22", "중고나라");
        new_item.condition = Some("새 상품".to_string());
        let mut clean_item = record("갤럭시 S24 울트라", "1,150,000원", "2025-09-21", "중고나라");
        clean_item.condition = Some("사용감 없음".to_string());
        let mut worn_item = record("갤럭시 S24 울트라", "800,000원", "2025-09-21", "중고나라");
        worn_item.condition = Some("사용감 많음".to_string());

        let mut req = request("갤럭시 S24 울트라");
        req.condition = Some("s".to_string());
        let summary = engine()
            .market_summary(&[new_item, clean_item, worn_item], &req)
            .unwrap();
        // Both S-group labels match, the B-tier listing does not.
        assert_eq!(summary.listing_count, 2);
        assert_eq!(summary.average_price, 1_175_000);
    }

    #[test]
    fn test_platform_filter_and_breakdown_sorted_ascending() {
        let records = vec![
            record("아이폰 15 프로", "1,200,000원", "2025-09-22", "번개장터"),
            record("아이폰 15 프로", "1,000,000원", "2025-09-22", "당근마켓"),
            record("아이폰 15 프로", "1,100,000원", "2025-09-21", "중고나라"),
        ];
        let summary = engine()
            .market_summary(&records, &request("아이폰 15 프로"))
            .unwrap();
        let platforms: Vec<&str> = summary
            .platform_breakdown
            .iter()
            .map(|s| s.platform.as_str())
            .collect();
        assert_eq!(platforms, vec!["당근마켓", "중고나라", "번개장터"]);

        let mut req = request("아이폰 15 프로");
        req.platform = Some("당근마켓,중고나라".to_string());
        let filtered = engine().market_summary(&records, &req).unwrap();
        assert_eq!(filtered.listing_count, 2);
    }

    #[test]
    fn test_excluded_and_variant_titles_are_dropped() {
        let records = vec![
            record("아이폰 15 자급제", "900,000원", "2025-09-22", "중고나라"),
            record("아이폰 15 케이스 팝니다", "15,000원", "2025-09-22", "중고나라"),
            record("아이폰 15 프로 맥스", "1,500,000원", "2025-09-22", "중고나라"),
        ];
        // Base-model keyword: the case listing and the Pro Max must not leak in.
        let summary = engine()
            .market_summary(&records, &request("아이폰 15"))
            .unwrap();
        assert_eq!(summary.listing_count, 1);
        assert_eq!(summary.average_price, 900_000);
    }

    #[test]
    fn test_relative_upload_times_use_wall_clock() {
        let records = vec![record("아이폰 15 프로", "1,000,000원", "3일 전", "중고나라")];
        let summary = engine()
            .market_summary(&records, &request("아이폰 15 프로"))
            .unwrap();
        assert_eq!(summary.listing_count, 1);
    }

    #[test]
    fn test_daily_trend_zero_fills_every_day() {
        let records = vec![
            record("아이폰 15 프로", "1,000,000원", "2025-09-22", "중고나라"),
            record("아이폰 15 프로", "1,040,000원", "2025-09-22", "번개장터"),
        ];
        let trend = engine().daily_trend(&records, &request("아이폰 15 프로"));

        assert_eq!(trend.timeline.len(), 7);
        assert_eq!(trend.timeline[0].date.to_string(), "2025-09-17");
        assert_eq!(trend.timeline[6].date.to_string(), "2025-09-23");
        for bucket in &trend.timeline {
            if bucket.date.to_string() == "2025-09-22" {
                assert_eq!(bucket.count, 2);
                assert_eq!(bucket.average, Some(1_020_000));
            } else {
                assert_eq!(bucket.count, 0);
                assert_eq!(bucket.average, None);
            }
        }
        assert_eq!(trend.platform_averages.len(), 2);
    }

    #[test]
    fn test_listings_without_platform_group_under_fallback() {
        let mut anonymous = record("아이폰 15 프로", "1,000,000원", "2025-09-22", "");
        anonymous.platform = None;
        let parsed = engine().prepare(&[anonymous]);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].platform, FALLBACK_PLATFORM);
    }

    #[test]
    fn test_prepare_resolves_identity_from_title() {
        let records = vec![record(
            "갤럭시 S24 울트라 256기가 팝니다",
            "1,200,000원",
            "2025-09-22",
            "중고나라",
        )];
        let parsed = engine().prepare(&records);
        assert_eq!(parsed[0].identity.model.as_deref(), Some("galaxy_s24_ultra"));
        assert_eq!(parsed[0].identity.storage.as_deref(), Some("256g"));
        assert_eq!(parsed[0].identity.condition_tier, Some(ConditionTier::A));
    }
}
