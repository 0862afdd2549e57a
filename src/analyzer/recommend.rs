//! Listing-price recommendation: the same robust statistics as the market
//! summary, but with a step-rounding policy so the suggested prices land on
//! amounts a seller would actually type in.

use tracing::debug;

use crate::analyzer::robust::{quantile_bounds, round_to_step, trim_fraction, trimmed_mean};
use crate::analyzer::summary::AnalyticsEngine;
use crate::model::{ConditionTier, ListingRecord, Recommendation, TimeWindow};

pub const PRICE_STEP: i64 = 5_000;
pub const DEFAULT_RECOMMEND_DAYS: i64 = 7;

const TRIM_FRACTION: f64 = 0.10;
/// Rank used for the quick-sale price: low enough to undercut most of the
/// market without giving the phone away.
const FAST_SALE_FRACTION: f64 = 0.18;

impl AnalyticsEngine {
    /// Recommended listing price for a fully specified device. Model and
    /// storage are required; when either fails to canonicalize, or no usable
    /// price survives filtering, the answer is `None` — insufficient input,
    /// not an error.
    pub fn recommend(
        &self,
        records: &[ListingRecord],
        model: &str,
        storage: &str,
        condition: Option<ConditionTier>,
        window_days: i64,
    ) -> Option<Recommendation> {
        let model = self.normalizer().canonicalize_model(model)?;
        let storage = self.normalizer().resolve_storage(storage)?;
        let days = if window_days > 0 {
            window_days
        } else {
            DEFAULT_RECOMMEND_DAYS
        };
        let window = TimeWindow::trailing_days(self.reference_now(), days);

        let mut prices: Vec<i64> = self
            .prepare(records)
            .iter()
            .filter(|listing| {
                listing.identity.model.as_deref() == Some(model.as_str())
                    && listing.identity.storage.as_deref() == Some(storage.as_str())
                    && condition
                        .map(|tier| listing.identity.condition_tier == Some(tier))
                        .unwrap_or(true)
                    && window.contains(listing.uploaded_at)
            })
            .map(|listing| listing.price)
            .collect();
        if prices.is_empty() {
            debug!(%model, %storage, "no usable prices in recommendation window");
            return None;
        }
        prices.sort_unstable();
        let sample_count = prices.len();

        let average_price = trimmed_mean(&prices, TRIM_FRACTION)?;
        let (low_price, high_price) = quantile_bounds(&prices, TRIM_FRACTION)?;
        let recommended_price = round_to_step(average_price, PRICE_STEP);

        let trimmed = trim_fraction(&prices, TRIM_FRACTION);
        let (recommended_min, recommended_max) = if trimmed.is_empty() {
            (
                round_to_step(
                    low_price.max((average_price as f64 * 0.97).round() as i64),
                    PRICE_STEP,
                ),
                round_to_step(
                    high_price.min((average_price as f64 * 1.03).round() as i64),
                    PRICE_STEP,
                ),
            )
        } else {
            (
                round_to_step(trimmed[0], PRICE_STEP),
                round_to_step(trimmed[trimmed.len() - 1], PRICE_STEP),
            )
        };

        let fast_rank = (sample_count as f64 * FAST_SALE_FRACTION).floor() as usize;
        let fast_sale_price = match prices.get(fast_rank) {
            Some(price) => round_to_step(*price, PRICE_STEP),
            None => round_to_step(
                recommended_min.max((recommended_price as f64 * 0.98).round() as i64),
                PRICE_STEP,
            ),
        };

        Some(Recommendation {
            average_price,
            low_price,
            high_price,
            recommended_price,
            recommended_min,
            recommended_max,
            fast_sale_price,
            sample_count,
        })
    }
}
