use joongo_radar::analyzer::recommend::DEFAULT_RECOMMEND_DAYS;
use joongo_radar::normalizer::{format_storage_label, humanize_model};
use joongo_radar::parser::price::format_currency;
use joongo_radar::{AnalyticsEngine, AnalyticsRequest, ListingRecord, SynonymConfig, load_config};
use tracing::{error, info, warn};

fn main() {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let listings_path = args.next().unwrap_or_else(|| "listings.json".to_string());
    let keyword = args.next();
    let model = args.next();
    let storage = args.next();

    let config = match load_config("config.json") {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Config load error: {e}. Using builtin synonym config.");
            SynonymConfig::builtin()
        }
    };

    let raw = match std::fs::read_to_string(&listings_path) {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to read listings file {listings_path}: {e}");
            return;
        }
    };
    let records: Vec<ListingRecord> = match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(e) => {
            error!("Failed to parse listings file {listings_path}: {e}");
            return;
        }
    };
    info!("Loaded {} listings from {listings_path}", records.len());

    let engine = AnalyticsEngine::new(&config);
    let request = AnalyticsRequest {
        keyword: keyword.clone(),
        ..AnalyticsRequest::default()
    };

    match engine.market_summary(&records, &request) {
        Some(summary) => {
            info!(
                "Market summary: avg {} | range {} ~ {} | {} listings",
                format_currency(summary.average_price),
                summary.low_price.map_or("-".to_string(), format_currency),
                summary.high_price.map_or("-".to_string(), format_currency),
                summary.listing_count
            );
            if let Some(pct) = summary.price_change_pct {
                info!("Price change vs previous period: {pct:+}%");
            }
            for stat in &summary.platform_breakdown {
                info!("  {} — {}", stat.platform, format_currency(stat.average_price));
            }
        }
        None => info!("No usable listings in the current window."),
    }

    let trend = engine.daily_trend(&records, &request);
    for bucket in &trend.timeline {
        info!(
            "{} — {} ({} listings)",
            bucket.date,
            bucket.average.map_or("-".to_string(), format_currency),
            bucket.count
        );
    }

    if let (Some(model), Some(storage)) = (model, storage) {
        match engine.recommend(&records, &model, &storage, None, DEFAULT_RECOMMEND_DAYS) {
            Some(rec) => {
                let label = engine
                    .normalizer()
                    .canonicalize_model(&model)
                    .map(|c| humanize_model(&c))
                    .unwrap_or(model);
                let storage_label = engine
                    .normalizer()
                    .resolve_storage(&storage)
                    .map(|c| format_storage_label(&c))
                    .unwrap_or(storage);
                info!(
                    "Recommended listing price for {label} {storage_label}: {} (range {} ~ {}, fast sale {}, {} samples)",
                    format_currency(rec.recommended_price),
                    format_currency(rec.recommended_min),
                    format_currency(rec.recommended_max),
                    format_currency(rec.fast_sale_price),
                    rec.sample_count
                );
            }
            None => info!("Not enough data to recommend a listing price."),
        }
    }
}
