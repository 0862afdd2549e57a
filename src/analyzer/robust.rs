//! Outlier-robust price statistics. Two distinct policies live here and must
//! not be mixed up: the trimmed mean refuses to trim when trimming would eat
//! half the sample or more, while `trim_fraction` is the raw subrange and may
//! come back empty. Callers pick their own fractions for mean and range.

use crate::model::PriceStatistic;

/// Sorts ascending, drops `floor(n * fraction)` values from each end (unless
/// that would remove half the sample or more, in which case nothing is
/// dropped), and returns the rounded mean of the rest.
pub fn trimmed_mean(values: &[i64], fraction: f64) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let cut = (sorted.len() as f64 * fraction).floor() as usize;
    let kept: &[i64] = if cut * 2 >= sorted.len() {
        &sorted
    } else {
        &sorted[cut..sorted.len() - cut]
    };
    let sum: i64 = kept.iter().sum();
    Some((sum as f64 / kept.len() as f64).round() as i64)
}

/// Quantile-rank endpoints of the sorted values: the element at
/// `floor(n * fraction)` from each end. Indices, not interpolation.
pub fn quantile_bounds(values: &[i64], fraction: f64) -> Option<(i64, i64)> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    let cut = (n as f64 * fraction).floor() as usize;
    let low = sorted[cut.min(n - 1)];
    let high = sorted[(n - 1).saturating_sub(cut)];
    Some((low, high))
}

/// Raw trimmed subrange `[cut, n - cut)` of an already sorted slice.
/// Unlike `trimmed_mean` this can be empty.
pub fn trim_fraction(sorted: &[i64], fraction: f64) -> &[i64] {
    let n = sorted.len();
    let cut = (n as f64 * fraction).floor() as usize;
    if cut * 2 >= n {
        &sorted[0..0]
    } else {
        &sorted[cut..n - cut]
    }
}

/// Nearest multiple of `step` (5000 won for listing prices).
pub fn round_to_step(value: i64, step: i64) -> i64 {
    if step <= 0 {
        return value;
    }
    (value as f64 / step as f64).round() as i64 * step
}

/// Period-over-period delta in percent, one decimal. `None` when the
/// previous value is zero or negative so no division blows up.
pub fn percent_change(current: i64, previous: i64) -> Option<f64> {
    if previous <= 0 {
        return None;
    }
    let pct = (current - previous) as f64 / previous as f64 * 100.0;
    Some((pct * 10.0).round() / 10.0)
}

/// Bucket summary: trimmed average plus quantile-rank bounds. The count is
/// the untrimmed sample size. The two fractions are independent on purpose.
pub fn summarize_prices(
    values: &[i64],
    mean_fraction: f64,
    range_fraction: f64,
) -> Option<PriceStatistic> {
    let average = trimmed_mean(values, mean_fraction)?;
    let (low, high) = quantile_bounds(values, range_fraction)?;
    Some(PriceStatistic {
        average: Some(average),
        low: Some(low),
        high: Some(high),
        count: values.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_mean_drops_one_outlier_per_end() {
        // cut = floor(10 * 0.10) = 1, mean over the middle eight values.
        let prices = [
            1_000_000, 1_010_000, 1_020_000, 1_030_000, 1_040_000, 1_050_000, 1_060_000, 1_070_000,
            1_080_000, 5_000_000,
        ];
        assert_eq!(trimmed_mean(&prices, 0.10), Some(1_045_000));
    }

    #[test]
    fn test_trimmed_mean_empty_is_none() {
        assert_eq!(trimmed_mean(&[], 0.10), None);
        assert_eq!(trimmed_mean(&[], 0.25), None);
    }

    #[test]
    fn test_trimmed_mean_small_samples_keep_everything() {
        assert_eq!(trimmed_mean(&[500_000], 0.10), Some(500_000));
        assert_eq!(trimmed_mean(&[100, 200], 0.10), Some(150));
        // cut = 1, 2 * cut >= n: trimming would eat the whole sample.
        assert_eq!(trimmed_mean(&[100, 200], 0.50), Some(150));
    }

    #[test]
    fn test_trimmed_mean_stays_within_bounds() {
        let cases: [&[i64]; 4] = [
            &[5],
            &[1, 100],
            &[10, 20, 30, 40, 50, 60, 2_000],
            &[7, 7, 7, 7],
        ];
        for values in cases {
            let mean = trimmed_mean(values, 0.10).unwrap();
            let min = *values.iter().min().unwrap();
            let max = *values.iter().max().unwrap();
            assert!(min <= mean && mean <= max, "{mean} outside [{min}, {max}]");
        }
    }

    #[test]
    fn test_quantile_bounds_pick_rank_elements() {
        let values = [10, 20, 30, 40, 50, 60, 70, 80, 90, 100];
        assert_eq!(quantile_bounds(&values, 0.10), Some((20, 90)));
        assert_eq!(quantile_bounds(&values, 0.25), Some((30, 80)));
        assert_eq!(quantile_bounds(&[42], 0.10), Some((42, 42)));
        assert_eq!(quantile_bounds(&[], 0.10), None);
    }

    #[test]
    fn test_trim_fraction_can_be_empty() {
        let sorted = [10, 20];
        assert!(trim_fraction(&sorted, 0.50).is_empty());
        let sorted = [10, 20, 30, 40, 50, 60, 70, 80, 90, 100];
        assert_eq!(trim_fraction(&sorted, 0.10), &[20, 30, 40, 50, 60, 70, 80, 90]);
    }

    #[test]
    fn test_round_to_step() {
        assert_eq!(round_to_step(1_045_000, 5_000), 1_045_000);
        assert_eq!(round_to_step(1_043_000, 5_000), 1_045_000);
        assert_eq!(round_to_step(1_042_499, 5_000), 1_040_000);
        assert_eq!(round_to_step(0, 5_000), 0);
    }

    #[test]
    fn test_percent_change_one_decimal() {
        assert_eq!(percent_change(110, 100), Some(10.0));
        assert_eq!(percent_change(105, 90), Some(16.7));
        assert_eq!(percent_change(90, 105), Some(-14.3));
        assert_eq!(percent_change(50, 0), None);
    }

    #[test]
    fn test_summarize_prices_counts_untrimmed_sample() {
        let values = [10, 20, 30, 40, 50, 60, 70, 80, 90, 1_000];
        let stats = summarize_prices(&values, 0.10, 0.10).unwrap();
        assert_eq!(stats.count, 10);
        assert_eq!(stats.low, Some(20));
        assert_eq!(stats.high, Some(90));
        assert_eq!(stats.average, Some(55));
        assert_eq!(summarize_prices(&[], 0.10, 0.10), None);
    }
}
