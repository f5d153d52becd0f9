//! Classification schemes for choropleth maps.
//!
//! Every scheme turns a set of numeric values into ascending class upper bounds
//! ("bins"). A value belongs to the first class whose upper bound is greater than
//! or equal to it. Schemes that need randomness elsewhere use deterministic
//! initialisation and stride sampling here, so the same input always yields the
//! same classes.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sampled schemes use at most this many observations.
const MAX_SAMPLE: usize = 1000;
/// Fraction of the observations taken by the sampled schemes.
const SAMPLE_FRACTION: f64 = 0.10;
const MAX_ITERATIONS: usize = 100;
const BOX_PLOT_HINGE: f64 = 1.5;
const PERCENTILES: &[f64] = &[1.0, 10.0, 50.0, 90.0, 99.0, 100.0];
const STD_MEAN_MULTIPLES: &[f64] = &[-2.0, -1.0, 1.0, 2.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    BoxPlot,
    EqualInterval,
    FisherJenks,
    FisherJenksSampled,
    HeadTailBreaks,
    JenksCaspall,
    JenksCaspallForced,
    JenksCaspallSampled,
    MaxP,
    MaximumBreaks,
    NaturalBreaks,
    Quantiles,
    Percentiles,
    StdMean,
}

impl Scheme {
    pub const ALL: &'static [Scheme] = &[
        Self::BoxPlot,
        Self::EqualInterval,
        Self::FisherJenks,
        Self::FisherJenksSampled,
        Self::HeadTailBreaks,
        Self::JenksCaspall,
        Self::JenksCaspallForced,
        Self::JenksCaspallSampled,
        Self::MaxP,
        Self::MaximumBreaks,
        Self::NaturalBreaks,
        Self::Quantiles,
        Self::Percentiles,
        Self::StdMean,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::BoxPlot => "BoxPlot",
            Self::EqualInterval => "EqualInterval",
            Self::FisherJenks => "FisherJenks",
            Self::FisherJenksSampled => "FisherJenksSampled",
            Self::HeadTailBreaks => "HeadTailBreaks",
            Self::JenksCaspall => "JenksCaspall",
            Self::JenksCaspallForced => "JenksCaspallForced",
            Self::JenksCaspallSampled => "JenksCaspallSampled",
            Self::MaxP => "MaxP",
            Self::MaximumBreaks => "MaximumBreaks",
            Self::NaturalBreaks => "NaturalBreaks",
            Self::Quantiles => "Quantiles",
            Self::Percentiles => "Percentiles",
            Self::StdMean => "StdMean",
        }
    }

    /// Schemes whose number of classes follows from the data, not from `k`.
    pub fn ignores_class_count(&self) -> bool {
        matches!(
            self,
            Self::BoxPlot | Self::HeadTailBreaks | Self::Percentiles | Self::StdMean
        )
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Scheme {
    type Err = ValidationError;

    /// Case-insensitive; `_`, `-` and spaces are ignored ("natural_breaks", "Quantiles").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        Scheme::ALL
            .iter()
            .copied()
            .find(|scheme| scheme.name().to_lowercase() == normalized)
            .ok_or_else(|| ValidationError::UnknownScheme(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub scheme: Scheme,
    /// Ascending class upper bounds.
    pub bins: Vec<f64>,
    /// Number of observations per class.
    pub counts: Vec<usize>,
    /// Smallest observation, the lower edge of the first class.
    pub min: f64,
}

impl Classification {
    pub fn k(&self) -> usize {
        self.bins.len()
    }

    pub fn class_of(&self, value: f64) -> usize {
        self.bins
            .iter()
            .position(|&upper| value <= upper)
            .unwrap_or_else(|| self.bins.len().saturating_sub(1))
    }

    /// `(lower, upper)` of every class.
    pub fn ranges(&self) -> Vec<(f64, f64)> {
        let mut lower = self.min.min(self.bins.first().copied().unwrap_or(self.min));
        self.bins
            .iter()
            .map(|&upper| {
                let range = (lower, upper);
                lower = upper;
                range
            })
            .collect()
    }

    /// Legend labels such as `[10.00, 250.00]`, `(250.00, 1200.00]`.
    pub fn labels(&self) -> Vec<String> {
        self.ranges()
            .iter()
            .enumerate()
            .map(|(i, (lower, upper))| {
                let open = if i == 0 { '[' } else { '(' };
                format!("{}{:.2}, {:.2}]", open, lower, upper)
            })
            .collect()
    }
}

/// Classify `values` into at most `k` classes. Non-finite values are ignored.
pub fn classify(values: &[f64], scheme: Scheme, k: usize) -> Classification {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    if sorted.is_empty() {
        return Classification {
            scheme,
            bins: Vec::new(),
            counts: Vec::new(),
            min: 0.0,
        };
    }

    // More classes than values only ever collapse, so never size anything by `k` beyond that.
    let k = k.clamp(1, sorted.len());
    let mut bins = match scheme {
        Scheme::EqualInterval => equal_interval(&sorted, k),
        Scheme::Quantiles => quantile_bins(&sorted, k),
        Scheme::Percentiles => PERCENTILES.iter().map(|p| quantile(&sorted, p / 100.0)).collect(),
        Scheme::BoxPlot => box_plot(&sorted),
        Scheme::StdMean => std_mean(&sorted),
        Scheme::HeadTailBreaks => head_tail_breaks(&sorted),
        Scheme::MaximumBreaks => {
            unless_few_unique(&sorted, k, |unique| maximum_breaks(unique, k))
        }
        Scheme::FisherJenks => unless_few_unique(&sorted, k, |_| fisher_jenks(&sorted, k)),
        Scheme::FisherJenksSampled => unless_few_unique(&sorted, k, |_| {
            fisher_jenks(&stride_sample(&sorted, sample_size(sorted.len(), k)), k)
        }),
        Scheme::NaturalBreaks => unless_few_unique(&sorted, k, |_| {
            kmeans_1d(&sorted, equal_interval_centers(&sorted, k))
        }),
        Scheme::JenksCaspall => unless_few_unique(&sorted, k, |_| {
            kmeans_1d(&sorted, quantile_centers(&sorted, k))
        }),
        Scheme::JenksCaspallSampled => unless_few_unique(&sorted, k, |_| {
            let sample = stride_sample(&sorted, sample_size(sorted.len(), k));
            kmeans_1d(&sample, quantile_centers(&sample, k))
        }),
        Scheme::JenksCaspallForced => unless_few_unique(&sorted, k, |_| {
            partition_bins(&sorted, refine_partition(&sorted, k, absolute_deviation))
        }),
        Scheme::MaxP => unless_few_unique(&sorted, k, |_| {
            partition_bins(&sorted, refine_partition(&sorted, k, squared_deviation))
        }),
    };

    bins.retain(|b| b.is_finite());
    bins.sort_by(|a, b| a.total_cmp(b));
    bins.dedup();

    // Data driven schemes close on the maximum; sampled ones may have missed it.
    let max = sorted[sorted.len() - 1];
    match bins.last_mut() {
        Some(last) if *last < max => {
            if scheme.ignores_class_count() {
                bins.push(max);
            } else {
                *last = max;
            }
        }
        None => bins.push(max),
        _ => {}
    }

    let mut classification = Classification {
        scheme,
        counts: vec![0; bins.len()],
        bins,
        min: sorted[0],
    };
    for &v in &sorted {
        let class = classification.class_of(v);
        classification.counts[class] += 1;
    }
    classification
}

/// Linear interpolation between the closest ranks, as numpy's default percentile.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn equal_interval(sorted: &[f64], k: usize) -> Vec<f64> {
    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    let width = (max - min) / k as f64;
    let mut bins: Vec<f64> = (1..=k).map(|i| min + width * i as f64).collect();
    if let Some(last) = bins.last_mut() {
        *last = max;
    }
    bins
}

fn quantile_bins(sorted: &[f64], k: usize) -> Vec<f64> {
    (1..=k).map(|i| quantile(sorted, i as f64 / k as f64)).collect()
}

fn box_plot(sorted: &[f64]) -> Vec<f64> {
    let q1 = quantile(sorted, 0.25);
    let q2 = quantile(sorted, 0.50);
    let q3 = quantile(sorted, 0.75);
    let iqr = q3 - q1;
    vec![q1 - BOX_PLOT_HINGE * iqr, q1, q2, q3, q3 + BOX_PLOT_HINGE * iqr]
}

// Terms are scaled down before summing so values near f64::MAX cannot overflow.
fn mean(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    values.iter().map(|v| v / n).sum()
}

fn std_mean(sorted: &[f64]) -> Vec<f64> {
    let m = mean(sorted);
    // Half deviations stay finite even across the whole f64 range.
    let half_dev = |v: f64| v / 2.0 - m / 2.0;
    let scale = sorted.iter().map(|&v| half_dev(v).abs()).fold(0.0, f64::max);
    let std = if scale > 0.0 {
        let spread = sorted.iter().map(|&v| (half_dev(v) / scale).powi(2)).sum::<f64>() / sorted.len() as f64;
        2.0 * scale * spread.sqrt()
    } else {
        0.0
    };
    STD_MEAN_MULTIPLES.iter().map(|k| m + k * std).collect()
}

fn head_tail_breaks(sorted: &[f64]) -> Vec<f64> {
    let mut cuts = Vec::new();
    let mut current: Vec<f64> = sorted.to_vec();
    loop {
        let m = mean(&current);
        cuts.push(m);
        if unique_values(&current).len() <= 1 {
            break;
        }
        current.retain(|&v| v > m);
    }
    cuts
}

fn unique_values(sorted: &[f64]) -> Vec<f64> {
    let mut unique = sorted.to_vec();
    unique.dedup();
    unique
}

/// With no more distinct values than classes every distinct value is its own class.
fn unless_few_unique<F>(sorted: &[f64], k: usize, bins: F) -> Vec<f64>
where
    F: FnOnce(&[f64]) -> Vec<f64>,
{
    let unique = unique_values(sorted);
    if unique.len() <= k {
        unique
    } else {
        bins(&unique)
    }
}

/// Breaks at the midpoints of the `k - 1` widest gaps between distinct values.
fn maximum_breaks(unique: &[f64], k: usize) -> Vec<f64> {
    let mut gaps: Vec<(usize, f64)> = unique
        .windows(2)
        .enumerate()
        .map(|(i, w)| (i, w[1] - w[0]))
        .collect();
    gaps.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut bins: Vec<f64> = gaps
        .iter()
        .take(k - 1)
        .map(|&(i, _)| (unique[i] + unique[i + 1]) / 2.0)
        .collect();
    bins.push(unique[unique.len() - 1]);
    bins
}

/// Fisher's exact optimal partition, minimising the within-class sum of squares.
fn fisher_jenks(sorted: &[f64], k: usize) -> Vec<f64> {
    let n = sorted.len();
    if n <= k {
        return sorted.to_vec();
    }

    // 1-based matrices as in Jenks' formulation.
    let mut lower_limits = vec![vec![0usize; k + 1]; n + 1];
    let mut variances = vec![vec![f64::INFINITY; k + 1]; n + 1];
    for j in 1..=k {
        lower_limits[1][j] = 1;
        variances[1][j] = 0.0;
    }

    for l in 2..=n {
        let (mut sum, mut sum_sq, mut weight) = (0.0, 0.0, 0.0);
        let mut variance = 0.0;
        for m in 1..=l {
            let lower = l - m + 1;
            let value = sorted[lower - 1];
            weight += 1.0;
            sum += value;
            sum_sq += value * value;
            variance = sum_sq - (sum * sum) / weight;

            let previous = lower - 1;
            if previous != 0 {
                for j in 2..=k {
                    let candidate = variance + variances[previous][j - 1];
                    if variances[l][j] >= candidate {
                        lower_limits[l][j] = lower;
                        variances[l][j] = candidate;
                    }
                }
            }
        }
        lower_limits[l][1] = 1;
        variances[l][1] = variance;
    }

    let mut bins = vec![0.0; k];
    bins[k - 1] = sorted[n - 1];
    let mut count = n;
    for j in (2..=k).rev() {
        let lower = lower_limits[count][j];
        bins[j - 2] = sorted[lower - 2];
        count = lower - 1;
    }
    bins
}

/// Small inputs are used whole; larger ones are sampled at 10%, between 100 and 1000
/// observations and never fewer than the classes requested.
fn sample_size(n: usize, k: usize) -> usize {
    if n <= MAX_SAMPLE {
        return n;
    }
    let size = ((n as f64) * SAMPLE_FRACTION) as usize;
    size.clamp(MAX_SAMPLE / 10, MAX_SAMPLE).max(k + 1)
}

/// Evenly strided sample that always includes both extremes.
fn stride_sample(sorted: &[f64], size: usize) -> Vec<f64> {
    let n = sorted.len();
    if size >= n || size < 2 {
        return sorted.to_vec();
    }
    (0..size)
        .map(|i| {
            let idx = (i as f64 * (n - 1) as f64 / (size - 1) as f64).round() as usize;
            sorted[idx.min(n - 1)]
        })
        .collect()
}

fn equal_interval_centers(sorted: &[f64], k: usize) -> Vec<f64> {
    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    let width = (max - min) / k as f64;
    (0..k).map(|i| min + width * (i as f64 + 0.5)).collect()
}

fn quantile_centers(sorted: &[f64], k: usize) -> Vec<f64> {
    quantile_cuts(sorted.len(), k)
        .iter()
        .scan(0usize, |start, &end| {
            let class = &sorted[*start..end];
            *start = end;
            Some(mean(class))
        })
        .collect()
}

/// Lloyd iterations in one dimension. Returns the largest member of every non-empty class.
fn kmeans_1d(sorted: &[f64], mut centers: Vec<f64>) -> Vec<f64> {
    let k = centers.len();
    let mut assignment = vec![0usize; sorted.len()];

    for _ in 0..MAX_ITERATIONS {
        for (slot, &v) in assignment.iter_mut().zip(sorted) {
            *slot = nearest_center(&centers, v);
        }

        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for (&class, &v) in assignment.iter().zip(sorted) {
            sums[class] += v;
            counts[class] += 1;
        }

        let updated: Vec<f64> = centers
            .iter()
            .enumerate()
            .map(|(i, &c)| if counts[i] > 0 { sums[i] / counts[i] as f64 } else { c })
            .collect();

        if updated == centers {
            break;
        }
        centers = updated;
    }

    let mut upper = vec![f64::NEG_INFINITY; k];
    for (&class, &v) in assignment.iter().zip(sorted) {
        upper[class] = upper[class].max(v);
    }
    upper.into_iter().filter(|v| v.is_finite()).collect()
}

fn nearest_center(centers: &[f64], value: f64) -> usize {
    let mut best = 0;
    for (i, c) in centers.iter().enumerate() {
        if (value - c).abs() < (value - centers[best]).abs() {
            best = i;
        }
    }
    best
}

/// Exclusive end index of every class for an equal-count split of `n` items.
fn quantile_cuts(n: usize, k: usize) -> Vec<usize> {
    let mut cuts = Vec::with_capacity(k);
    let mut previous = 0;
    for i in 1..=k {
        let remaining_classes = k - i;
        let ideal = ((i * n) as f64 / k as f64).round() as usize;
        let end = ideal.max(previous + 1).min(n - remaining_classes);
        cuts.push(end);
        previous = end;
    }
    cuts
}

fn absolute_deviation(class: &[f64]) -> f64 {
    let median = quantile(class, 0.5);
    class.iter().map(|v| (v - median).abs()).sum()
}

fn squared_deviation(class: &[f64]) -> f64 {
    let m = mean(class);
    class.iter().map(|v| (v - m).powi(2)).sum()
}

/// Start from an equal-count split and move single observations across class
/// boundaries while that lowers the total cost.
fn refine_partition<F>(sorted: &[f64], k: usize, cost: F) -> Vec<usize>
where
    F: Fn(&[f64]) -> f64,
{
    let mut cuts = quantile_cuts(sorted.len(), k);

    for _ in 0..MAX_ITERATIONS {
        let mut improved = false;
        for c in 0..cuts.len() - 1 {
            let start = if c == 0 { 0 } else { cuts[c - 1] };
            let end = cuts[c];
            let next_end = cuts[c + 1];
            let current = cost(&sorted[start..end]) + cost(&sorted[end..next_end]);

            if end - start > 1 {
                let shrunk = cost(&sorted[start..end - 1]) + cost(&sorted[end - 1..next_end]);
                if shrunk + f64::EPSILON < current {
                    cuts[c] -= 1;
                    improved = true;
                    continue;
                }
            }
            if next_end - end > 1 {
                let grown = cost(&sorted[start..end + 1]) + cost(&sorted[end + 1..next_end]);
                if grown + f64::EPSILON < current {
                    cuts[c] += 1;
                    improved = true;
                }
            }
        }
        if !improved {
            break;
        }
    }
    cuts
}

fn partition_bins(sorted: &[f64], cuts: Vec<usize>) -> Vec<f64> {
    cuts.into_iter().map(|end| sorted[end - 1]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CLUSTERED: &[f64] = &[1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 20.0, 21.0, 22.0];

    fn assert_bins(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "bins {:?} vs {:?}", actual, expected);
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "bins {:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn test_huge_class_count_is_bounded_by_values() {
        for scheme in [
            Scheme::EqualInterval,
            Scheme::Quantiles,
            Scheme::FisherJenksSampled,
            Scheme::JenksCaspallSampled,
            Scheme::MaximumBreaks,
        ] {
            let c = classify(&[1.0, 2.0, 3.0, 4.0], scheme, usize::MAX);
            assert!(c.k() <= 4, "{:?} gave {} classes", scheme, c.k());
            assert_eq!(c.counts.iter().sum::<usize>(), 4);
        }
    }

    #[test]
    fn test_extreme_values_give_finite_bins() {
        let values = [f64::MAX, f64::MAX / 2.0, f64::MAX * 0.9, -f64::MAX];
        for scheme in [Scheme::StdMean, Scheme::HeadTailBreaks] {
            let c = classify(&values, scheme, 5);
            assert!(c.bins.iter().all(|b| b.is_finite()), "{:?}: {:?}", scheme, c.bins);
            assert_eq!(c.counts.iter().sum::<usize>(), 4);
            assert_eq!(c.class_of(f64::MAX), c.k() - 1);
        }
    }

    #[test]
    fn test_scheme_names_parse() {
        assert_eq!("quantiles".parse::<Scheme>().unwrap(), Scheme::Quantiles);
        assert_eq!("Quantiles".parse::<Scheme>().unwrap(), Scheme::Quantiles);
        assert_eq!("natural_breaks".parse::<Scheme>().unwrap(), Scheme::NaturalBreaks);
        assert_eq!("Fisher-Jenks".parse::<Scheme>().unwrap(), Scheme::FisherJenks);
        assert_eq!("maxp".parse::<Scheme>().unwrap(), Scheme::MaxP);
        assert_eq!(
            "kmeans".parse::<Scheme>(),
            Err(ValidationError::UnknownScheme("kmeans".to_string()))
        );
        for scheme in Scheme::ALL {
            assert_eq!(scheme.name().parse::<Scheme>().unwrap(), *scheme);
        }
    }

    #[test]
    fn test_equal_interval() {
        let values: Vec<f64> = (0..=10).map(f64::from).collect();
        let c = classify(&values, Scheme::EqualInterval, 5);
        assert_bins(&c.bins, &[2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(c.counts, vec![3, 2, 2, 2, 2]);
        assert_eq!(c.class_of(0.0), 0);
        assert_eq!(c.class_of(2.0), 0);
        assert_eq!(c.class_of(2.5), 1);
        assert_eq!(c.class_of(10.0), 4);
    }

    #[test]
    fn test_quantiles() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        let c = classify(&values, Scheme::Quantiles, 4);
        assert_bins(&c.bins, &[25.75, 50.5, 75.25, 100.0]);
        assert_eq!(c.counts, vec![25, 25, 25, 25]);
    }

    #[test]
    fn test_quantiles_collapse_duplicate_bins() {
        let values = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0];
        let c = classify(&values, Scheme::Quantiles, 5);
        assert_bins(&c.bins, &[1.0, 2.0]);
        assert_eq!(c.counts, vec![6, 1]);
    }

    #[test]
    fn test_natural_partitions_of_clustered_data() {
        for scheme in [
            Scheme::FisherJenks,
            Scheme::FisherJenksSampled,
            Scheme::NaturalBreaks,
            Scheme::JenksCaspall,
            Scheme::JenksCaspallSampled,
            Scheme::JenksCaspallForced,
            Scheme::MaxP,
        ] {
            let c = classify(CLUSTERED, scheme, 3);
            assert_bins(&c.bins, &[3.0, 12.0, 22.0]);
            assert_eq!(c.counts, vec![3, 3, 3], "{}", scheme);
        }
    }

    #[test]
    fn test_maximum_breaks() {
        let c = classify(CLUSTERED, Scheme::MaximumBreaks, 3);
        assert_bins(&c.bins, &[6.5, 16.0, 22.0]);
        assert_eq!(c.counts, vec![3, 3, 3]);
    }

    #[test]
    fn test_head_tail_breaks() {
        let c = classify(&[1.0, 1.0, 1.0, 1.0, 10.0], Scheme::HeadTailBreaks, 5);
        assert_bins(&c.bins, &[2.8, 10.0]);
        assert_eq!(c.counts, vec![4, 1]);
    }

    #[test]
    fn test_percentiles_ignore_k() {
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        let c = classify(&values, Scheme::Percentiles, 3);
        assert_bins(&c.bins, &[1.0, 10.0, 50.0, 90.0, 99.0, 100.0]);
    }

    #[test]
    fn test_box_plot_appends_max_outlier() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let c = classify(&values, Scheme::BoxPlot, 5);
        // q1 = 2.25, q2 = 3.5, q3 = 4.75, iqr = 2.5
        assert_bins(&c.bins, &[-1.5, 2.25, 3.5, 4.75, 8.5, 100.0]);
        assert_eq!(c.counts, vec![0, 2, 1, 1, 1, 1]);
    }

    #[test]
    fn test_std_mean() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // mean 5, population std 2
        let c = classify(&values, Scheme::StdMean, 5);
        assert_bins(&c.bins, &[1.0, 3.0, 7.0, 9.0]);
        assert_eq!(c.counts.iter().sum::<usize>(), values.len());
    }

    #[test]
    fn test_fewer_unique_values_than_classes() {
        let c = classify(&[3.0, 3.0, 7.0], Scheme::FisherJenks, 5);
        assert_bins(&c.bins, &[3.0, 7.0]);
        assert_eq!(c.counts, vec![2, 1]);
    }

    #[test]
    fn test_non_finite_values_are_ignored() {
        let c = classify(&[f64::NAN, 1.0, 2.0, f64::INFINITY], Scheme::EqualInterval, 2);
        assert_bins(&c.bins, &[1.5, 2.0]);
        assert_eq!(c.counts, vec![1, 1]);
        assert!(classify(&[f64::NAN], Scheme::Quantiles, 3).bins.is_empty());
    }

    #[test]
    fn test_labels() {
        let c = classify(&[10.0, 20.0, 30.0, 40.0], Scheme::EqualInterval, 2);
        assert_eq!(c.labels(), vec!["[10.00, 25.00]", "(25.00, 40.00]"]);
    }

    #[test]
    fn test_sampled_schemes_are_deterministic() {
        let values: Vec<f64> = (0..5000).map(|i| ((i * 7919) % 5003) as f64).collect();
        let a = classify(&values, Scheme::FisherJenksSampled, 6);
        let b = classify(&values, Scheme::FisherJenksSampled, 6);
        assert_eq!(a, b);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(a.k(), 6);
        assert_eq!(*a.bins.last().unwrap(), max);
        assert_eq!(a.counts.iter().sum::<usize>(), values.len());
    }

    proptest! {
        #[test]
        fn prop_bins_cover_all_values(
            values in prop::collection::vec(-1.0e6f64..1.0e6, 1..60),
            k in 1usize..9,
            scheme_index in 0usize..14,
        ) {
            let scheme = Scheme::ALL[scheme_index];
            let c = classify(&values, scheme, k);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

            prop_assert!(!c.bins.is_empty());
            prop_assert!(c.bins.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(*c.bins.last().unwrap() >= max);
            prop_assert_eq!(c.counts.iter().sum::<usize>(), values.len());
            if !scheme.ignores_class_count() {
                prop_assert!(c.k() <= k);
            }
        }
    }
}
