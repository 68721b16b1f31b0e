//! Batch statistics over latency samples. Nothing here is incremental: every
//! function takes the full sample set.

/// Copy of `samples` sorted ascending. Stable, so equal values keep their
/// relative order.
pub fn sorted(samples: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Linear-interpolation percentile over already-sorted data.
/// `p` is in `0..=100` and is clamped into that range. Returns `None` for an
/// empty slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = p.clamp(0.0, 100.0) / 100.0 * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * weight)
}

/// Linear-interpolation percentile of unsorted `samples`; `p = 50` is the median.
pub fn percentile(samples: &[f64], p: f64) -> Option<f64> {
    percentile_sorted(&sorted(samples), p)
}

pub fn median(samples: &[f64]) -> Option<f64> {
    percentile(samples, 50.0)
}

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

pub fn max(samples: &[f64]) -> Option<f64> {
    samples.iter().copied().reduce(f64::max)
}

/// Signed percentage by which `b` is below `a`, relative to `a`.
/// Called as `percent_difference(direct, proxy)`, a positive result means the
/// proxy was faster.
pub fn percent_difference(a: f64, b: f64) -> f64 {
    (a - b) * 100.0 / a
}

/// Empirical CDF: the i-th smallest value (1-indexed) maps to `i / n`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalCdf {
    pub values: Vec<f64>,
    pub fractions: Vec<f64>,
}

impl EmpiricalCdf {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(value, cumulative fraction)` pairs in ascending value order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.values.iter().copied().zip(self.fractions.iter().copied())
    }
}

pub fn compute_empirical_cdf(samples: &[f64]) -> EmpiricalCdf {
    let values = sorted(samples);
    let n = values.len() as f64;
    let fractions = (1..=values.len()).map(|i| i as f64 / n).collect();
    EmpiricalCdf { values, fractions }
}

/// The five statistics shown for each source. Also used to hold the
/// per-statistic percent differences between two sources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileSet {
    pub median: f64,
    pub p95: f64,
    pub p99: f64,
    pub p9999: f64,
    pub max: f64,
}

impl PercentileSet {
    /// `None` when `samples` is empty.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let sorted = sorted(samples);
        Some(Self {
            median: percentile_sorted(&sorted, 50.0)?,
            p95: percentile_sorted(&sorted, 95.0)?,
            p99: percentile_sorted(&sorted, 99.0)?,
            p9999: percentile_sorted(&sorted, 99.99)?,
            max: *sorted.last()?,
        })
    }

    /// Display label and value of each statistic, in display order.
    pub fn labeled(&self) -> [(&'static str, f64); 5] {
        [
            ("median", self.median),
            ("95th", self.p95),
            ("99th", self.p99),
            ("99.99th", self.p9999),
            ("max", self.max),
        ]
    }
}

/// Direct and proxied statistics side by side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonReport {
    pub direct: PercentileSet,
    pub proxy: PercentileSet,
}

impl ComparisonReport {
    /// `None` unless both sources have at least one sample.
    pub fn from_samples(direct: &[f64], proxy: &[f64]) -> Option<Self> {
        Some(Self {
            direct: PercentileSet::from_samples(direct)?,
            proxy: PercentileSet::from_samples(proxy)?,
        })
    }

    /// `percent_difference(direct, proxy)` for each statistic.
    pub fn speedup(&self) -> PercentileSet {
        let (d, p) = (&self.direct, &self.proxy);
        PercentileSet {
            median: percent_difference(d.median, p.median),
            p95: percent_difference(d.p95, p.p95),
            p99: percent_difference(d.p99, p.p99),
            p9999: percent_difference(d.p9999, p.p9999),
            max: percent_difference(d.max, p.max),
        }
    }

    /// Text block overlaid on the chart.
    pub fn stats_text(&self) -> String {
        let mut out = String::new();
        for (title, set) in [
            ("Direct request latency", &self.direct),
            ("Proxy request latency", &self.proxy),
        ] {
            out.push_str(&format!("{title}:\n"));
            for (label, value) in set.labeled() {
                out.push_str(&format!("  {label}: {value:.1}ms\n"));
            }
            out.push('\n');
        }
        out.push_str("Percentage speed up:\n");
        let lines: Vec<String> = self
            .speedup()
            .labeled()
            .iter()
            .map(|(label, value)| format!("  {label}: {value:+.1}%"))
            .collect();
        out.push_str(&lines.join("\n"));
        out
    }
}
