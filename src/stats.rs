use std::collections::{BTreeMap, BTreeSet};

use crate::{error::ReportError, ext::SamplesExt};

/// Means below this are treated as degenerate timings whose deviation is
/// reported as zero.
pub const NEAR_ZERO: f64 = 0.001;

/// Identifies one row of the report: an input file run on a processor count.
/// Ordered by input identifier first, then numerically by processor count.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
  pub input: String,
  pub procs: u32,
}

impl GroupKey {
  pub fn new(input: impl Into<String>, procs: u32) -> Self {
    Self {
      input: input.into(),
      procs,
    }
  }
}

/// Samples of one metric, in the order they were read.
pub type Samples = Vec<f64>;

/// Metric name to samples.
pub type Metrics = BTreeMap<String, Samples>;

/// Every sample collected across all parsed logs, grouped by row, then mode
/// label, then metric name. Entries are only ever added, never removed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Aggregate {
  groups: BTreeMap<GroupKey, BTreeMap<String, Metrics>>,
}

impl Aggregate {
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends `value` to the samples of `metric` under `key` and `mode`,
  /// creating whichever levels do not exist yet.
  pub fn push(&mut self, key: &GroupKey, mode: &str, metric: &str, value: f64) {
    self
      .groups
      .entry(key.clone())
      .or_default()
      .entry(mode.to_string())
      .or_default()
      .entry(metric.to_string())
      .or_default()
      .push(value);
  }

  pub fn samples(&self, key: &GroupKey, mode: &str, metric: &str) -> Option<&[f64]> {
    self.groups.get(key)?.get(mode)?.get(metric).map(Vec::as_slice)
  }

  /// Groups in report order.
  pub fn groups(&self) -> impl Iterator<Item = (&GroupKey, &BTreeMap<String, Metrics>)> {
    self.groups.iter()
  }

  pub fn metric_names(&self) -> BTreeSet<&str> {
    self
      .groups
      .values()
      .flat_map(BTreeMap::values)
      .flat_map(BTreeMap::keys)
      .map(String::as_str)
      .collect()
  }

  pub fn is_empty(&self) -> bool {
    self.groups.is_empty()
  }
}

/// Mean and run-to-run noise of one sample set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary {
  pub mean: f64,
  pub stdev: f64,
}

impl Summary {
  /// Summarizes the samples recorded for `mode`/`metric` under `key`. Missing
  /// entries count as zero samples.
  pub fn of(aggregate: &Aggregate, key: &GroupKey, mode: &str, metric: &str) -> Result<Self, ReportError> {
    let samples = aggregate.samples(key, mode, metric).unwrap_or_default();

    let (Some(mean), Some(stdev)) = (samples.mean(), samples.sample_stdev()) else {
      return Err(ReportError::InsufficientSamples {
        input: key.input.clone(),
        procs: key.procs,
        mode: mode.to_string(),
        metric: metric.to_string(),
        count: samples.len(),
      });
    };

    Ok(Self { mean, stdev })
  }

  /// Coefficient of variation as a whole percentage, truncated toward zero.
  pub fn deviation_percent(&self) -> i64 {
    (self.stdev / self.mean * 100.0) as i64
  }

  /// Like [`Summary::deviation_percent`], but degenerate near-zero means
  /// report `0`.
  pub fn variant_deviation_percent(&self) -> i64 {
    if self.mean < NEAR_ZERO {
      return 0;
    }

    self.deviation_percent()
  }

  /// Difference of this mean relative to `baseline`, in whole percent.
  /// Halves round away from zero.
  pub fn relative_percent(&self, baseline: &Summary) -> i64 {
    ((self.mean - baseline.mean) * 100.0 / baseline.mean).round() as i64
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn aggregate_with(samples: &[f64]) -> (Aggregate, GroupKey) {
    let key = GroupKey::new("graph_large_01", 20);
    let mut aggregate = Aggregate::new();
    for &sample in samples {
      aggregate.push(&key, "unke30 bfs", "exectime", sample);
    }

    (aggregate, key)
  }

  #[test]
  fn keys_order_by_input_then_procs() {
    let mut keys = vec![
      GroupKey::new("b", 1),
      GroupKey::new("a", 40),
      GroupKey::new("a", 10),
      GroupKey::new("a", 9),
    ];
    keys.sort();

    assert_eq!(
      keys,
      vec![
        GroupKey::new("a", 9),
        GroupKey::new("a", 10),
        GroupKey::new("a", 40),
        GroupKey::new("b", 1),
      ]
    );
  }

  #[test]
  fn push_preserves_insertion_order() {
    let (aggregate, key) = aggregate_with(&[3.0, 1.0, 2.0]);

    assert_eq!(aggregate.samples(&key, "unke30 bfs", "exectime"), Some(&[3.0, 1.0, 2.0][..]));
    assert_eq!(aggregate.samples(&key, "pbbs bfs", "exectime"), None);
    assert_eq!(aggregate.metric_names().into_iter().collect::<Vec<_>>(), vec!["exectime"]);
  }

  #[test]
  fn summary_of_two_samples() {
    let (aggregate, key) = aggregate_with(&[4.0, 6.0]);
    let summary = Summary::of(&aggregate, &key, "unke30 bfs", "exectime").unwrap();

    assert_eq!(summary.mean, 5.0);
    assert_eq!(summary.deviation_percent(), 28);
  }

  #[test]
  fn summary_rejects_single_sample() {
    let (aggregate, key) = aggregate_with(&[3.2]);

    match Summary::of(&aggregate, &key, "unke30 bfs", "exectime") {
      Err(ReportError::InsufficientSamples { count, .. }) => assert_eq!(count, 1),
      other => panic!("expected insufficient samples, got {other:?}"),
    }
  }

  #[test]
  fn summary_of_missing_mode_has_zero_samples() {
    let (aggregate, key) = aggregate_with(&[1.0, 2.0]);

    match Summary::of(&aggregate, &key, "pbbs pbfs", "exectime") {
      Err(ReportError::InsufficientSamples { count, .. }) => assert_eq!(count, 0),
      other => panic!("expected insufficient samples, got {other:?}"),
    }
  }

  #[test]
  fn near_zero_mean_has_no_variant_deviation() {
    let summary = Summary {
      mean: 0.0005,
      stdev: 0.0005,
    };

    assert_eq!(summary.variant_deviation_percent(), 0);
    assert_eq!(summary.deviation_percent(), 100);
  }

  #[test]
  fn relative_percent_rounds_halves_away_from_zero() {
    let baseline = Summary {
      mean: 200.0,
      stdev: 0.0,
    };
    let at = |mean| Summary { mean, stdev: 0.0 }.relative_percent(&baseline);

    assert_eq!(at(200.0), 0);
    assert_eq!(at(220.0), 10);
    assert_eq!(at(180.0), -10);
    assert_eq!(at(201.0), 1);
    assert_eq!(at(199.0), -1);
    assert_eq!(at(200.5), 0);
  }
}
