use std::{cmp::Ordering, fmt::Write};

use anyhow::Result;

use crate::{
  error::ReportError,
  ext::{LatexExt, SamplesExt},
  stats::{Aggregate, GroupKey, Summary},
};

const COLUMN_WIDTH: usize = 14;
const COLUMN_PADDING: &str = "  ";

/// Components of the input path, split on `_`, `/` and `.`, that name a row
/// group, e.g. `_data/graph_large_01.adj` becomes `graph_large`.
const LABEL_COMPONENTS: [usize; 2] = [2, 3];

/// Which rows and columns make it into the comparison table.
#[derive(Clone, Debug)]
pub struct Layout {
  pub procs: Vec<u32>,
  /// Column order. Must contain `baseline`.
  pub variants: Vec<String>,
  pub baseline: String,
  pub metric: String,
}

impl Layout {
  fn is_last_procs(&self, procs: u32) -> bool {
    self.procs.last() == Some(&procs)
  }
}

fn group_label(input: &str) -> String {
  let parts = input.split(['_', '/', '.']).collect::<Vec<_>>();

  let label = match LABEL_COMPONENTS.map(|i| parts.get(i)) {
    [Some(first), Some(second)] => format!("{first}_{second}"),
    _ => input.to_string(),
  };

  label.escape_latex()
}

/// Variant labels read `<library> <algorithm>`; columns read the other way
/// around.
fn column_title(variant: &str) -> String {
  variant.split_whitespace().rev().collect::<Vec<_>>().join(" ").escape_latex()
}

fn format_relative(percent: i64) -> String {
  match percent.cmp(&0) {
    Ordering::Equal => "0\\%".to_string(),
    Ordering::Greater => format!("+{percent}\\%"),
    Ordering::Less => format!("{percent}\\%"),
  }
}

fn format_preamble(layout: &Layout) -> String {
  let columns = 2 + layout.variants.len();
  let column_spec = "|c".repeat(columns);
  let titles = ["input".to_string(), "processors".to_string()]
    .into_iter()
    .chain(layout.variants.iter().map(|v| column_title(v)))
    .collect::<Vec<_>>()
    .join(" & ");

  format!("\\begin{{tabular}}{{{column_spec}|}}\n\\hline\n{titles} \\\\\\hline")
}

fn format_row(aggregate: &Aggregate, layout: &Layout, key: &GroupKey) -> Result<String, ReportError> {
  let baseline = Summary::of(aggregate, key, &layout.baseline, &layout.metric)?;
  if baseline.mean == 0.0 {
    return Err(ReportError::ZeroBaseline {
      input: key.input.clone(),
      procs: key.procs,
      mode: layout.baseline.clone(),
      metric: layout.metric.clone(),
    });
  }

  let mut cells = vec![
    key.procs.to_string(),
    format!("{:.3} ({}\\%)", baseline.mean, baseline.deviation_percent()),
  ];

  for variant in layout.variants.iter().filter(|v| **v != layout.baseline) {
    let summary = Summary::of(aggregate, key, variant, &layout.metric)?;
    cells.push(format!(
      "{} ({}\\%)",
      format_relative(summary.relative_percent(&baseline)),
      summary.variant_deviation_percent()
    ));
  }

  let terminator = if layout.is_last_procs(key.procs) {
    "\\hline".to_string()
  } else {
    format!("\\cline{{2-{}}}", 2 + layout.variants.len())
  };

  Ok(format!("& {} \\\\{terminator}", cells.join(" & ")))
}

/// Renders the comparison table as a LaTeX `tabular`. Fails, without partial
/// output, if any retained row lacks enough samples.
pub fn latex(aggregate: &Aggregate, layout: &Layout) -> Result<String> {
  if !layout.variants.contains(&layout.baseline) {
    return Err(ReportError::UnknownBaseline(layout.baseline.clone()).into());
  }

  let rows = aggregate
    .groups()
    .map(|(key, _)| key)
    .filter(|key| layout.procs.contains(&key.procs))
    .collect::<Vec<_>>();

  let mut table = String::new();
  writeln!(table, "{}", format_preamble(layout))?;

  let mut previous_input = None;
  for key in &rows {
    if previous_input != Some(&key.input) {
      previous_input = Some(&key.input);

      let span = rows.iter().filter(|k| k.input == key.input).count();
      writeln!(table, "\\multirow{{{span}}}{{*}}{{{}}}", group_label(&key.input))?;
    }

    writeln!(table, "{}", format_row(aggregate, layout, key)?)?;
  }

  write!(table, "\\end{{tabular}}")?;

  Ok(table)
}

fn format_header<'a, I: IntoIterator<Item = &'a str>>(input_width: usize, columns: I) -> String {
  let header = std::iter::once(format!("{:<input_width$}", "input"))
    .chain(columns.into_iter().map(|col| format!("{col:<COLUMN_WIDTH$}")))
    .collect::<Vec<_>>()
    .join(COLUMN_PADDING);

  format!("{header}\n{}", "=".repeat(header.len()))
}

/// Plain-text listing of everything that was parsed, one line per
/// (group, mode, metric), for checking logs before building a report.
pub fn summary(aggregate: &Aggregate, verbose: bool) -> Result<String> {
  let input_width = aggregate
    .groups()
    .map(|(key, _)| key.input.len())
    .max()
    .unwrap_or(0)
    .max(COLUMN_WIDTH);

  let mut table = String::new();
  writeln!(
    table,
    "{}",
    format_header(input_width, ["processors", "mode", "metric", "samples", "mean", "deviation"])
  )?;

  for (key, modes) in aggregate.groups() {
    for (mode, metrics) in modes {
      for (metric, samples) in metrics {
        let mean = samples.mean().map_or("-".to_string(), |mean| format!("{mean:.3}"));
        let deviation = Summary::of(aggregate, key, mode, metric)
          .map_or("-".to_string(), |summary| format!("{}%", summary.deviation_percent()));

        let row = [
          format!("{:<input_width$}", key.input),
          format!("{:<COLUMN_WIDTH$}", key.procs),
          format!("{mode:<COLUMN_WIDTH$}"),
          format!("{metric:<COLUMN_WIDTH$}"),
          format!("{:>COLUMN_WIDTH$}", samples.len()),
          format!("{mean:>COLUMN_WIDTH$}"),
          format!("{deviation:>COLUMN_WIDTH$}"),
        ]
        .join(COLUMN_PADDING);

        writeln!(table, "{}", row.trim_end())?;

        if verbose {
          let listed = samples.iter().map(f64::to_string).collect::<Vec<_>>().join(", ");
          writeln!(table, "{:<input_width$}{COLUMN_PADDING}[{listed}]", "")?;
        }
      }
    }
  }

  Ok(table)
}
