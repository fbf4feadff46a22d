mod error;
mod ext;
mod format;
mod parse;
mod stats;

use std::{collections::BTreeSet, fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use self::{
  format::Layout,
  parse::{LogParser, OnMalformed},
  stats::Aggregate,
};

const DEFAULT_PROCS: [u32; 6] = [1, 10, 20, 30, 39, 40];
const DEFAULT_VARIANTS: [&str; 6] = [
  "pbbs bfs",
  "unke30 bfs",
  "unke100 bfs",
  "pbbs pbfs",
  "unke30 pbfs",
  "unke100 pbfs",
];

/// A log file and the algorithm it benchmarks.
#[derive(Clone, Debug)]
struct Log {
  tag: String,
  path: PathBuf,
}

fn parse_log(arg: &str) -> Result<Log, String> {
  match arg.split_once('=') {
    Some((tag, path)) if !tag.is_empty() && !path.is_empty() => Ok(Log {
      tag: tag.to_string(),
      path: PathBuf::from(path),
    }),
    _ => Err(format!("expected TAG=PATH, got {arg:?}")),
  }
}

#[derive(Parser)]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(clap::Args, Debug)]
struct Logs {
  /// Logs to read, each tagged with the algorithm it benchmarks, e.g.
  /// `bfs=bfs.log pbfs=pbfs.log`.
  #[arg(required = true, value_name = "TAG=PATH", value_parser = parse_log)]
  logs: Vec<Log>,
  /// Only inputs whose name contains this are recorded.
  #[arg(long, default_value = "large")]
  filter: String,
  /// What to do with sample values that are not numbers.
  #[arg(long, value_enum, default_value_t = OnMalformed::Fail)]
  on_malformed: OnMalformed,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Prints a LaTeX table comparing every variant against the baseline.
  Report {
    #[command(flatten)]
    logs: Logs,
    /// Metric to compare.
    #[arg(long, default_value = "exectime")]
    metric: String,
    /// Processor counts to include, in row order.
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_PROCS)]
    procs: Vec<u32>,
    /// Variant columns, in order.
    #[arg(long, value_delimiter = ',', default_values = DEFAULT_VARIANTS)]
    variants: Vec<String>,
    /// Variant the others are measured against.
    #[arg(long, default_value = DEFAULT_VARIANTS[0])]
    baseline: String,
  },
  /// Lists every parsed series with its sample count, mean, and deviation.
  Summary {
    #[command(flatten)]
    logs: Logs,
    /// Metrics to record.
    #[arg(long = "metric", default_value = "exectime")]
    metrics: Vec<String>,
    /// Also list the individual samples.
    #[arg(short, long)]
    verbose: bool,
  },
}

/// Reads every log up front, then parses them in order into one aggregate.
fn load(logs: &Logs, metrics: &BTreeSet<String>) -> Result<Aggregate> {
  let texts = logs
    .logs
    .iter()
    .map(|log| fs::read_to_string(&log.path).with_context(|| format!("read {:?}", log.path)))
    .collect::<Result<Vec<_>>>()?;

  let mut aggregate = Aggregate::new();
  for (log, text) in logs.logs.iter().zip(&texts) {
    eprintln!("parsing {:?} as {}", log.path, log.tag);

    let recorded = LogParser::new(&log.tag, metrics, &logs.filter)
      .on_malformed(logs.on_malformed)
      .parse(&log.path.to_string_lossy(), text, &mut aggregate)
      .with_context(|| format!("parse {:?}", log.path))?;

    eprintln!("  recorded {recorded} samples");
  }

  if aggregate.is_empty() {
    eprintln!("no samples recorded for inputs matching {:?}", logs.filter);
  } else {
    let found = aggregate.metric_names();
    for metric in metrics.iter().filter(|m| !found.contains(m.as_str())) {
      eprintln!("no {metric:?} samples in any log");
    }
  }

  Ok(aggregate)
}

fn main() -> Result<()> {
  match Args::parse().command {
    Command::Report {
      logs,
      metric,
      procs,
      variants,
      baseline,
    } => {
      let aggregate = load(&logs, &BTreeSet::from([metric.clone()])).context("load")?;
      let layout = Layout {
        procs,
        variants,
        baseline,
        metric,
      };

      println!("{}", format::latex(&aggregate, &layout).context("format")?);
    }
    Command::Summary {
      logs,
      metrics,
      verbose,
    } => {
      let aggregate = load(&logs, &metrics.into_iter().collect()).context("load")?;

      print!("{}", format::summary(&aggregate, verbose).context("format")?);
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use clap::CommandFactory;
  use tempfile::NamedTempFile;

  use super::*;

  fn log_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
  }

  fn runs(prog: &str, lib_type: &str, samples: &[f64]) -> String {
    samples
      .iter()
      .map(|sample| {
        format!(
          "==========\nprog {prog}\ninfile _data/graph_large_01.adj\nproc 20\nlib_type {lib_type}\n\
           ----------\nexectime {sample}\nutilization 0.9\n==========\n"
        )
      })
      .collect()
  }

  #[test]
  fn args_are_well_formed() {
    Args::command().debug_assert();
  }

  #[test]
  fn log_args_need_a_tag() {
    assert!(parse_log("bfs.log").is_err());
    assert!(parse_log("=bfs.log").is_err());

    let log = parse_log("bfs=logs/bfs.log").unwrap();
    assert_eq!(log.tag, "bfs");
    assert_eq!(log.path, PathBuf::from("logs/bfs.log"));
  }

  #[test]
  fn report_defaults() {
    let args = Args::try_parse_from(["pbench-report", "report", "bfs=a.log", "pbfs=b.log"]).unwrap();

    let Command::Report {
      logs,
      metric,
      procs,
      variants,
      baseline,
    } = args.command
    else {
      panic!("expected report");
    };

    assert_eq!(logs.logs.len(), 2);
    assert_eq!(logs.filter, "large");
    assert_eq!(logs.on_malformed, OnMalformed::Fail);
    assert_eq!(metric, "exectime");
    assert_eq!(procs, DEFAULT_PROCS);
    assert_eq!(variants, DEFAULT_VARIANTS);
    assert_eq!(baseline, "pbbs bfs");
  }

  #[test]
  fn reports_two_logs() {
    let bfs = log_file(&[runs("./bfs.seq", "pbbs", &[2.0, 2.0]), runs("./bfs.unke30", "pctl", &[3.0, 3.0])].concat());
    let pbfs = log_file(&runs("./pbfs.unke30", "pctl", &[1.0, 1.0]));

    let args = Args::try_parse_from([
      "pbench-report".to_string(),
      "report".to_string(),
      format!("bfs={}", bfs.path().display()),
      format!("pbfs={}", pbfs.path().display()),
      "--procs=20".to_string(),
      "--variants=pbbs bfs,unke30 bfs,unke30 pbfs".to_string(),
    ])
    .unwrap();
    let Command::Report {
      logs,
      metric,
      procs,
      variants,
      baseline,
    } = args.command
    else {
      panic!("expected report");
    };

    let aggregate = load(&logs, &BTreeSet::from([metric.clone()])).unwrap();
    assert_eq!(aggregate.metric_names().into_iter().collect::<Vec<_>>(), vec!["exectime"]);

    let layout = Layout {
      procs,
      variants,
      baseline,
      metric,
    };
    let table = format::latex(&aggregate, &layout).unwrap();

    assert!(table.contains("& 20 & 2.000 (0\\%) & +50\\% (0\\%) & -50\\% (0\\%) \\\\\\hline"));
  }

  #[test]
  fn unreadable_log_fails_before_parsing() {
    let args = Args::try_parse_from(["pbench-report", "summary", "bfs=/nonexistent/bfs.log"]).unwrap();
    let Command::Summary { logs, .. } = args.command else {
      panic!("expected summary");
    };

    assert!(load(&logs, &BTreeSet::new()).is_err());
  }
}
