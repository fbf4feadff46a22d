use thiserror::Error;

/// Failures while scanning a single log file. Every variant points at the
/// offending line (1-based) so the message can be acted upon directly.
#[derive(Debug, Error)]
pub enum ParseError {
  #[error("{file}:{line}: sample value in {text:?} is not a finite number")]
  MalformedLogLine { file: String, line: usize, text: String },

  #[error("{file}:{line}: malformed {marker} declaration {text:?}")]
  MalformedDeclaration {
    file: String,
    line: usize,
    marker: &'static str,
    text: String,
  },

  #[error("{file}:{line}: section starts before any {missing} declaration")]
  MissingContext {
    file: String,
    line: usize,
    missing: &'static str,
  },
}

#[derive(Debug, Error)]
pub enum ReportError {
  #[error("{input} on {procs} processors: {mode:?} has {count} {metric} sample(s), at least 2 are required")]
  InsufficientSamples {
    input: String,
    procs: u32,
    mode: String,
    metric: String,
    count: usize,
  },

  #[error("{input} on {procs} processors: baseline {mode:?} has a mean {metric} of zero")]
  ZeroBaseline {
    input: String,
    procs: u32,
    mode: String,
    metric: String,
  },

  #[error("baseline {0:?} is not one of the configured variants")]
  UnknownBaseline(String),
}
