use std::collections::BTreeSet;

use crate::{
  error::ParseError,
  stats::{Aggregate, GroupKey},
};

/// Library type whose runs keep the program's own name in the mode label.
/// Every other library type is reported as the `pbbs` reference.
const PCTL_LIB_TYPE: &str = "pctl";
const PBBS_LABEL: &str = "pbbs";

/// What to do with a requested sample whose value is not a number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OnMalformed {
  /// Abort the whole run.
  #[default]
  Fail,
  /// Warn on stderr and drop the sample.
  Skip,
}

/// Lines that update the parse context, keyed by their leading token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Declaration {
  InputFile,
  Program,
  LibType,
  Processors,
}

const DECLARATIONS: &[(&str, Declaration)] = &[
  ("infile", Declaration::InputFile),
  ("prog", Declaration::Program),
  ("lib_type", Declaration::LibType),
  ("proc", Declaration::Processors),
];

impl Declaration {
  fn of(tokens: &[&str]) -> Option<Self> {
    let first = *tokens.first()?;
    let first = first.strip_suffix(':').unwrap_or(first);

    DECLARATIONS.iter().find(|(token, _)| *token == first).map(|&(_, decl)| decl)
  }

  fn token(self) -> &'static str {
    DECLARATIONS
      .iter()
      .find(|&&(_, decl)| decl == self)
      .map_or("?", |&(token, _)| token)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transition {
  Enter,
  Leave,
}

/// Section boundaries are lines made of a single repeated character.
const BOUNDARIES: &[(char, Transition)] = &[('-', Transition::Enter), ('=', Transition::Leave)];

/// Shortest run of boundary characters accepted as a section marker.
const MIN_BOUNDARY_LEN: usize = 3;

impl Transition {
  fn of(line: &str) -> Option<Self> {
    let line = line.trim();
    let first = line.chars().next()?;

    if line.len() < MIN_BOUNDARY_LEN || !line.chars().all(|c| c == first) {
      return None;
    }

    BOUNDARIES.iter().find(|&&(c, _)| c == first).map(|&(_, transition)| transition)
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum State {
  Outside,
  /// Inside a data section. The key is captured when the section starts and
  /// does not follow later declarations.
  Inside(GroupKey),
}

/// Declarations seen so far. Normally fresh for every log, but a caller may
/// carry one across several logs with [`LogParser::parse_with`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Context {
  pub input: Option<String>,
  pub mode: Option<String>,
  pub procs: Option<u32>,
}

/// Position of the line being parsed, for error reporting.
struct At<'a> {
  file: &'a str,
  line: usize,
  text: &'a str,
}

impl At<'_> {
  fn missing(&self, missing: &'static str) -> ParseError {
    ParseError::MissingContext {
      file: self.file.to_string(),
      line: self.line,
      missing,
    }
  }

  fn malformed(&self, decl: Declaration) -> ParseError {
    ParseError::MalformedDeclaration {
      file: self.file.to_string(),
      line: self.line,
      marker: decl.token(),
      text: self.text.to_string(),
    }
  }
}

impl Context {
  fn group_key(&self, at: &At) -> Result<GroupKey, ParseError> {
    let input = self.input.as_ref().ok_or_else(|| at.missing(Declaration::InputFile.token()))?;
    let procs = self.procs.ok_or_else(|| at.missing(Declaration::Processors.token()))?;

    Ok(GroupKey::new(input.clone(), procs))
  }

  fn declare(&mut self, decl: Declaration, tokens: &[&str], mode_tag: &str, at: &At) -> Result<(), ParseError> {
    let second = tokens.get(1).copied().ok_or_else(|| at.malformed(decl));

    match decl {
      Declaration::InputFile => self.input = Some(second?.to_string()),
      Declaration::Program => {
        second?;
        // `./bfs.unke30` runs the `unke30` variant.
        self.mode = tokens
          .last()
          .and_then(|program| program.rsplit('.').next())
          .map(str::to_string);
      }
      Declaration::LibType => {
        let label = if second? == PCTL_LIB_TYPE {
          self.mode.as_deref().ok_or_else(|| at.missing(Declaration::Program.token()))?
        } else {
          PBBS_LABEL
        };
        self.mode = Some(format!("{label} {mode_tag}"));
      }
      Declaration::Processors => {
        let procs = second?.parse::<u32>().map_err(|_| at.malformed(decl))?;
        self.procs = Some(procs);
      }
    }

    Ok(())
  }
}

/// Scans benchmark logs, recording the requested metrics of every data section
/// whose input matches `filter`.
pub struct LogParser<'a> {
  mode_tag: &'a str,
  metrics: &'a BTreeSet<String>,
  filter: &'a str,
  on_malformed: OnMalformed,
}

impl<'a> LogParser<'a> {
  pub fn new(mode_tag: &'a str, metrics: &'a BTreeSet<String>, filter: &'a str) -> Self {
    Self {
      mode_tag,
      metrics,
      filter,
      on_malformed: OnMalformed::default(),
    }
  }

  pub fn on_malformed(mut self, on_malformed: OnMalformed) -> Self {
    self.on_malformed = on_malformed;
    self
  }

  /// Parses one log with a fresh context, returning the number of samples
  /// recorded into `aggregate`. `file` only labels errors.
  pub fn parse(&self, file: &str, text: &str, aggregate: &mut Aggregate) -> Result<usize, ParseError> {
    self.parse_with(&mut Context::default(), file, text, aggregate)
  }

  /// Like [`LogParser::parse`], but starts from (and leaves behind) the
  /// declarations in `context`.
  pub fn parse_with(
    &self,
    context: &mut Context,
    file: &str,
    text: &str,
    aggregate: &mut Aggregate,
  ) -> Result<usize, ParseError> {
    let mut state = State::Outside;
    let mut recorded = 0;

    for (index, line) in text.lines().enumerate() {
      let at = At {
        file,
        line: index + 1,
        text: line,
      };
      let tokens = line.split_whitespace().collect::<Vec<_>>();

      if let Some(decl) = Declaration::of(&tokens) {
        context.declare(decl, &tokens, self.mode_tag, &at)?;
      }

      match Transition::of(line) {
        Some(Transition::Enter) => {
          state = State::Inside(context.group_key(&at)?);
          continue;
        }
        Some(Transition::Leave) => {
          state = State::Outside;
          continue;
        }
        None => {}
      }

      let State::Inside(key) = &state else {
        continue;
      };

      if self.sample(context, key, &tokens, &at, aggregate)? {
        recorded += 1;
      }
    }

    Ok(recorded)
  }

  /// Records a `<metric...> <value>` line. Returns whether a sample was added.
  fn sample(
    &self,
    context: &Context,
    key: &GroupKey,
    tokens: &[&str],
    at: &At,
    aggregate: &mut Aggregate,
  ) -> Result<bool, ParseError> {
    let Some((value, name)) = tokens.split_last() else {
      return Ok(false);
    };

    let name = name.join(" ");
    let metric = name.strip_suffix(':').unwrap_or(&name);
    if !self.metrics.contains(metric) || !key.input.contains(self.filter) {
      return Ok(false);
    }

    // `nan` and `inf` parse, but would poison every statistic of the row.
    let value = match value.parse::<f64>().ok().filter(|v| v.is_finite()) {
      Some(value) => value,
      None => match self.on_malformed {
        OnMalformed::Fail => {
          return Err(ParseError::MalformedLogLine {
            file: at.file.to_string(),
            line: at.line,
            text: at.text.to_string(),
          })
        }
        OnMalformed::Skip => {
          eprintln!("  skipping {}:{}: {:?} is not a finite number", at.file, at.line, value);
          return Ok(false);
        }
      },
    };

    let mode = context.mode.as_deref().ok_or_else(|| at.missing(Declaration::Program.token()))?;
    aggregate.push(key, mode, metric, value);

    Ok(true)
  }
}
