#[extend::ext(name = SamplesExt)]
pub impl [f64] {
  /// Arithmetic mean, or `None` for an empty slice.
  fn mean(&self) -> Option<f64> {
    if self.is_empty() {
      return None;
    }

    Some(self.iter().sum::<f64>() / self.len() as f64)
  }

  /// Sample standard deviation (Bessel-corrected), or `None` with fewer than
  /// two samples.
  fn sample_stdev(&self) -> Option<f64> {
    if self.len() < 2 {
      return None;
    }

    let mean = self.mean()?;
    let squares = self.iter().map(|x| (x - mean).powi(2)).sum::<f64>();

    Some((squares / (self.len() - 1) as f64).sqrt())
  }
}

#[extend::ext(name = LatexExt)]
pub impl str {
  /// Escapes the characters LaTeX treats specially in running text.
  fn escape_latex(&self) -> String {
    let mut escaped = String::with_capacity(self.len());
    for c in self.chars() {
      match c {
        '_' | '&' | '%' | '$' | '#' | '{' | '}' => {
          escaped.push('\\');
          escaped.push(c);
        }
        '~' => escaped.push_str("\\textasciitilde{}"),
        '^' => escaped.push_str("\\textasciicircum{}"),
        '\\' => escaped.push_str("\\textbackslash{}"),
        c => escaped.push(c),
      }
    }

    escaped
  }
}
