use std::fmt;

use polars::prelude::PolarsError;

/// Placeholder tokens accepted in a line pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardToken {
    /// `*` – variants become siblings on the same canvas.
    Broadcast,
    /// `**` – every variant gets its own canvas.
    FanOut,
}

impl WildcardToken {
    pub fn as_str(self) -> &'static str {
        match self {
            WildcardToken::Broadcast => "*",
            WildcardToken::FanOut => "**",
        }
    }

    /// Fan-out copies lines into independent groups, broadcast keeps them together.
    pub fn copies_lines(self) -> bool {
        matches!(self, WildcardToken::FanOut)
    }

    pub fn matches(self, field: &str) -> bool {
        field == self.as_str()
    }

    /// `true` if `value` is any wildcard token.
    pub fn is_token(value: &str) -> bool {
        WildcardToken::FanOut.matches(value) || WildcardToken::Broadcast.matches(value)
    }
}

impl fmt::Display for WildcardToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One histogram series source: `tree, energy, signal, analysis`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub fields: Vec<String>,
}

impl Line {
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Index of the first field equal to `token`.
    pub fn wildcard_position(&self, token: WildcardToken) -> Option<usize> {
        self.fields.iter().position(|f| token.matches(f))
    }

    /// Copy of this line with field `index` replaced by `value`.
    pub fn with_field(&self, index: usize, value: &str) -> Self {
        let mut fields = self.fields.clone();
        fields[index] = value.to_string();
        Self { fields }
    }

    /// The four concrete fields, or `None` if the line is malformed or still wildcarded.
    pub fn concrete(&self) -> Option<(&str, &str, &str, &str)> {
        if self.fields.len() != 4 || self.fields.iter().any(|f| WildcardToken::is_token(f)) {
            return None;
        }
        Some((
            self.fields[0].as_str(),
            self.fields[1].as_str(),
            self.fields[2].as_str(),
            self.fields[3].as_str(),
        ))
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.fields.join(","))
    }
}

/// Lines overlaid on one canvas.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlotGroup {
    pub lines: Vec<Line>,
    /// Values a line-copying pass substituted to create this group, in order.
    pub fan_out: Vec<String>,
}

impl PlotGroup {
    pub fn new(lines: Vec<Line>) -> Self {
        Self {
            lines,
            fan_out: Vec::new(),
        }
    }
}

impl fmt::Display for PlotGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.lines.iter().map(ToString::to_string).collect();
        write!(f, "{}", lines.join(";"))
    }
}

/// The four category lists wildcards are resolved against, by field position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Domains {
    pub trees: Vec<String>,
    pub energies: Vec<String>,
    pub signals: Vec<String>,
    pub analyses: Vec<String>,
}

impl Domains {
    pub fn for_position(&self, index: usize) -> &[String] {
        match index {
            0 => &self.trees,
            1 => &self.energies,
            2 => &self.signals,
            3 => &self.analyses,
            _ => &[],
        }
    }

    pub fn name_of(index: usize) -> &'static str {
        match index {
            0 => "tree",
            1 => "energy",
            2 => "signal",
            3 => "analysis",
            _ => "unknown",
        }
    }
}

pub fn polars_err(e: Box<dyn std::error::Error + Send + Sync>) -> PolarsError {
    PolarsError::ComputeError(e.to_string().into())
}
