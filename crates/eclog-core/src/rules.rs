//! Ordered first-match-wins rule lists used by the request classifiers.
//!
//! A [`RuleSet`] is plain data: an ordered list of `(label, predicate)` pairs and a fallback
//! label. Classification walks the list top to bottom and returns the label of the first
//! predicate that matches, so rule order is part of the contract (a Chrome user agent also
//! carries a `Safari` token, which is why Chrome is listed first).

use polars::prelude::*;

use crate::error::Result;

/// Fixed categorical label set produced by a classifier.
pub trait CategoryLabel: Copy + Eq + 'static {
    /// Every label the classifier can emit, fallback included.
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    Sensitive,
    /// Input is lowercased once before matching; needles are stored lowercased.
    Insensitive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    ContainsAny(Vec<String>),
    EndsWithAny(Vec<String>),
    Equals(String),
    All(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn contains(needle: &str) -> Self {
        Predicate::ContainsAny(vec![needle.to_string()])
    }

    pub fn contains_any(needles: &[&str]) -> Self {
        Predicate::ContainsAny(needles.iter().map(|needle| needle.to_string()).collect())
    }

    pub fn ends_with_any(suffixes: &[&str]) -> Self {
        Predicate::EndsWithAny(suffixes.iter().map(|suffix| suffix.to_string()).collect())
    }

    pub fn equals(value: &str) -> Self {
        Predicate::Equals(value.to_string())
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::All(mut parts) => {
                parts.push(other);
                Predicate::All(parts)
            }
            first => Predicate::All(vec![first, other]),
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    pub fn matches(&self, haystack: &str) -> bool {
        match self {
            Predicate::ContainsAny(needles) => {
                needles.iter().any(|n| haystack.contains(n.as_str()))
            }
            Predicate::EndsWithAny(suffixes) => {
                suffixes.iter().any(|s| haystack.ends_with(s.as_str()))
            }
            Predicate::Equals(value) => haystack == value,
            Predicate::All(parts) => parts.iter().all(|part| part.matches(haystack)),
            Predicate::Not(inner) => !inner.matches(haystack),
        }
    }

    fn lowercased(self) -> Self {
        match self {
            Predicate::ContainsAny(needles) => {
                Predicate::ContainsAny(needles.into_iter().map(|n| n.to_lowercase()).collect())
            }
            Predicate::EndsWithAny(suffixes) => {
                Predicate::EndsWithAny(suffixes.into_iter().map(|s| s.to_lowercase()).collect())
            }
            Predicate::Equals(value) => Predicate::Equals(value.to_lowercase()),
            Predicate::All(parts) => {
                Predicate::All(parts.into_iter().map(Predicate::lowercased).collect())
            }
            Predicate::Not(inner) => Predicate::Not(Box::new(inner.lowercased())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule<L> {
    pub label: L,
    pub predicate: Predicate,
}

#[derive(Debug, Clone)]
pub struct RuleSet<L> {
    rules: Vec<Rule<L>>,
    fallback: L,
    case_mode: CaseMode,
}

impl<L: CategoryLabel> RuleSet<L> {
    pub fn new(fallback: L, case_mode: CaseMode) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
            case_mode,
        }
    }

    /// Appends a rule; it is consulted after every rule added before it.
    pub fn rule(mut self, label: L, predicate: Predicate) -> Self {
        let predicate = match self.case_mode {
            CaseMode::Sensitive => predicate,
            CaseMode::Insensitive => predicate.lowercased(),
        };
        self.rules.push(Rule { label, predicate });
        self
    }

    pub fn rules(&self) -> &[Rule<L>] {
        &self.rules
    }

    pub fn fallback(&self) -> L {
        self.fallback
    }

    pub fn case_mode(&self) -> CaseMode {
        self.case_mode
    }

    pub fn classify(&self, input: &str) -> L {
        match self.case_mode {
            CaseMode::Sensitive => self.classify_prepared(input),
            CaseMode::Insensitive => self.classify_prepared(&input.to_lowercase()),
        }
    }

    /// Classifies input that has already been normalised for this set's [`CaseMode`].
    pub fn classify_prepared(&self, prepared: &str) -> L {
        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(prepared))
            .map(|rule| rule.label)
            .unwrap_or(self.fallback)
    }
}

/// Maps a nullable string column to a non-null column of category labels, preserving row order.
pub fn label_column<L, F>(name: &str, input: &StringChunked, mut classify: F) -> Series
where
    L: CategoryLabel,
    F: FnMut(Option<&str>) -> L,
{
    let labels: Vec<&'static str> = input
        .into_iter()
        .map(|value| classify(value).as_str())
        .collect();
    Series::new(name.into(), labels)
}

/// Replaces or appends `output_column` with one label per row of `input_column`.
pub fn apply_single_label<L, F>(
    df: &mut DataFrame,
    input_column: &str,
    output_column: &str,
    classify: F,
) -> Result<()>
where
    L: CategoryLabel,
    F: FnMut(Option<&str>) -> L,
{
    let labels = label_column(output_column, df.column(input_column)?.str()?, classify);
    df.with_column(labels)?;
    Ok(())
}

/// Implements `Display` and `FromStr` for label enums in terms of [`CategoryLabel`].
macro_rules! impl_label_text {
    ($($label:ty),+ $(,)?) => {
        $(
            impl std::fmt::Display for $label {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str($crate::rules::CategoryLabel::as_str(self))
                }
            }

            impl std::str::FromStr for $label {
                type Err = String;

                fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
                    <$label as $crate::rules::CategoryLabel>::ALL
                        .iter()
                        .copied()
                        .find(|label| $crate::rules::CategoryLabel::as_str(label) == value)
                        .ok_or_else(|| format!("unknown {} label '{value}'", stringify!($label)))
                }
            }
        )+
    };
}

pub(crate) use impl_label_text;
