//! Pattern types for expect operations.
//!
//! A pattern is a literal string, a regular expression, or one of two
//! sentinels: [`Pattern::Eof`] resolves when the stream ends and
//! [`Pattern::Timeout`] resolves when the deadline passes. The position of a
//! pattern in its [`PatternSet`] is its index in the resulting match.

use std::fmt;

use regex::Regex;

use crate::encoding::Codec;
use crate::error::{ExpectError, Result};

/// A pattern that can be matched against session output.
#[derive(Clone)]
pub enum Pattern {
    /// Match an exact string.
    Literal(String),

    /// Match a regular expression (leftmost-first semantics).
    Regex(CompiledRegex),

    /// Resolve when the transport reports end of stream.
    Eof,

    /// Resolve when the expect deadline passes.
    Timeout,
}

impl Pattern {
    /// Create a literal pattern.
    #[must_use]
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }

    /// Compile a regex pattern.
    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)?;
        Ok(Self::Regex(CompiledRegex::new(regex)))
    }

    /// The end-of-stream sentinel.
    #[must_use]
    pub const fn eof() -> Self {
        Self::Eof
    }

    /// The timeout sentinel.
    #[must_use]
    pub const fn timeout() -> Self {
        Self::Timeout
    }

    /// Whether this is one of the sentinels.
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        matches!(self, Self::Eof | Self::Timeout)
    }

    /// Check if this is the EOF sentinel.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// Check if this is the timeout sentinel.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// The pattern source for display purposes.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) => s,
            Self::Regex(r) => r.as_str(),
            Self::Eof => "<EOF>",
            Self::Timeout => "<TIMEOUT>",
        }
    }

    /// Locate the earliest match in `text`. Sentinels never match text.
    #[must_use]
    pub fn find(&self, text: &str) -> Option<PatternMatch> {
        match self {
            Self::Literal(s) => text.find(s.as_str()).map(|start| PatternMatch {
                start,
                end: start + s.len(),
            }),
            Self::Regex(r) => r.regex.find(text).map(|m| PatternMatch {
                start: m.start(),
                end: m.end(),
            }),
            Self::Eof | Self::Timeout => None,
        }
    }

    /// Fail if the pattern's text cannot be represented in `codec`.
    ///
    /// Output decoded by such a codec can never contain the pattern.
    pub fn check_codec(&self, codec: Codec) -> Result<()> {
        match self {
            Self::Literal(s) => codec.check(s),
            Self::Regex(r) => codec.check(r.as_str()),
            Self::Eof | Self::Timeout => Ok(()),
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "Literal({s:?})"),
            Self::Regex(r) => write!(f, "Regex({:?})", r.as_str()),
            Self::Eof => f.write_str("Eof"),
            Self::Timeout => f.write_str("Timeout"),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "{s:?}"),
            Self::Regex(r) => write!(f, "/{}/", r.as_str()),
            Self::Eof | Self::Timeout => f.write_str(self.as_str()),
        }
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Self::Literal(s.to_string())
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Self::Literal(s)
    }
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        Self::Regex(CompiledRegex::new(regex))
    }
}

/// A compiled regular expression.
#[derive(Clone)]
pub struct CompiledRegex {
    regex: Regex,
}

impl CompiledRegex {
    /// Wrap a compiled regex.
    #[must_use]
    pub const fn new(regex: Regex) -> Self {
        Self { regex }
    }

    /// The source pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Capture groups of the leftmost-first match starting at `start`.
    ///
    /// Group 0 is the whole match.
    #[must_use]
    pub fn captures_at(&self, text: &str, start: usize) -> Vec<Option<String>> {
        self.regex
            .captures_at(text, start)
            .map(|caps| {
                caps.iter()
                    .map(|m| m.map(|m| m.as_str().to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Location of a pattern's match in the searched text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch {
    /// Start byte offset.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl PatternMatch {
    /// The matched text.
    #[must_use]
    pub fn as_str<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// An ordered set of patterns for multi-pattern matching.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<NamedPattern>,
}

/// A pattern with an optional name used in diagnostics.
#[derive(Debug, Clone)]
pub struct NamedPattern {
    /// The pattern.
    pub pattern: Pattern,
    /// Optional name.
    pub name: Option<String>,
}

impl PatternSet {
    /// Create an empty pattern set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pattern set from patterns, in order.
    #[must_use]
    pub fn from_patterns(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        patterns.into_iter().collect()
    }

    /// Append a pattern.
    pub fn add(&mut self, pattern: impl Into<Pattern>) -> &mut Self {
        self.patterns.push(NamedPattern {
            pattern: pattern.into(),
            name: None,
        });
        self
    }

    /// Append a named pattern.
    pub fn add_named(&mut self, name: impl Into<String>, pattern: impl Into<Pattern>) -> &mut Self {
        self.patterns.push(NamedPattern {
            pattern: pattern.into(),
            name: Some(name.into()),
        });
        self
    }

    /// Number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Get a pattern by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&NamedPattern> {
        self.patterns.get(index)
    }

    /// Iterate over the patterns in order.
    pub fn iter(&self) -> impl Iterator<Item = &NamedPattern> {
        self.patterns.iter()
    }

    /// Index of the first EOF sentinel.
    #[must_use]
    pub fn eof_index(&self) -> Option<usize> {
        self.patterns.iter().position(|p| p.pattern.is_eof())
    }

    /// Index of the first timeout sentinel.
    #[must_use]
    pub fn timeout_index(&self) -> Option<usize> {
        self.patterns.iter().position(|p| p.pattern.is_timeout())
    }

    /// Byte length of the longest literal pattern.
    #[must_use]
    pub fn longest_literal(&self) -> usize {
        self.patterns
            .iter()
            .filter_map(|p| match &p.pattern {
                Pattern::Literal(s) => Some(s.len()),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Find the winning pattern in `text`.
    ///
    /// The match with the smallest start offset wins. When several
    /// patterns match at the same offset the earliest-declared one wins,
    /// whatever its kind or match length.
    #[must_use]
    pub fn find_match(&self, text: &str) -> Option<(usize, PatternMatch)> {
        let mut best: Option<(usize, PatternMatch)> = None;

        for (idx, named) in self.patterns.iter().enumerate() {
            let Some(m) = named.pattern.find(text) else {
                continue;
            };
            match best {
                Some((_, current)) if m.start >= current.start => {}
                _ => best = Some((idx, m)),
            }
        }

        best
    }

    /// Check every pattern against the session codec.
    pub fn check_codec(&self, codec: Codec) -> Result<()> {
        self.patterns
            .iter()
            .try_for_each(|p| p.pattern.check_codec(codec))
    }

    /// Fail on an empty set.
    pub(crate) fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(ExpectError::invalid_pattern("expect called with no patterns"));
        }
        Ok(())
    }

    /// Human-readable summary, used in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        self.patterns
            .iter()
            .map(|p| match &p.name {
                Some(name) => format!("{name} ({})", p.pattern),
                None => p.pattern.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl FromIterator<Pattern> for PatternSet {
    fn from_iter<I: IntoIterator<Item = Pattern>>(iter: I) -> Self {
        Self {
            patterns: iter
                .into_iter()
                .map(|pattern| NamedPattern {
                    pattern,
                    name: None,
                })
                .collect(),
        }
    }
}

impl From<Pattern> for PatternSet {
    fn from(pattern: Pattern) -> Self {
        Self::from_patterns([pattern])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(patterns: &[&str]) -> PatternSet {
        patterns.iter().map(|&p| Pattern::from(p)).collect()
    }

    #[test]
    fn literal_pattern_matches() {
        let m = Pattern::literal("world").find("hello world").unwrap();
        assert_eq!((m.start, m.end), (6, 11));
        assert_eq!(m.as_str("hello world"), "world");
    }

    #[test]
    fn regex_pattern_is_leftmost_first() {
        let pattern = Pattern::regex(r"a|ab").unwrap();
        let m = pattern.find("xab").unwrap();
        assert_eq!((m.start, m.end), (1, 2));
    }

    #[test]
    fn sentinels_never_match_text() {
        assert!(Pattern::eof().find("<EOF>").is_none());
        assert!(Pattern::timeout().find("anything").is_none());
    }

    #[test]
    fn incomplete_literal_loses_to_complete_one() {
        let (idx, m) = set(&["abc", "ab"]).find_match("ab").unwrap();
        assert_eq!(idx, 1);
        assert_eq!((m.start, m.end), (0, 2));
    }

    #[test]
    fn earliest_position_wins() {
        let (idx, _) = set(&["xyz", "ab"]).find_match("xab").unwrap();
        assert_eq!(idx, 1);

        let (idx, _) = set(&["later", "early"]).find_match("early later").unwrap();
        assert_eq!(idx, 1);
    }

    #[test]
    fn tie_goes_to_first_declared() {
        let (idx, m) = set(&["a", "ab"]).find_match("ab").unwrap();
        assert_eq!(idx, 0);
        assert_eq!(m.end, 1);

        let (idx, _) = set(&["ab", "a"]).find_match("ab").unwrap();
        assert_eq!(idx, 0);
    }

    #[test]
    fn tie_ignores_pattern_kind() {
        let mut patterns = PatternSet::new();
        patterns.add(Pattern::regex(r"\d+").unwrap()).add("12");
        let (idx, m) = patterns.find_match("x123").unwrap();
        assert_eq!(idx, 0);
        assert_eq!((m.start, m.end), (1, 4));
    }

    #[test]
    fn sentinel_indices() {
        let patterns = PatternSet::from_patterns([
            Pattern::literal("$ "),
            Pattern::eof(),
            Pattern::timeout(),
        ]);
        assert_eq!(patterns.eof_index(), Some(1));
        assert_eq!(patterns.timeout_index(), Some(2));
        assert_eq!(set(&["x"]).eof_index(), None);
    }

    #[test]
    fn longest_literal_in_bytes() {
        assert_eq!(set(&["ab", "åå"]).longest_literal(), 4);
        assert_eq!(PatternSet::from(Pattern::eof()).longest_literal(), 0);
    }

    #[test]
    fn codec_check_rejects_unrepresentable_literal() {
        assert!(set(&["Aårgh"]).check_codec(Codec::Utf8).is_ok());
        assert!(matches!(
            set(&["Aårgh"]).check_codec(Codec::Raw),
            Err(ExpectError::Encoding { .. })
        ));
    }

    #[test]
    fn captures_include_whole_match() {
        let Pattern::Regex(r) = Pattern::regex(r"(\w+)=(\d+)?").unwrap() else {
            unreachable!()
        };
        assert_eq!(
            r.captures_at("k=", 0),
            vec![Some("k=".to_string()), Some("k".to_string()), None]
        );
    }

    #[test]
    fn describe_uses_names() {
        let mut patterns = PatternSet::new();
        patterns.add_named("prompt", "$ ").add(Pattern::eof());
        assert_eq!(patterns.describe(), "prompt (\"$ \") | <EOF>");
    }
}
