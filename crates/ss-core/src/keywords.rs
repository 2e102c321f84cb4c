//! Keyword normalization and matcher compilation
//!
//! The backend serves a flat list of phrases. Before use the list is
//! normalized into a [`KeywordSet`] (trimmed, lowercased, deduplicated,
//! sorted) and compiled into one case-insensitive alternation. Word-boundary
//! anchors are only emitted on the sides where the keyword starts or ends
//! with a word character, so punctuation-led keywords still match when glued
//! to neighbouring words.

use regex::{Regex, RegexBuilder};

/// Error type for matcher compilation.
#[derive(Debug, thiserror::Error)]
pub enum KeywordError {
    #[error("Failed to compile keyword pattern: {0}")]
    Pattern(#[from] regex::Error),
}

// =============================================================================
// Keyword Set
// =============================================================================

/// Normalized keyword list.
///
/// Always sorted and deduplicated, so two sets built from the same phrases in
/// any order compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    /// Normalize a raw keyword list.
    pub fn normalize<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keywords: Vec<String> = raw
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        keywords.sort();
        keywords.dedup();
        Self { keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keywords
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.keywords
    }

    /// Compile into a matcher. Returns `None` for an empty set.
    pub fn compile(&self) -> Result<Option<CompiledMatcher>, KeywordError> {
        match build_pattern(self) {
            Some(pattern) => CompiledMatcher::new(pattern).map(Some),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Pattern Building
// =============================================================================

/// Word character test used for boundary placement (Unicode-aware `\w`).
#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Build the regex source for a single keyword.
///
/// Metacharacters are escaped and whitespace runs become `\s+`, so
/// `"bad   word"` in a page still matches the keyword `"bad word"`.
pub fn keyword_pattern(keyword: &str) -> Option<String> {
    let keyword = keyword.trim();
    let first = keyword.chars().next()?;
    let last = keyword.chars().next_back()?;

    let body = keyword
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");

    let mut pattern = String::with_capacity(body.len() + 4);
    if is_word_char(first) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&body);
    if is_word_char(last) {
        pattern.push_str(r"\b");
    }
    Some(pattern)
}

/// Build the alternation over every keyword in the set.
///
/// Longer keywords are tried first so a phrase wins over a keyword that is
/// its prefix (`"kill all"` before `"kill"`).
pub fn build_pattern(set: &KeywordSet) -> Option<String> {
    let mut ordered: Vec<&str> = set.iter().collect();
    ordered.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });

    let alternatives: Vec<String> = ordered.into_iter().filter_map(keyword_pattern).collect();
    if alternatives.is_empty() {
        return None;
    }
    Some(alternatives.join("|"))
}

// =============================================================================
// Compiled Matcher
// =============================================================================

/// A run of text produced by [`CompiledMatcher::segments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text between matches, kept verbatim
    Plain(&'a str),
    /// Matched keyword occurrence
    Match(&'a str),
}

impl<'a> Segment<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            Self::Plain(t) | Self::Match(t) => t,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match(_))
    }
}

/// Read-only matcher derived from a [`KeywordSet`].
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    regex: Regex,
}

impl CompiledMatcher {
    /// Compile a pattern built by [`build_pattern`].
    pub fn new(pattern: String) -> Result<Self, KeywordError> {
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .unicode(true)
            .build()?;
        Ok(Self { regex })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// All matched substrings, left to right.
    pub fn find_all<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.regex.find_iter(text).map(|m| m.as_str()).collect()
    }

    /// Split `text` into plain and matched runs, in order.
    ///
    /// Concatenating every segment's text yields `text` back unchanged.
    /// Empty plain runs are omitted.
    pub fn segments<'t>(&self, text: &'t str) -> Vec<Segment<'t>> {
        let mut segments = Vec::new();
        let mut cursor = 0;

        for m in self.regex.find_iter(text) {
            if m.start() > cursor {
                segments.push(Segment::Plain(&text[cursor..m.start()]));
            }
            segments.push(Segment::Match(m.as_str()));
            cursor = m.end();
        }

        if cursor < text.len() {
            segments.push(Segment::Plain(&text[cursor..]));
        }

        segments
    }
}
