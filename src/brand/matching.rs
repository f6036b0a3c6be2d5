use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

use super::TARGET_BRAND;

/// Compiled patterns deciding whether one brand appears in a title as a term
/// of its own rather than inside a longer word.
#[derive(Debug, Clone)]
pub struct BrandPattern {
    // brand delimited by whitespace at the start, the end or in the middle
    at_beginning_or_end: Regex,
    // brand bounded by word boundaries anywhere
    separate_term: Regex,
}

impl BrandPattern {
    pub fn new(brand: &str) -> Result<Self, regex::Error> {
        let escaped = regex::escape(brand);
        Ok(BrandPattern {
            at_beginning_or_end: Regex::new(&format!(
                r"(?i)^(?:{escaped}\s|.*\s{escaped}\s.*|.*\s{escaped})$"
            ))?,
            separate_term: Regex::new(&format!(r"(?i)\b{escaped}\b"))?,
        })
    }

    pub fn is_at_beginning_or_end(&self, title: &str) -> bool {
        self.at_beginning_or_end.is_match(title)
    }

    pub fn is_separate_term(&self, title: &str) -> bool {
        self.separate_term.is_match(title)
    }

    pub fn matches(&self, title: &str) -> bool {
        self.is_at_beginning_or_end(title) || self.is_separate_term(title)
    }
}

/// Check if `brand` is a separate term in `title`, compiling the patterns on
/// the spot. Prefer [`TermMatcher`] when checking many titles.
pub fn is_separate_term(title: &str, brand: &str) -> bool {
    match BrandPattern::new(brand) {
        Ok(pattern) => pattern.matches(title),
        Err(e) => {
            warn!(target: TARGET_BRAND, "Unusable brand pattern for '{}': {}", brand, e);
            false
        }
    }
}

/// Term matcher with one precompiled [`BrandPattern`] per known alias.
#[derive(Debug, Clone, Default)]
pub struct TermMatcher {
    patterns: HashMap<String, BrandPattern>,
}

impl TermMatcher {
    pub fn new<'a, I>(aliases: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut patterns = HashMap::new();
        for alias in aliases {
            if patterns.contains_key(alias) {
                continue;
            }
            match BrandPattern::new(alias) {
                Ok(pattern) => {
                    patterns.insert(alias.to_string(), pattern);
                }
                Err(e) => {
                    warn!(target: TARGET_BRAND, "Unusable brand pattern for '{}': {}", alias, e);
                }
            }
        }
        TermMatcher { patterns }
    }

    pub fn is_separate_term(&self, title: &str, brand: &str) -> bool {
        match self.patterns.get(brand) {
            Some(pattern) => pattern.matches(title),
            None => is_separate_term(title, brand),
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
