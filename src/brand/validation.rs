//! Heuristic validation of brand matches.
//!
//! A term match alone produces false positives for brands named after common
//! words. Each word of a candidate alias is checked against the title with the
//! rules below; an alias survives only if all of its words pass all rules and
//! something remains once ignorable words are stripped. Survivors are ordered
//! by where they first appear in the title.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::normalizer::to_basic_ascii;

/// Word lists driving the validation rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicRules {
    // Dropped from an alias before the emptiness check
    pub ignore_words: Vec<String>,
    // Must be the first word of the title
    pub front_words: Vec<String>,
    // Must be the first or second word of the title
    pub first_or_second_words: Vec<String>,
    // Must be written exactly with this capitalization
    pub exact_capitalized_words: Vec<String>,
}

impl Default for HeuristicRules {
    fn default() -> Self {
        HeuristicRules {
            ignore_words: to_strings(&["BIO", "NEB"]),
            front_words: to_strings(&[
                "RICH", "RFF", "flex", "ultra", "gum", "beauty", "orto", "free", "112", "kin",
                "happy",
            ]),
            first_or_second_words: to_strings(&["heel", "contour", "nero", "rsv"]),
            exact_capitalized_words: to_strings(&["HAPPY"]),
        }
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn contains_ignore_case(list: &[String], word: &str) -> bool {
    let lowered = word.to_lowercase();
    list.iter().any(|w| w.to_lowercase() == lowered)
}

impl HeuristicRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules with no word lists; every alias passes except the empty one.
    pub fn empty() -> Self {
        HeuristicRules {
            ignore_words: Vec::new(),
            front_words: Vec::new(),
            first_or_second_words: Vec::new(),
            exact_capitalized_words: Vec::new(),
        }
    }

    pub fn with_ignore_words(mut self, words: Vec<String>) -> Self {
        self.ignore_words = words;
        self
    }

    pub fn with_front_words(mut self, words: Vec<String>) -> Self {
        self.front_words = words;
        self
    }

    pub fn with_first_or_second_words(mut self, words: Vec<String>) -> Self {
        self.first_or_second_words = words;
        self
    }

    pub fn with_exact_capitalized_words(mut self, words: Vec<String>) -> Self {
        self.exact_capitalized_words = words;
        self
    }

    pub fn is_ignore_word(&self, word: &str) -> bool {
        contains_ignore_case(&self.ignore_words, word)
    }

    /// Remove ignore words from `brand`, e.g. `BIO Company` → `Company`.
    pub fn deduct_ignore_word(&self, brand: &str) -> String {
        brand
            .split_whitespace()
            .filter(|w| !self.is_ignore_word(w))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// A front word only validates when it is also the first word of the
    /// title. Any other word passes.
    pub fn is_starts_with_front_word(&self, brand_word: &str, front_title_word: Option<&str>) -> bool {
        if !contains_ignore_case(&self.front_words, brand_word) {
            return true;
        }

        front_title_word
            .map(|first| first.to_lowercase() == brand_word.to_lowercase())
            .unwrap_or(false)
    }

    /// A first-or-second word must first occur at position 0 or 1 of the
    /// title. Any other word passes.
    pub fn is_contains_first_or_second_word(&self, brand_word: &str, title_words: &[&str]) -> bool {
        if !contains_ignore_case(&self.first_or_second_words, brand_word) {
            return true;
        }

        let lowered = brand_word.to_lowercase();
        matches!(
            title_words.iter().position(|w| w.to_lowercase() == lowered),
            Some(0) | Some(1)
        )
    }

    /// A word listed as exact must use the listed capitalization. Any other
    /// word passes.
    pub fn is_valid_exact_capitalized_word(&self, word: &str) -> bool {
        if contains_ignore_case(&self.exact_capitalized_words, word) {
            self.exact_capitalized_words.iter().any(|w| w == word)
        } else {
            true
        }
    }

    /// Every word of `brand` must pass the capitalization, front word and
    /// first-or-second word rules against `title`.
    pub fn validate_brand_position(&self, title: &str, brand: &str) -> bool {
        let title_words: Vec<&str> = title.split_whitespace().collect();
        let front = title_words.first().copied();

        brand.split_whitespace().all(|w| {
            self.is_valid_exact_capitalized_word(w)
                && self.is_starts_with_front_word(w, front)
                && self.is_contains_first_or_second_word(w, &title_words)
        })
    }

    /// Keep the candidates that pass position validation on the
    /// diacritic-normalized title and that are not made only of ignore words.
    pub fn filter_matches_by_validation<S: AsRef<str>>(
        &self,
        matched_brands: Vec<S>,
        product_title: &str,
    ) -> Vec<S> {
        let normalized_title = to_basic_ascii(product_title);

        matched_brands
            .into_iter()
            .filter(|brand| {
                let normalized_brand = to_basic_ascii(brand.as_ref());
                self.validate_brand_position(&normalized_title, &normalized_brand)
                    && !self.deduct_ignore_word(&normalized_brand).is_empty()
            })
            .collect()
    }
}

fn find_brand_position(title: &str, brand: &str) -> Option<usize> {
    title.find(&brand.to_lowercase())
}

/// Stable-sort matches by their first case-insensitive position in the title.
/// Brands that cannot be located go last.
pub fn prioritize_by_position<S: AsRef<str>>(matched_brands: &mut [S], product_title: &str) {
    let lowered_title = product_title.to_lowercase();
    matched_brands.sort_by(|a, b| {
        let pa = find_brand_position(&lowered_title, a.as_ref());
        let pb = find_brand_position(&lowered_title, b.as_ref());
        match (pa, pb) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}
