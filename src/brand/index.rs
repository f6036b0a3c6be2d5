use std::collections::{BTreeSet, HashMap, HashSet};

/// Inverted index from the first word of an alias to every alias starting
/// with that word.
///
/// Only aliases whose first word appears somewhere in a title can possibly
/// match it, so a title is checked against this subset instead of the whole
/// alias universe.
#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    index: HashMap<String, BTreeSet<String>>,
}

impl CandidateIndex {
    pub fn build<'a, I>(aliases: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut index: HashMap<String, BTreeSet<String>> = HashMap::new();

        for alias in aliases {
            let Some(first_word) = first_token(alias) else {
                continue;
            };
            index
                .entry(first_word)
                .or_default()
                .insert(alias.to_string());
        }

        CandidateIndex { index }
    }

    /// Aliases filed under `token` (already lowercase).
    pub fn get(&self, token: &str) -> Option<&BTreeSet<String>> {
        self.index.get(token)
    }

    /// Deduplicated aliases whose first word occurs in `title`, in title-word
    /// order.
    pub fn potential_brands(&self, title: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut potential = Vec::new();

        for word in title.to_lowercase().split_whitespace() {
            if let Some(brands) = self.index.get(word) {
                for brand in brands {
                    if seen.insert(brand.as_str()) {
                        potential.push(brand.as_str());
                    }
                }
            }
        }

        potential
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// First whitespace-delimited word of `alias`, lowercased.
pub fn first_token(alias: &str) -> Option<String> {
    alias
        .split_whitespace()
        .next()
        .map(|word| word.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALIASES: &[&str] = &["la roche posay", "la prairie", "vichy", "rich", "3c pharma"];

    #[test]
    fn test_every_alias_is_filed_under_its_first_token() {
        let index = CandidateIndex::build(ALIASES.iter().copied());
        for alias in ALIASES {
            let key = first_token(alias).unwrap();
            assert!(index.get(&key).unwrap().contains(*alias));
        }
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_potential_brands_follow_title_words() {
        let index = CandidateIndex::build(ALIASES.iter().copied());

        let potential = index.potential_brands("Vichy cream by La Roche");
        assert_eq!(potential, vec!["vichy", "la prairie", "la roche posay"]);

        let potential = index.potential_brands("RICH rich RICH");
        assert_eq!(potential, vec!["rich"]);
    }

    #[test]
    fn test_empty_title_has_no_candidates() {
        let index = CandidateIndex::build(ALIASES.iter().copied());
        assert!(index.potential_brands("").is_empty());
        assert!(index.potential_brands("   ").is_empty());
        assert!(index.potential_brands("unrelated words").is_empty());
    }
}
