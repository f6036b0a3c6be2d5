use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the manufacturer association table.
///
/// `secondaries` holds a `;`-delimited list of aliases that name the same
/// manufacturer as `primary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandAssociation {
    #[serde(rename = "manufacturer_p1")]
    pub primary: String,

    #[serde(rename = "manufacturers_p2", default)]
    pub secondaries: String,
}

impl BrandAssociation {
    pub fn new(primary: &str, secondaries: &str) -> Self {
        BrandAssociation {
            primary: primary.to_string(),
            secondaries: secondaries.to_string(),
        }
    }

    /// Lowercased primary alias and the trimmed, non-empty secondary aliases.
    pub fn normalized_pairs(&self) -> (String, Vec<String>) {
        let primary = self.primary.to_lowercase().trim().to_string();
        let secondaries = self
            .secondaries
            .to_lowercase()
            .split(';')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        (primary, secondaries)
    }
}

/// A catalog item as the resolver sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    // Database ID, 0 for items that were never stored
    #[serde(default)]
    pub item_id: i64,

    // ID of the item at its source site
    #[serde(alias = "source_id")]
    pub source_item_id: String,

    #[serde(default)]
    pub title: String,

    // Identity of a previous match; such items are skipped
    #[serde(default, alias = "m_id", skip_serializing_if = "Option::is_none")]
    pub existing_match_id: Option<String>,
}

impl CatalogItem {
    pub fn new(item_id: i64, source_item_id: &str, title: &str) -> Self {
        CatalogItem {
            item_id,
            source_item_id: source_item_id.to_string(),
            title: title.to_string(),
            existing_match_id: None,
        }
    }

    pub fn with_existing_match(mut self, match_id: &str) -> Self {
        self.existing_match_id = Some(match_id.to_string());
        self
    }

    pub fn is_matched(&self) -> bool {
        self.existing_match_id.is_some()
    }
}

/// Outcome of resolving a single title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    // Validated aliases, best first
    pub matched_brands: Vec<String>,

    // Canonical brand of the first matched alias
    pub final_brand: Option<String>,
}

/// Result record for one processed catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub item_id: i64,
    pub source_item_id: String,
    pub matched_brands: Vec<String>,
    pub final_brand: Option<String>,
    pub record_id: String,
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> [{}] -> Final: {}",
            self.source_item_id,
            self.matched_brands.join(", "),
            self.final_brand.as_deref().unwrap_or("none")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_pairs() {
        let association = BrandAssociation::new("3Chenes", " 3C Pharma ; 3chenes;;");
        let (primary, secondaries) = association.normalized_pairs();
        assert_eq!(primary, "3chenes");
        assert_eq!(secondaries, vec!["3c pharma", "3chenes"]);
    }

    #[test]
    fn test_association_json_field_names() {
        let json = r#"{"manufacturer_p1": "Avene", "manufacturers_p2": "eau thermale avene;pierre fabre"}"#;
        let association: BrandAssociation = serde_json::from_str(json).unwrap();
        assert_eq!(association.primary, "Avene");
        assert_eq!(association.secondaries, "eau thermale avene;pierre fabre");
    }

    #[test]
    fn test_catalog_item_accepts_source_shape() {
        let json = r#"{"source_id": "A-17", "title": "RICH chocolate", "m_id": "abc"}"#;
        let item: CatalogItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.source_item_id, "A-17");
        assert_eq!(item.item_id, 0);
        assert!(item.is_matched());

        let json = r#"{"source_item_id": "B-1"}"#;
        let item: CatalogItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.title, "");
        assert!(!item.is_matched());
    }
}
