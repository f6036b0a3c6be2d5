use tracing::{debug, info};

use super::clustering::{
    canonical_mapping_from_clusters, find_brand_clusters, AliasGraph, BrandClusters, CanonicalMap,
};
use super::index::CandidateIndex;
use super::matching::TermMatcher;
use super::types::{BrandAssociation, Resolution};
use super::validation::{prioritize_by_position, HeuristicRules};
use super::TARGET_BRAND;

/// Every intermediate step of resolving one title, for inspection.
#[derive(Debug, Clone, Default)]
pub struct ResolutionTrace {
    pub candidates: Vec<String>,
    pub term_matches: Vec<String>,
    pub validated: Vec<String>,
    pub final_brand: Option<String>,
}

/// Lookup tables built once per run from the association table.
///
/// Nothing is mutated after construction, so one resolver can be shared by
/// reference (or through an `Arc`) between any number of chunks and workers.
#[derive(Debug, Clone)]
pub struct BrandResolver {
    graph: AliasGraph,
    clusters: BrandClusters,
    canonical: CanonicalMap,
    index: CandidateIndex,
    matcher: TermMatcher,
    rules: HeuristicRules,
}

impl BrandResolver {
    pub fn from_associations(associations: &[BrandAssociation], rules: HeuristicRules) -> Self {
        let graph = AliasGraph::from_associations(associations);
        let clusters = find_brand_clusters(&graph);
        let canonical = canonical_mapping_from_clusters(&clusters);
        let index = CandidateIndex::build(graph.aliases());
        let matcher = TermMatcher::new(graph.aliases());

        info!(
            target: TARGET_BRAND,
            "Brand resolver ready: {} aliases in {} clusters, {} index keys",
            graph.len(),
            clusters.len(),
            index.len()
        );

        BrandResolver {
            graph,
            clusters,
            canonical,
            index,
            matcher,
            rules,
        }
    }

    pub fn rules(&self) -> &HeuristicRules {
        &self.rules
    }

    pub fn graph(&self) -> &AliasGraph {
        &self.graph
    }

    pub fn clusters(&self) -> &BrandClusters {
        &self.clusters
    }

    pub fn canonical_map(&self) -> &CanonicalMap {
        &self.canonical
    }

    pub fn index(&self) -> &CandidateIndex {
        &self.index
    }

    pub fn canonical_brand<'a>(&'a self, alias: &'a str) -> &'a str {
        self.canonical.resolve(alias)
    }

    /// All aliases sharing a cluster with `alias`, or an empty list for
    /// unknown aliases.
    pub fn cluster_members(&self, alias: &str) -> &[String] {
        match self.clusters.cluster_of(&alias.to_lowercase()) {
            Some(id) => self.clusters.members(id),
            None => &[],
        }
    }

    /// Resolve `title` to its validated brand matches and canonical brand.
    pub fn resolve_title(&self, title: &str) -> Resolution {
        let trace = self.explain(title);
        Resolution {
            matched_brands: trace.validated,
            final_brand: trace.final_brand,
        }
    }

    pub fn explain(&self, title: &str) -> ResolutionTrace {
        let candidates = self.index.potential_brands(title);

        let term_matches: Vec<&str> = candidates
            .iter()
            .copied()
            .filter(|brand| self.matcher.is_separate_term(title, brand))
            .collect();

        let mut validated = self
            .rules
            .filter_matches_by_validation(term_matches.clone(), title);
        prioritize_by_position(&mut validated, title);

        let final_brand = validated
            .first()
            .map(|brand| self.canonical.resolve(brand).to_string());

        debug!(
            target: TARGET_BRAND,
            "'{}': {} candidates, {} term matches, {} validated, final {:?}",
            title,
            candidates.len(),
            term_matches.len(),
            validated.len(),
            final_brand
        );

        ResolutionTrace {
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
            term_matches: term_matches.iter().map(|s| s.to_string()).collect(),
            validated: validated.iter().map(|s| s.to_string()).collect(),
            final_brand,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> BrandResolver {
        let associations = vec![
            BrandAssociation::new("La Roche Posay", "la roche-posay;L'Oreal Dermatological"),
            BrandAssociation::new("Avene", "eau thermale avene;pierre fabre"),
            BrandAssociation::new("3chenes", "3c pharma;3chenes"),
            BrandAssociation::new("RICH", "rich"),
            BrandAssociation::new("Ultra", "ultra"),
            BrandAssociation::new("BIO NEB", "bio neb"),
            BrandAssociation::new("Heel", "heel"),
        ];
        BrandResolver::from_associations(&associations, HeuristicRules::default())
    }

    #[test]
    fn test_resolves_to_canonical_brand() {
        let resolver = resolver();

        let resolution = resolver.resolve_title("3Chenes vitamin complex 30 caps");
        assert_eq!(resolution.matched_brands, vec!["3chenes"]);
        assert_eq!(resolution.final_brand.as_deref(), Some("3c pharma"));

        let resolution = resolver.resolve_title("Eau Thermale Avene cicalfate cream");
        assert_eq!(resolution.matched_brands, vec!["eau thermale avene", "avene"]);
        assert_eq!(resolution.final_brand.as_deref(), Some("avene"));
    }

    #[test]
    fn test_front_word_brand_position() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve_title("RICH chocolate").final_brand.as_deref(),
            Some("rich")
        );
        assert_eq!(resolver.resolve_title("chocolate RICH").final_brand, None);
    }

    #[test]
    fn test_earliest_brand_wins() {
        let resolver = resolver();
        let resolution = resolver.resolve_title("heel balm with avene water");
        assert_eq!(resolution.matched_brands, vec!["heel", "avene"]);
        assert_eq!(resolution.final_brand.as_deref(), Some("heel"));
    }

    #[test]
    fn test_noise_only_alias_is_rejected() {
        let resolver = resolver();
        let trace = resolver.explain("BIO NEB shampoo");
        assert_eq!(trace.term_matches, vec!["bio neb"]);
        assert!(trace.validated.is_empty());
        assert_eq!(trace.final_brand, None);
    }

    #[test]
    fn test_empty_title() {
        let resolver = resolver();
        assert_eq!(resolver.resolve_title(""), Resolution::default());
    }

    #[test]
    fn test_cluster_members_and_canonical() {
        let resolver = resolver();
        let members = resolver.cluster_members("Pierre Fabre");
        assert_eq!(members.len(), 3);
        assert!(members.iter().any(|m| m == "avene"));
        assert_eq!(resolver.canonical_brand("pierre fabre"), "avene");
        assert_eq!(resolver.canonical_brand("unknown brand"), "unknown brand");
        assert!(resolver.cluster_members("unknown brand").is_empty());
    }
}
