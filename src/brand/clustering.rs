//! Brand alias graph and manufacturer clustering.
//!
//! Every association row links a primary alias to each of its secondary
//! aliases. Aliases connected through any chain of associations name the same
//! manufacturer and share one canonical brand: the smallest alias of the
//! cluster under plain ordinal string ordering.

use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::{debug, warn};

use super::types::BrandAssociation;
use super::TARGET_BRAND;

/// Undirected alias graph. Nodes keep the order in which they were first seen.
#[derive(Debug, Clone, Default)]
pub struct AliasGraph {
    nodes: Vec<String>,
    lookup: HashMap<String, usize>,
    edges: Vec<BTreeSet<usize>>,
}

impl AliasGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_associations(associations: &[BrandAssociation]) -> Self {
        let mut graph = AliasGraph::new();

        for association in associations {
            let (primary, secondaries) = association.normalized_pairs();
            if primary.is_empty() {
                warn!(
                    target: TARGET_BRAND,
                    "Skipping association without a primary alias: {:?}", association.secondaries
                );
                continue;
            }

            graph.add_alias(&primary);
            for secondary in &secondaries {
                graph.add_edge(&primary, secondary);
            }
        }

        debug!(
            target: TARGET_BRAND,
            "Built alias graph with {} aliases from {} associations",
            graph.len(),
            associations.len()
        );

        graph
    }

    fn add_alias(&mut self, alias: &str) -> usize {
        if let Some(&idx) = self.lookup.get(alias) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(alias.to_string());
        self.lookup.insert(alias.to_string(), idx);
        self.edges.push(BTreeSet::new());
        idx
    }

    /// Insert a bidirectional edge, creating either node if needed.
    pub fn add_edge(&mut self, a: &str, b: &str) {
        let ia = self.add_alias(a);
        let ib = self.add_alias(b);
        self.edges[ia].insert(ib);
        self.edges[ib].insert(ia);
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.lookup.contains_key(alias)
    }

    /// All aliases in first-seen order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn neighbors(&self, alias: &str) -> Vec<&str> {
        match self.lookup.get(alias) {
            Some(&idx) => self.edges[idx]
                .iter()
                .map(|&n| self.nodes[n].as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Connected components of an [`AliasGraph`].
#[derive(Debug, Clone, Default)]
pub struct BrandClusters {
    alias_to_cluster: HashMap<String, usize>,
    clusters: Vec<Vec<String>>,
}

impl BrandClusters {
    pub fn cluster_of(&self, alias: &str) -> Option<usize> {
        self.alias_to_cluster.get(alias).copied()
    }

    /// Aliases of one cluster, in BFS discovery order.
    pub fn members(&self, cluster_id: usize) -> &[String] {
        self.clusters
            .get(cluster_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.clusters
            .iter()
            .enumerate()
            .map(|(id, members)| (id, members.as_slice()))
    }
}

/// Breadth-first search from every unvisited alias. Cluster ids are assigned
/// in discovery order.
pub fn find_brand_clusters(graph: &AliasGraph) -> BrandClusters {
    let mut cluster_of_node: Vec<Option<usize>> = vec![None; graph.nodes.len()];
    let mut clusters: Vec<Vec<String>> = Vec::new();

    for start in 0..graph.nodes.len() {
        if cluster_of_node[start].is_some() {
            continue;
        }

        let cluster_id = clusters.len();
        let mut members = Vec::new();
        let mut queue = VecDeque::from([start]);
        cluster_of_node[start] = Some(cluster_id);

        while let Some(current) = queue.pop_front() {
            members.push(graph.nodes[current].clone());
            for &related in &graph.edges[current] {
                if cluster_of_node[related].is_none() {
                    cluster_of_node[related] = Some(cluster_id);
                    queue.push_back(related);
                }
            }
        }

        clusters.push(members);
    }

    let alias_to_cluster = graph
        .nodes
        .iter()
        .zip(cluster_of_node)
        .filter_map(|(alias, cluster)| cluster.map(|id| (alias.clone(), id)))
        .collect();

    BrandClusters {
        alias_to_cluster,
        clusters,
    }
}

/// Total mapping from alias to the canonical alias of its cluster.
#[derive(Debug, Clone, Default)]
pub struct CanonicalMap {
    map: HashMap<String, String>,
}

impl CanonicalMap {
    /// Canonical brand for `alias`; aliases outside the graph map to themselves.
    pub fn resolve<'a>(&'a self, alias: &'a str) -> &'a str {
        self.map.get(alias).map(String::as_str).unwrap_or(alias)
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.map.get(alias).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

pub fn build_canonical_mapping(graph: &AliasGraph) -> CanonicalMap {
    canonical_mapping_from_clusters(&find_brand_clusters(graph))
}

pub fn canonical_mapping_from_clusters(clusters: &BrandClusters) -> CanonicalMap {
    let mut map = HashMap::with_capacity(clusters.alias_to_cluster.len());

    for (_, members) in clusters.iter() {
        let Some(canonical) = members.iter().min() else {
            continue;
        };
        for alias in members {
            map.insert(alias.clone(), canonical.clone());
        }
    }

    CanonicalMap { map }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_from(pairs: &[(&str, &str)]) -> AliasGraph {
        let associations: Vec<BrandAssociation> = pairs
            .iter()
            .map(|(primary, secondaries)| BrandAssociation::new(primary, secondaries))
            .collect();
        AliasGraph::from_associations(&associations)
    }

    #[test]
    fn test_connected_brands_share_cluster() {
        let graph = graph_from(&[
            ("a", "b;c"),
            ("b", "a;c"),
            ("c", "a;b"),
            ("d", "d"),
        ]);
        let clusters = find_brand_clusters(&graph);

        assert_eq!(clusters.cluster_of("a"), clusters.cluster_of("b"));
        assert_eq!(clusters.cluster_of("b"), clusters.cluster_of("c"));
        assert_ne!(clusters.cluster_of("d"), clusters.cluster_of("a"));
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters.cluster_of("a"), Some(0));
    }

    #[test]
    fn test_canonical_is_smallest_alias() {
        let graph = graph_from(&[
            ("3chenes", "3c pharma;3chenes"),
            ("3c pharma", "3chenes;3c pharma"),
        ]);
        let canonical = build_canonical_mapping(&graph);

        assert_eq!(canonical.resolve("3chenes"), "3c pharma");
        assert_eq!(canonical.resolve("3c pharma"), "3c pharma");
    }

    #[test]
    fn test_single_brand_cluster() {
        let graph = graph_from(&[("112", "112")]);
        let canonical = build_canonical_mapping(&graph);
        assert_eq!(canonical.resolve("112"), "112");
        assert_eq!(canonical.len(), 1);
    }

    #[test]
    fn test_unknown_alias_maps_to_itself() {
        let graph = graph_from(&[("avene", "eau thermale avene")]);
        let canonical = build_canonical_mapping(&graph);
        assert_eq!(canonical.resolve("bioderma"), "bioderma");
        assert_eq!(canonical.get("bioderma"), None);
    }

    #[test]
    fn test_transitive_connection_through_primary() {
        // x and z are never listed together but both link to y
        let graph = graph_from(&[("y", "x"), ("z", "y"), ("q", "r")]);
        let canonical = build_canonical_mapping(&graph);

        assert_eq!(canonical.resolve("z"), canonical.resolve("x"));
        assert_eq!(canonical.resolve("z"), "x");
        assert_ne!(canonical.resolve("q"), canonical.resolve("x"));
    }

    #[test]
    fn test_canonical_mapping_is_idempotent() {
        let graph = graph_from(&[
            ("la roche posay", "la roche-posay;lrp"),
            ("vichy", "vichy laboratoires"),
            ("lrp", "l'oreal"),
        ]);
        let canonical = build_canonical_mapping(&graph);

        for alias in graph.aliases() {
            let once = canonical.resolve(alias);
            assert_eq!(canonical.resolve(once), once);
        }
    }

    #[test]
    fn test_graph_is_symmetric() {
        let graph = graph_from(&[("avene", "pierre fabre;eau thermale avene")]);
        for alias in graph.aliases() {
            for neighbor in graph.neighbors(alias) {
                assert!(graph.neighbors(neighbor).contains(&alias));
            }
        }
        // secondaries only link through the primary
        assert!(!graph.neighbors("pierre fabre").contains(&"eau thermale avene"));
    }

    #[test]
    fn test_malformed_associations_are_absorbed() {
        let associations = vec![
            BrandAssociation::new("solo", ""),
            BrandAssociation::new("", "orphan"),
            BrandAssociation::new("Loop", "loop; LOOP"),
        ];
        let graph = AliasGraph::from_associations(&associations);
        let canonical = build_canonical_mapping(&graph);

        assert!(graph.contains("solo"));
        assert!(!graph.contains("orphan"));
        assert!(!graph.contains(""));
        assert_eq!(canonical.resolve("solo"), "solo");
        assert_eq!(canonical.resolve("loop"), "loop");
    }

    #[test]
    fn test_ordinal_ordering_of_canonical() {
        let mut graph = AliasGraph::new();
        graph.add_edge("beta", "Alpha");
        graph.add_edge("beta", "alpha");
        let canonical = build_canonical_mapping(&graph);
        // uppercase sorts before lowercase
        assert_eq!(canonical.resolve("alpha"), "Alpha");
    }
}
