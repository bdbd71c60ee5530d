//! Cross-source cluster merging.
//!
//! Clusters emitted independently per source are unified when their names
//! share a merge key. Matching is exact after normalization; near-duplicate
//! names stay separate.

use std::collections::BTreeMap;

use trend_types::{MergedCluster, SourceCluster};

/// Merge same-named source clusters.
///
/// Member ids and sources are unioned. The display name is the
/// lexicographically smallest trimmed spelling seen for a key, so the
/// result does not depend on input order. Output is sorted by merge key;
/// clusters left without members are dropped.
pub fn merge_clusters(clusters: &[SourceCluster]) -> Vec<MergedCluster> {
    let mut merged: BTreeMap<String, MergedCluster> = BTreeMap::new();

    for cluster in clusters {
        let key = cluster.key();
        let name = cluster.name.trim();

        let entry = merged.entry(key.clone()).or_insert_with(|| MergedCluster {
            name: name.to_string(),
            key,
            post_ids: Default::default(),
            sources: Default::default(),
        });

        if name < entry.name.as_str() {
            entry.name = name.to_string();
        }
        entry.post_ids.extend(cluster.post_ids.iter().cloned());
        entry.sources.insert(cluster.source.clone());
    }

    merged
        .into_values()
        .filter(|cluster| !cluster.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(name: &str, source: &str, ids: &[&str]) -> SourceCluster {
        SourceCluster::new(name, source).with_posts(ids.iter().copied())
    }

    #[test]
    fn test_merges_same_name_across_sources() {
        let merged = merge_clusters(&[
            cluster("Gemini 3 Launch", "MachineLearning", &["a", "b"]),
            cluster("gemini 3  launch", "LocalLLaMA", &["c"]),
            cluster("RAG", "LocalLLaMA", &["d"]),
        ]);

        assert_eq!(merged.len(), 2);
        let gemini = &merged[0];
        assert_eq!(gemini.key, "gemini 3 launch");
        assert_eq!(gemini.name, "Gemini 3 Launch");
        assert_eq!(gemini.len(), 3);
        assert_eq!(gemini.sources.len(), 2);
    }

    #[test]
    fn test_near_duplicates_stay_apart() {
        let merged = merge_clusters(&[
            cluster("RAG vs Fine-Tuning", "a", &["1"]),
            cluster("RAG versus Fine Tuning", "b", &["2"]),
        ]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_member_ids_deduplicated() {
        let merged = merge_clusters(&[
            cluster("Agents", "a", &["1", "2"]),
            cluster("Agents", "a", &["2", "3"]),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].len(), 3);
        assert_eq!(merged[0].sources.len(), 1);
    }

    #[test]
    fn test_order_independent() {
        let input = vec![
            cluster("agents", "a", &["1"]),
            cluster("Agents", "b", &["2"]),
            cluster("Vector DBs", "b", &["3"]),
        ];
        let mut reversed = input.clone();
        reversed.reverse();

        let forward = merge_clusters(&input);
        assert_eq!(forward, merge_clusters(&reversed));
        assert_eq!(forward[0].name, "Agents");
    }

    #[test]
    fn test_idempotent_on_repeated_input() {
        let input = vec![cluster("Agents", "a", &["1"]), cluster("RAG", "b", &["2"])];
        let doubled: Vec<_> = input.iter().chain(input.iter()).cloned().collect();
        assert_eq!(merge_clusters(&input), merge_clusters(&doubled));
    }

    #[test]
    fn test_empty_clusters_dropped() {
        let merged = merge_clusters(&[cluster("Nothing", "a", &[])]);
        assert!(merged.is_empty());
    }
}
