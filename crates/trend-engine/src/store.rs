//! In-memory post store.
//!
//! Built once per run from the ingested posts and only read afterwards.
//! Indexed by post id, by source and by normalized title within a source.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use trend_types::{merge_key, Post, PostId};

/// Per-source index.
#[derive(Debug, Default)]
struct SourceIndex {
    /// First spelling of each distinct non-blank title, in ingestion order
    titles: Vec<String>,
    /// Normalized title -> post ids carrying it
    by_title: HashMap<String, Vec<PostId>>,
}

/// Immutable collection of the posts of one run.
#[derive(Debug, Default)]
pub struct PostStore {
    posts: HashMap<PostId, Post>,
    sources: BTreeMap<String, SourceIndex>,
    duplicates_dropped: usize,
}

impl PostStore {
    /// Build a store, keeping the first post seen for each id.
    pub fn new(posts: impl IntoIterator<Item = Post>) -> Self {
        let mut store = Self::default();

        for post in posts {
            if store.posts.contains_key(&post.id) {
                debug!(post_id = %post.id, "Dropping post with duplicate id");
                store.duplicates_dropped += 1;
                continue;
            }

            let index = store.sources.entry(post.source.clone()).or_default();

            let key = merge_key(&post.title);
            if !key.is_empty() {
                let ids = index.by_title.entry(key).or_default();
                if ids.is_empty() {
                    index.titles.push(post.title.trim().to_string());
                }
                ids.push(post.id.clone());
            }

            store.posts.insert(post.id.clone(), post);
        }

        store
    }

    /// Number of stored posts.
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    /// True when no post was ingested.
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Posts rejected because their id was already taken.
    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    /// Look up a post by id.
    pub fn get(&self, id: &str) -> Option<&Post> {
        self.posts.get(id)
    }

    /// Distinct sources in sorted order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Number of distinct sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Distinct titles of one source, as sent to the grouping capability.
    ///
    /// Titles equal after normalization appear once; blank titles never do.
    pub fn titles_for_source(&self, source: &str) -> Vec<String> {
        self.sources
            .get(source)
            .map(|index| index.titles.clone())
            .unwrap_or_default()
    }

    /// Distinct titles across every source, first spelling wins.
    pub fn all_titles(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.sources
            .values()
            .flat_map(|index| index.titles.iter())
            .filter(|title| seen.insert(merge_key(title)))
            .cloned()
            .collect()
    }

    /// Ids of the posts of `source` whose title normalizes like `title`.
    pub fn ids_for_title(&self, source: &str, title: &str) -> &[PostId] {
        self.sources
            .get(source)
            .and_then(|index| index.by_title.get(&merge_key(title)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
