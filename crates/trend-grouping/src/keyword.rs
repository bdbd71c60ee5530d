//! Deterministic offline grouper.
//!
//! Each title joins the group of its most widely shared significant word
//! across the batch. Useful for dry runs and tests without API calls.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;

use crate::{GroupingError, ThematicGrouper, TitleGroup};

/// Group name for titles with no usable keyword.
const FALLBACK_GROUP: &str = "Miscellaneous";

/// Keyword-based grouper.
pub struct KeywordGrouper {
    /// Minimum number of titles that must share a keyword for it to name a group
    min_support: usize,
}

impl KeywordGrouper {
    /// Create a new keyword grouper.
    pub fn new() -> Self {
        Self { min_support: 1 }
    }

    /// Ignore keywords shared by fewer than `min_support` titles.
    pub fn with_min_support(min_support: usize) -> Self {
        Self {
            min_support: min_support.max(1),
        }
    }

    /// Pick the group name for every title, in input order.
    fn assign(&self, titles: &[String]) -> Vec<String> {
        let keywords: Vec<BTreeSet<String>> = titles.iter().map(|t| extract_keywords(t)).collect();

        // Document frequency: how many titles mention each keyword
        let mut support: HashMap<&str, usize> = HashMap::new();
        for words in &keywords {
            for word in words {
                *support.entry(word.as_str()).or_insert(0) += 1;
            }
        }

        keywords
            .iter()
            .map(|words| {
                words
                    .iter()
                    .map(|w| (w.as_str(), support.get(w.as_str()).copied().unwrap_or(0)))
                    .filter(|(_, count)| *count >= self.min_support)
                    // Highest support wins; ties go to the alphabetically first word
                    .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
                    .map(|(word, _)| capitalize(word))
                    .unwrap_or_else(|| FALLBACK_GROUP.to_string())
            })
            .collect()
    }
}

impl Default for KeywordGrouper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThematicGrouper for KeywordGrouper {
    async fn group(
        &self,
        _source: &str,
        titles: &[String],
    ) -> Result<Vec<TitleGroup>, GroupingError> {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (title, name) in titles.iter().zip(self.assign(titles)) {
            groups.entry(name).or_default().push(title.clone());
        }

        Ok(groups
            .into_iter()
            .map(|(cluster_name, titles)| TitleGroup {
                cluster_name,
                titles,
            })
            .collect())
    }
}

/// Significant lowercase words of a title.
fn extract_keywords(title: &str) -> BTreeSet<String> {
    title
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .map(|w| w.trim_matches('-').to_lowercase())
        .filter(|w| w.chars().count() > 3)
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !is_stopword(w))
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Check if word is a common stopword.
fn is_stopword(word: &str) -> bool {
    const STOPWORDS: &[&str] = &[
        "the", "and", "for", "that", "this", "with", "from", "have", "has", "been", "were",
        "will", "would", "could", "should", "there", "their", "what", "when", "where", "which",
        "about", "into", "through", "does", "your", "just", "like", "anyone", "some", "other",
        "than", "then", "they", "them", "these", "those", "more", "most", "over", "only", "also",
        "very", "such", "here", "after", "before", "being", "using", "need", "help", "question",
        "best", "anybody", "thoughts", "today", "still", "much", "many", "know", "think", "want",
    ];
    STOPWORDS.contains(&word)
}
