//! Scripted grouper for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use trend_grouping::{GroupingError, ThematicGrouper, TitleGroup};
use trend_types::{merge_key, Post};

/// Error produced by a failing script.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ErrorKind {
    Api,
    RateLimit,
    Config,
}

impl ErrorKind {
    fn error(self) -> GroupingError {
        match self {
            ErrorKind::Api => GroupingError::Api("HTTP 503: unavailable".to_string()),
            ErrorKind::RateLimit => GroupingError::RateLimitExceeded,
            ErrorKind::Config => GroupingError::Config("bad model".to_string()),
        }
    }
}

/// Per-batch failure script.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Behavior {
    FailAlways(ErrorKind),
    /// Fail the first n calls, then answer normally
    FailTimes(u32, ErrorKind),
    /// Answer with one title left out
    DropOneTitle,
    /// Never answer
    Hang,
}

/// Groups titles by a fixed title -> cluster name table.
///
/// Titles missing from the table land in "Other".
pub(crate) struct ScriptedGrouper {
    names: HashMap<String, String>,
    behaviors: HashMap<String, Behavior>,
    latency: Duration,
    calls: Mutex<HashMap<String, u32>>,
    seen: Mutex<HashMap<String, Vec<String>>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedGrouper {
    pub(crate) fn new(names: &[(&str, &str)]) -> Self {
        Self {
            names: names
                .iter()
                .map(|(title, name)| (merge_key(title), name.to_string()))
                .collect(),
            behaviors: HashMap::new(),
            latency: Duration::ZERO,
            calls: Mutex::new(HashMap::new()),
            seen: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_behavior(mut self, batch: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(batch.to_string(), behavior);
        self
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn calls(&self, batch: &str) -> u32 {
        self.calls.lock().unwrap().get(batch).copied().unwrap_or(0)
    }

    pub(crate) fn titles_seen(&self, batch: &str) -> Vec<String> {
        self.seen.lock().unwrap().get(batch).cloned().unwrap_or_default()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn answer(&self, titles: &[String]) -> Vec<TitleGroup> {
        let mut groups: Vec<TitleGroup> = Vec::new();
        for title in titles {
            let name = self
                .names
                .get(&merge_key(title))
                .cloned()
                .unwrap_or_else(|| "Other".to_string());
            match groups.iter_mut().find(|g| g.cluster_name == name) {
                Some(group) => group.titles.push(title.clone()),
                None => groups.push(TitleGroup::new(name, [title.clone()])),
            }
        }
        groups
    }
}

#[async_trait]
impl ThematicGrouper for ScriptedGrouper {
    async fn group(
        &self,
        source: &str,
        titles: &[String],
    ) -> Result<Vec<TitleGroup>, GroupingError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(source.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        self.seen
            .lock()
            .unwrap()
            .insert(source.to_string(), titles.to_vec());

        let active = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let result = match self.behaviors.get(source) {
            Some(Behavior::FailAlways(kind)) => Err(kind.error()),
            Some(Behavior::FailTimes(n, kind)) if call <= *n => Err(kind.error()),
            Some(Behavior::DropOneTitle) => Ok(self.answer(&titles[1..])),
            Some(Behavior::Hang) => std::future::pending().await,
            _ => Ok(self.answer(titles)),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Posts from `(id, title, source)` triples, all created at the same instant.
pub(crate) fn posts(items: &[(&str, &str, &str)]) -> Vec<Post> {
    let created = Utc.with_ymd_and_hms(2025, 11, 20, 9, 0, 0).unwrap();
    items
        .iter()
        .map(|(id, title, source)| Post::new(*id, *title, *source, created))
        .collect()
}
