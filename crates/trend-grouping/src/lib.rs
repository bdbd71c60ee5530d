//! Thematic grouping capability.
//!
//! A grouper receives the titles of one source (or of every source in
//! global mode) and partitions them into named groups. Every input title
//! must land in exactly one group; [`validate_assignment`] enforces that
//! contract so callers can treat a malformed answer like a failed call.
//!
//! Implementations:
//! - [`ApiGrouper`]: OpenAI-compatible or Anthropic chat endpoints
//! - [`KeywordGrouper`]: deterministic offline grouping by shared keywords

mod api;
mod contract;
mod keyword;

pub use api::{ApiFlavor, ApiGrouper, ApiGrouperConfig};
pub use contract::validate_assignment;
pub use keyword::KeywordGrouper;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for grouping operations.
#[derive(Debug, Error)]
pub enum GroupingError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Timeout waiting for response")]
    Timeout,

    #[error("Invalid title assignment: {0}")]
    ContractViolation(String),
}

impl GroupingError {
    /// Whether another attempt could succeed.
    ///
    /// Configuration errors are permanent; everything else is transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, GroupingError::Config(_))
    }

    /// True for a malformed title assignment.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, GroupingError::ContractViolation(_))
    }
}

/// One named group of titles returned by a grouper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleGroup {
    /// Descriptive cluster name
    pub cluster_name: String,

    /// Titles assigned to this cluster, as sent
    pub titles: Vec<String>,
}

impl TitleGroup {
    /// Create a new title group.
    pub fn new<I, S>(cluster_name: impl Into<String>, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cluster_name: cluster_name.into(),
            titles: titles.into_iter().map(Into::into).collect(),
        }
    }
}

/// Pluggable thematic grouping capability.
///
/// `source` identifies the batch for prompts and logs; in global mode it is
/// a synthetic label covering every source.
#[async_trait]
pub trait ThematicGrouper: Send + Sync {
    /// Partition `titles` into named groups.
    async fn group(&self, source: &str, titles: &[String])
        -> Result<Vec<TitleGroup>, GroupingError>;
}
