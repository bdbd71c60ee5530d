//! Post type for harvested discussion content.
//!
//! Posts are immutable once ingested. Field aliases accept the naming used
//! by common forum exports (`subreddit`, `created_utc`, `selftext`, `ups`).
//! Timestamps may be RFC 3339, naive (read as UTC) or epoch seconds.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Stable post identifier, unique within one engine run.
pub type PostId = String;

/// A short text post harvested from one discussion source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Stable identifier
    pub id: PostId,

    /// Post title, the only text sent to the grouping capability
    pub title: String,

    /// Optional free-text body
    #[serde(default, alias = "selftext", skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Net score (upvotes minus downvotes)
    #[serde(default)]
    pub score: i64,

    /// Upvote count
    #[serde(default, alias = "ups")]
    pub upvotes: u64,

    /// Downvote count
    #[serde(default, alias = "downs")]
    pub downvotes: u64,

    /// Comment count
    #[serde(default, alias = "comments")]
    pub num_comments: u64,

    /// Creation timestamp (UTC)
    #[serde(
        alias = "created_utc",
        alias = "timestamp",
        alias = "post_date",
        deserialize_with = "deserialize_timestamp"
    )]
    pub created_at: DateTime<Utc>,

    /// Originating source (e.g. a subreddit name)
    #[serde(alias = "subreddit")]
    pub source: String,

    /// Canonical URL
    #[serde(default)]
    pub url: String,
}

impl Post {
    /// Create a post with zero engagement.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        source: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: None,
            score: 0,
            upvotes: 0,
            downvotes: 0,
            num_comments: 0,
            created_at,
            source: source.into(),
            url: String::new(),
        }
    }

    /// Set the net score.
    pub fn with_score(mut self, score: i64) -> Self {
        self.score = score;
        self
    }

    /// Set upvote and downvote counts.
    pub fn with_votes(mut self, upvotes: u64, downvotes: u64) -> Self {
        self.upvotes = upvotes;
        self.downvotes = downvotes;
        self
    }

    /// Set the comment count.
    pub fn with_comments(mut self, num_comments: u64) -> Self {
        self.num_comments = num_comments;
        self
    }

    /// Set the body text.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the canonical URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Whole days elapsed between creation and `reference`.
    ///
    /// Posts dated after the reference time count as zero days old.
    pub fn age_days(&self, reference: DateTime<Utc>) -> i64 {
        reference
            .signed_duration_since(self.created_at)
            .num_days()
            .max(0)
    }
}

/// Naive layouts accepted after RFC 3339; `%.f` also matches no fraction.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a timestamp as RFC 3339, then as naive UTC date-time or date.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    EpochSeconds(f64),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Text(text) => parse_timestamp(&text)
            .ok_or_else(|| de::Error::custom(format!("unrecognized timestamp `{text}`"))),
        RawTimestamp::EpochSeconds(secs) => {
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9) as u32;
            secs.is_finite()
                .then(|| Utc.timestamp_opt(whole as i64, nanos).single())
                .flatten()
                .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {secs}")))
        }
    }
}
