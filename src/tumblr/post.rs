//! Dashboard post records.
//!
//! Posts arrive as loosely-shaped JSON objects. Every post carries the common
//! fields below; the `type` discriminant selects which extra fields must be
//! present. A type this crate does not know decodes to [`PostBody::Unknown`]
//! instead of failing, while a known type missing one of its fields is a
//! data-contract violation and fails decoding.
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// A post did not match the shape its `type` promises.
    #[error("Post #{index} ({post_url}) violates the dashboard data contract: {source}")]
    Contract {
        index: usize,
        post_url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Post {
    pub blog_name: String,
    pub post_url: String,
    /// Unix epoch seconds.
    pub timestamp: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note_count: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Present (non-null) only on reblogs.
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_title: Option<String>,
    #[serde(flatten)]
    pub body: PostBody,
}

impl Post {
    pub fn is_reblog(&self) -> bool {
        self.source_url.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PostBody {
    Text {
        body: String,
    },
    Photo {
        photos: Vec<Photo>,
        #[serde(default)]
        caption: Option<String>,
    },
    Quote {
        text: String,
        source: String,
    },
    Link {
        url: String,
        #[serde(default)]
        excerpt: Option<String>,
    },
    Chat {
        dialogue: Vec<ChatLine>,
    },
    Audio {
        embed: String,
        caption: String,
    },
    Video {
        player: Vec<VideoPlayer>,
        caption: String,
    },
    Question {
        asking_name: String,
        #[serde(default)]
        asking_url: Option<String>,
        question: String,
        answer: String,
    },
    #[serde(other)]
    Unknown,
}

impl PostBody {
    pub fn kind(&self) -> &'static str {
        match self {
            PostBody::Text { .. } => "text",
            PostBody::Photo { .. } => "photo",
            PostBody::Quote { .. } => "quote",
            PostBody::Link { .. } => "link",
            PostBody::Chat { .. } => "chat",
            PostBody::Audio { .. } => "audio",
            PostBody::Video { .. } => "video",
            PostBody::Question { .. } => "question",
            PostBody::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Photo {
    #[serde(default)]
    pub caption: Option<String>,
    pub original_size: PhotoSize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhotoSize {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatLine {
    pub label: String,
    pub phrase: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoPlayer {
    pub embed_code: String,
}

/// Decodes raw post records, preserving order.
///
/// Stops at the first record that violates its type's contract.
pub fn decode_posts(raw: &[Value]) -> Result<Vec<Post>, DecodeError> {
    raw.iter()
        .enumerate()
        .map(|(index, value)| {
            Post::deserialize(value).map_err(|source| DecodeError::Contract {
                index,
                post_url: value
                    .get("post_url")
                    .and_then(Value::as_str)
                    .unwrap_or("<no post_url>")
                    .to_string(),
                source,
            })
        })
        .collect()
}
