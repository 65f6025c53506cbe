use chrono::{DateTime, Utc};

use crate::feed::item::{render_item, FeedItem, RenderError};
use crate::tumblr::Post;

pub const DEFAULT_SELF_LINK: &str = "http://localhost/dashboard.xml";

/// Fixed channel metadata. Only the self-referential feed URL varies
/// between deployments.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMeta {
    pub title: String,
    pub description: String,
    pub link: String,
    pub language: String,
    pub ttl_minutes: u32,
    /// Where the feed itself is published, for `<atom:link rel="self">`.
    pub self_link: String,
}

impl ChannelMeta {
    pub fn new(self_link: impl Into<String>) -> Self {
        Self {
            self_link: self_link.into(),
            ..Self::default()
        }
    }
}

impl Default for ChannelMeta {
    fn default() -> Self {
        Self {
            title: "My Tumblr Dashboard".to_string(),
            description: "Tumblr Dashboard".to_string(),
            link: "https://www.tumblr.com/dashboard".to_string(),
            language: "en-us".to_string(),
            ttl_minutes: 5,
            self_link: DEFAULT_SELF_LINK.to_string(),
        }
    }
}

/// A complete feed, ready to serialize. Items keep the input post order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedDocument {
    pub channel: ChannelMeta,
    pub last_build_date: DateTime<Utc>,
    pub items: Vec<FeedItem>,
}

/// Builds the feed for `posts`, one item per post.
///
/// `built_at` becomes `lastBuildDate`; callers pass the current time.
pub fn build_feed(
    channel: ChannelMeta,
    posts: &[Post],
    built_at: DateTime<Utc>,
) -> Result<FeedDocument, RenderError> {
    let items = posts.iter().map(render_item).collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(items = items.len(), "Rendered feed items");

    Ok(FeedDocument {
        channel,
        last_build_date: built_at,
        items,
    })
}

/// RFC 822 date as RSS readers expect it, always in GMT.
pub fn format_rfc822(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tumblr::PostBody;
    use chrono::TimeZone;

    fn text_post(n: u32) -> Post {
        Post {
            blog_name: format!("blog{}", n),
            post_url: format!("https://blog{}.tumblr.com/post/{}", n, n),
            timestamp: 1_700_000_000 - i64::from(n) * 60,
            tags: Vec::new(),
            note_count: u64::from(n),
            title: None,
            summary: Some(format!("summary {}", n)),
            source_url: None,
            source_title: None,
            body: PostBody::Text {
                body: format!("body {}", n),
            },
        }
    }

    #[test]
    fn test_default_channel_meta() {
        let meta = ChannelMeta::new("https://feeds.example.com/dash.xml");
        assert_eq!(meta.title, "My Tumblr Dashboard");
        assert_eq!(meta.link, "https://www.tumblr.com/dashboard");
        assert_eq!(meta.language, "en-us");
        assert_eq!(meta.ttl_minutes, 5);
        assert_eq!(meta.self_link, "https://feeds.example.com/dash.xml");
    }

    #[test]
    fn test_build_feed_one_item_per_post_in_order() {
        let posts: Vec<Post> = (0..7).map(text_post).collect();
        let built_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let doc = build_feed(ChannelMeta::default(), &posts, built_at).unwrap();

        assert_eq!(doc.items.len(), posts.len());
        for (item, post) in doc.items.iter().zip(&posts) {
            assert_eq!(item.link, post.post_url);
        }
        assert_eq!(doc.last_build_date, built_at);
    }

    #[test]
    fn test_build_feed_empty() {
        let doc = build_feed(ChannelMeta::default(), &[], Utc::now()).unwrap();
        assert!(doc.items.is_empty());
    }

    #[test]
    fn test_build_feed_fails_on_contract_violation() {
        let mut posts: Vec<Post> = (0..3).map(text_post).collect();
        posts[1].summary = None;
        let err = build_feed(ChannelMeta::default(), &posts, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("https://blog1.tumblr.com/post/1"));
    }

    #[test]
    fn test_format_rfc822_is_gmt() {
        let date = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(format_rfc822(&date), "Tue, 14 Nov 2023 22:13:20 GMT");
    }
}
