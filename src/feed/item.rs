//! Turns one dashboard post into one feed item.
//!
//! Every item shares the same skeleton: a title built from the blog name and
//! the post's title (or summary), an optional `<h1>` seed, a body chosen by the
//! post type, then a reblog attribution (reblogs only) and the note count.
//! Post text is already HTML and is embedded as-is.
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::tumblr::{ChatLine, Photo, Post, PostBody, VideoPlayer};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The post needed a field the API did not send.
    #[error("Post {post_url} is missing required field `{field}`")]
    MissingField {
        post_url: String,
        field: &'static str,
    },

    #[error("Post {post_url} has an out-of-range timestamp: {timestamp}")]
    InvalidTimestamp { post_url: String, timestamp: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    /// Same as `link`; written with `isPermaLink="false"`.
    pub guid: String,
    pub pub_date: DateTime<Utc>,
    pub categories: Vec<String>,
    /// HTML, written as CDATA.
    pub description: String,
}

/// Builds the feed item for `post`. Pure: the same post always yields the
/// same item.
pub fn render_item(post: &Post) -> Result<FeedItem, RenderError> {
    let (title_text, mut description) = match &post.title {
        Some(title) => (title.clone(), format!("<h1>{}</h1>", title)),
        None => (summary(post)?.to_string(), String::new()),
    };

    let mut title = format!("{}: {}", post.blog_name, title_text);
    if post.is_reblog() {
        title.push_str(&format!(" (reblogged via {})", source_title(post)));
    }

    render_body(post, &mut description)?;

    if let Some(source_url) = &post.source_url {
        description.push_str(&format!(
            "<p><small>Reblogged via <a href=\"{}\">{}</a></small></p>",
            source_url,
            source_title(post)
        ));
    }
    description.push_str(&format!("<br><p>{} notes</p>", post.note_count));

    let pub_date = DateTime::from_timestamp(post.timestamp, 0).ok_or_else(|| {
        RenderError::InvalidTimestamp {
            post_url: post.post_url.clone(),
            timestamp: post.timestamp,
        }
    })?;

    Ok(FeedItem {
        title,
        link: post.post_url.clone(),
        guid: post.post_url.clone(),
        pub_date,
        categories: post.tags.clone(),
        description,
    })
}

fn summary(post: &Post) -> Result<&str, RenderError> {
    post.summary
        .as_deref()
        .ok_or_else(|| missing(post, "summary"))
}

/// Falls back to the source URL when the API omits the source title.
fn source_title(post: &Post) -> &str {
    post.source_title
        .as_deref()
        .or(post.source_url.as_deref())
        .unwrap_or_default()
}

fn missing(post: &Post, field: &'static str) -> RenderError {
    RenderError::MissingField {
        post_url: post.post_url.clone(),
        field,
    }
}

fn render_body(post: &Post, out: &mut String) -> Result<(), RenderError> {
    match &post.body {
        PostBody::Question {
            asking_name,
            asking_url,
            question,
            answer,
        } => {
            let asker = match asking_url {
                // Anonymous asks carry no URL
                None => asking_name.clone(),
                Some(url) => format!("<a href=\"{}\" target=\"_blank\">{}</a>", url, asking_name),
            };
            out.push_str(&format!(
                "<blockquote><i>{} asked</i><p>{}</p></blockquote>{}",
                asker, question, answer
            ));
        }
        PostBody::Photo { photos, caption } => {
            match caption {
                Some(caption) => out.push_str(caption),
                None => out.push_str(summary(post)?),
            }
            out.push_str(&render_photos(photos));
        }
        PostBody::Text { body } => out.push_str(body),
        PostBody::Link { url, excerpt } => {
            let summary = summary(post)?;
            out.push_str(&format!(
                "<h1> <a href=\"{}\" alt=\"{}\" target=\"_blank\">{}</a></h1>",
                url,
                excerpt.as_deref().unwrap_or(summary),
                summary
            ));
        }
        PostBody::Audio { embed, caption } => {
            out.push_str(&format!("{}<p>{}</p>", embed, caption));
        }
        PostBody::Video { player, caption } => {
            let VideoPlayer { embed_code } = player.last().ok_or_else(|| missing(post, "player"))?;
            out.push_str(&format!("{}<p>{}</p>", embed_code, caption));
        }
        PostBody::Quote { text, source } => {
            out.push_str(&format!(
                "<blockquote><h2>{}</h2><cite style=\"display: block; text-align: right;\"> - {}</cite></blockquote>",
                text, source
            ));
        }
        PostBody::Chat { dialogue } => out.push_str(&render_chat(dialogue)),
        PostBody::Unknown => {
            tracing::warn!(post_url = %post.post_url, "Unrecognized post type, rendering without body");
        }
    }
    Ok(())
}

fn render_photos(photos: &[Photo]) -> String {
    photos
        .iter()
        .map(|photo| match &photo.caption {
            Some(caption) => format!(
                "<img src=\"{}\" alt=\"{}\">",
                photo.original_size.url, caption
            ),
            None => format!("<img src=\"{}\">", photo.original_size.url),
        })
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Odd rows (zero-based) are shaded.
fn render_chat(dialogue: &[ChatLine]) -> String {
    let mut table = String::from("<table width=\"80%\" cellspacing=\"0\" cellpadding=\"2\">");
    for (index, line) in dialogue.iter().enumerate() {
        let row_open = if index % 2 == 0 {
            "<tr>"
        } else {
            "<tr style=\"background: #eaeaea;\">"
        };
        table.push_str(&format!(
            "{}<th width=\"10%\" align=\"left\" valign=\"top\">{}</th><td align=\"left\" valign=\"top\">{}</td></tr>",
            row_open, line.label, line.phrase
        ));
    }
    table.push_str("</table>");
    table
}
