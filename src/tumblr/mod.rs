//! Tumblr v2 API access: the dashboard post model, OAuth 1.0a signing, and
//! the paged dashboard fetcher.

mod client;
mod oauth;
mod post;

pub use client::{
    fetch_dashboard, DashboardSource, FetchError, TumblrClient, DEFAULT_API_BASE_URL,
    REQUEST_TIMEOUT,
};
pub use oauth::{authorization_header, Nonce, OAuthCredentials};
pub use post::{decode_posts, ChatLine, DecodeError, Photo, PhotoSize, Post, PostBody, VideoPlayer};
