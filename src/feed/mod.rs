//! RSS rendering for dashboard posts.
//!
//! - [`item`] - per-post rendering, dispatched on the post type
//! - [`document`] - channel metadata and the pure post-list to document builder
//! - [`writer`] - XML serialization and atomic file output
//!
//! # Example
//!
//! ```ignore
//! use tumbledash::feed::{build_feed, to_xml, ChannelMeta};
//!
//! let doc = build_feed(ChannelMeta::default(), &posts, chrono::Utc::now())?;
//! let xml = to_xml(&doc)?;
//! ```

mod document;
mod item;
mod writer;

pub use document::{build_feed, format_rfc822, ChannelMeta, FeedDocument, DEFAULT_SELF_LINK};
pub use item::{render_item, FeedItem, RenderError};
pub use writer::{to_xml, write_atomic};
