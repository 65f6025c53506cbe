//! Renders a Tumblr dashboard as an RSS 2.0 feed.
//!
//! The pipeline is: [`paginate::plan`] the API calls, fetch them with
//! [`tumblr::fetch_dashboard`], decode with [`tumblr::decode_posts`], build the
//! document with [`feed::build_feed`], and serialize with [`feed::to_xml`].
//! [`dashboard::run`] wires these together.

pub mod config;
pub mod dashboard;
pub mod feed;
pub mod paginate;
pub mod tumblr;
