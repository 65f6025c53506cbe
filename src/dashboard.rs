//! The end-to-end run: plan the queries, fetch every page, decode, render,
//! and replace the output file.
//!
//! Every fallible step happens before the output is touched, so a failed run
//! leaves the previous feed in place.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::feed::{build_feed, to_xml, write_atomic, ChannelMeta};
use crate::paginate;
use crate::tumblr::{decode_posts, fetch_dashboard, DashboardSource};

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub items: usize,
    pub output_path: PathBuf,
}

/// Fetches the configured dashboard window and returns the rendered feed.
///
/// When `dump_path` is set, the raw posts are written there as pretty JSON
/// before decoding, so malformed records can still be inspected.
pub async fn generate<S: DashboardSource + Sync>(
    source: &S,
    config: &Config,
    dump_path: Option<&Path>,
    built_at: DateTime<Utc>,
) -> Result<(String, usize)> {
    let plan = paginate::plan(config.post_count, config.page_size, config.starting_offset)
        .context("Invalid pagination settings")?;

    let raw = fetch_dashboard(source, &plan, config.concurrency)
        .await
        .context("Failed to retrieve dashboard")?;

    if let Some(dump_path) = dump_path {
        let json = serde_json::to_vec_pretty(&raw).context("Failed to serialize raw posts")?;
        write_atomic(dump_path, &json)
            .with_context(|| format!("Failed to write dump to {}", dump_path.display()))?;
        tracing::info!(path = %dump_path.display(), posts = raw.len(), "Dumped raw dashboard JSON");
    }

    let posts = decode_posts(&raw).context("Dashboard returned malformed posts")?;
    let doc = build_feed(ChannelMeta::new(&config.feed_self_url), &posts, built_at)
        .context("Failed to render feed")?;
    let xml = to_xml(&doc)?;

    Ok((xml, doc.items.len()))
}

/// Runs [`generate`] and atomically replaces `config.output_path`.
pub async fn run<S: DashboardSource + Sync>(
    source: &S,
    config: &Config,
    dump_path: Option<&Path>,
) -> Result<RunSummary> {
    let (xml, items) = generate(source, config, dump_path, Utc::now()).await?;

    write_atomic(&config.output_path, xml.as_bytes()).with_context(|| {
        format!(
            "Failed to write feed to {}",
            config.output_path.display()
        )
    })?;
    tracing::info!(path = %config.output_path.display(), items, "Feed written");

    Ok(RunSummary {
        items,
        output_path: config.output_path.clone(),
    })
}
