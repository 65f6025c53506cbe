use anyhow::{Context, Result};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use crate::feed::document::{format_rfc822, FeedDocument};

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// Serializes a feed as a tab-indented RSS 2.0 document.
///
/// Element order inside the channel is fixed: metadata, the atom self link,
/// then one `<item>` per feed item.
pub fn to_xml(doc: &FeedDocument) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b'\t', 1);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:atom", ATOM_NAMESPACE));
    writer
        .write_event(Event::Start(rss))
        .context("Failed to write rss element")?;
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .context("Failed to write channel element")?;

    let channel = &doc.channel;
    write_text_element(&mut writer, "title", &channel.title)?;
    write_text_element(&mut writer, "description", &channel.description)?;
    write_text_element(&mut writer, "link", &channel.link)?;
    write_text_element(&mut writer, "language", &channel.language)?;
    write_text_element(
        &mut writer,
        "lastBuildDate",
        &format_rfc822(&doc.last_build_date),
    )?;
    write_text_element(&mut writer, "ttl", &channel.ttl_minutes.to_string())?;

    let mut atom_link = BytesStart::new("atom:link");
    atom_link.push_attribute(("href", xml_safe(&channel.self_link).as_ref()));
    atom_link.push_attribute(("rel", "self"));
    atom_link.push_attribute(("type", "application/rss+xml"));
    writer
        .write_event(Event::Empty(atom_link))
        .context("Failed to write atom:link element")?;

    for item in &doc.items {
        writer
            .write_event(Event::Start(BytesStart::new("item")))
            .context("Failed to write item element")?;

        for category in &item.categories {
            write_text_element(&mut writer, "category", category)?;
        }
        write_text_element(&mut writer, "title", &item.title)?;
        write_text_element(&mut writer, "link", &item.link)?;

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "false"));
        writer
            .write_event(Event::Start(guid))
            .context("Failed to write guid element")?;
        writer
            .write_event(Event::Text(BytesText::new(&xml_safe(&item.guid))))
            .context("Failed to write guid text")?;
        writer
            .write_event(Event::End(BytesEnd::new("guid")))
            .context("Failed to write guid end")?;

        write_text_element(&mut writer, "pubDate", &format_rfc822(&item.pub_date))?;

        writer
            .write_event(Event::Start(BytesStart::new("description")))
            .context("Failed to write description element")?;
        write_cdata(&mut writer, &item.description)?;
        writer
            .write_event(Event::End(BytesEnd::new("description")))
            .context("Failed to write description end")?;

        writer
            .write_event(Event::End(BytesEnd::new("item")))
            .context("Failed to write item end")?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .context("Failed to write channel end")?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .context("Failed to write rss end")?;

    let mut bytes = writer.into_inner().into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).context("Generated feed contains invalid UTF-8")
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write {} element", name))?;
    writer
        .write_event(Event::Text(BytesText::new(&xml_safe(text))))
        .with_context(|| format!("Failed to write {} text", name))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write {} end", name))?;
    Ok(())
}

/// Matches the XML 1.0 `Char` production. C0 controls other than tab, newline
/// and carriage return are not allowed anywhere in a document, not even
/// escaped or inside CDATA.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Drops characters a conforming parser would reject.
fn xml_safe(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| is_xml_char(c)).collect())
    }
}

/// Writes `content` as CDATA. A literal `]]>` would end the section early, so
/// it is split across two adjacent sections (`...]]` and `>...`).
fn write_cdata<W: Write>(writer: &mut Writer<W>, content: &str) -> Result<()> {
    let content = xml_safe(content);
    let segments: Vec<&str> = content.split("]]>").collect();
    let last = segments.len() - 1;

    for (i, segment) in segments.iter().enumerate() {
        let mut piece = String::with_capacity(segment.len() + 3);
        if i > 0 {
            piece.push('>');
        }
        piece.push_str(segment);
        if i < last {
            piece.push_str("]]");
        }
        writer
            .write_event(Event::CData(BytesCData::new(piece)))
            .context("Failed to write description CDATA")?;
    }
    Ok(())
}

/// Writes `content` to `path` atomically.
///
/// The bytes go to a hidden sibling file that is synced and then renamed over
/// `path`, so readers see either the previous file or the complete new one.
/// The sibling is removed if any step fails.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = temp_sibling(path);

    let result = write_synced(&temp_path, content).and_then(|()| {
        std::fs::rename(&temp_path, path).with_context(|| {
            format!(
                "Failed to move '{}' into place at '{}'",
                temp_path.display(),
                path.display()
            )
        })
    });
    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

/// `dir/dashboard.xml` becomes `dir/.dashboard.xml.<random>.tmp`.
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{:016x}.tmp", name, rand::random::<u64>()))
}

fn write_synced(path: &Path, content: &[u8]) -> Result<()> {
    // create_new refuses to follow a file planted at the temp name
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("Failed to create temporary file '{}'", path.display()))?;
    file.write_all(content)
        .with_context(|| format!("Failed to write temporary file '{}'", path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync temporary file '{}'", path.display()))?;
    Ok(())
}
