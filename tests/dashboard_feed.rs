//! End-to-end tests: a mocked Tumblr API serves dashboard pages, the full
//! pipeline renders them, and the written file is read back as RSS.
//!
//! Each test uses its own mock server and scratch directory.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tumbledash::config::Config;
use tumbledash::dashboard;
use tumbledash::tumblr::{OAuthCredentials, TumblrClient};
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> OAuthCredentials {
    OAuthCredentials {
        consumer_key: SecretString::from("ck".to_string()),
        consumer_secret: SecretString::from("cs".to_string()),
        token: SecretString::from("tk".to_string()),
        token_secret: SecretString::from("ts".to_string()),
    }
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "tumbledash_it_{}_{}",
        std::process::id(),
        name
    ));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn config(server: &MockServer, dir: &Path, post_count: u32) -> Config {
    Config {
        post_count,
        api_base_url: server.uri(),
        feed_self_url: "https://feeds.example.com/dashboard.xml".to_string(),
        output_path: dir.join("dashboard.xml"),
        dump_path: dir.join("dash_output.json"),
        ..Config::default()
    }
}

/// A post at absolute dashboard position `n`, cycling through every known type.
fn post(n: u32) -> Value {
    let mut post = json!({
        "blog_name": format!("blog{}", n),
        "post_url": format!("https://blog{}.tumblr.com/post/{}", n, n),
        "timestamp": 1_700_000_000 - i64::from(n) * 60,
        "tags": [format!("tag{}", n), "dash"],
        "note_count": n,
        "summary": format!("summary {}", n),
    });
    let extra = match n % 9 {
        0 => json!({"type": "text", "title": null, "body": "<p>body</p>"}),
        1 => json!({"type": "photo", "caption": null, "photos": [
            {"caption": "alt", "original_size": {"url": "https://64.media.tumblr.com/a.jpg"}}
        ]}),
        2 => json!({"type": "quote", "text": "Q", "source": "Src"}),
        3 => json!({"type": "link", "url": "https://example.com", "excerpt": null}),
        4 => json!({"type": "chat", "dialogue": [
            {"label": "A:", "phrase": "hi"}, {"label": "B:", "phrase": "hey"}
        ]}),
        5 => json!({"type": "audio", "embed": "<iframe></iframe>", "caption": "song"}),
        6 => json!({"type": "video", "caption": "clip", "player": [
            {"width": 250, "embed_code": "<small/>"}, {"width": 500, "embed_code": "<large/>"}
        ]}),
        7 => json!({"type": "question", "asking_name": "anon", "asking_url": null,
                    "question": "why?", "answer": "because ]]> reasons"}),
        _ => json!({"type": "blocks", "source_url": "https://orig.tumblr.com/post/1",
                    "source_title": "orig"}),
    };
    for (k, v) in extra.as_object().unwrap() {
        post[k] = v.clone();
    }
    post
}

fn page(offset: u32, limit: u32) -> Value {
    json!({
        "meta": {"status": 200, "msg": "OK"},
        "response": {"posts": (offset..offset + limit).map(post).collect::<Vec<_>>()}
    })
}

async fn mount_page(server: &MockServer, offset: u32, limit: u32) {
    Mock::given(method("GET"))
        .and(path("/v2/user/dashboard"))
        .and(query_param("offset", offset.to_string()))
        .and(query_param("limit", limit.to_string()))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(offset, limit)))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_run_renders_every_post_in_order() {
    let server = MockServer::start().await;
    mount_page(&server, 0, 20).await;
    mount_page(&server, 20, 20).await;
    mount_page(&server, 40, 5).await;

    let dir = scratch("full_run");
    let config = config(&server, &dir, 45);
    let client = TumblrClient::new(reqwest::Client::new(), &config.api_base_url, credentials())
        .unwrap();

    let summary = dashboard::run(&client, &config, None).await.unwrap();
    assert_eq!(summary.items, 45);

    let xml = std::fs::read(&config.output_path).unwrap();
    let feed = feed_rs::parser::parse(xml.as_slice()).expect("output should parse as RSS");

    assert_eq!(
        feed.title.map(|t| t.content).as_deref(),
        Some("My Tumblr Dashboard")
    );
    assert_eq!(feed.entries.len(), 45);
    for (n, entry) in feed.entries.iter().enumerate() {
        let url = format!("https://blog{}.tumblr.com/post/{}", n, n);
        assert_eq!(entry.links.first().map(|l| l.href.as_str()), Some(url.as_str()));
        let terms: Vec<&str> = entry.categories.iter().map(|c| c.term.as_str()).collect();
        assert_eq!(terms, vec![format!("tag{}", n).as_str(), "dash"]);
        let description = entry.summary.as_ref().map(|s| s.content.as_str()).unwrap_or("");
        assert!(
            description.ends_with(&format!("<br><p>{} notes</p>", n)),
            "entry {}: {}",
            n,
            description
        );
    }
}

#[tokio::test]
async fn test_type_specific_rendering_survives_serialization() {
    let server = MockServer::start().await;
    mount_page(&server, 0, 9).await;

    let dir = scratch("types");
    let config = config(&server, &dir, 9);
    let client = TumblrClient::new(reqwest::Client::new(), &config.api_base_url, credentials())
        .unwrap();

    dashboard::run(&client, &config, None).await.unwrap();
    let xml = std::fs::read_to_string(&config.output_path).unwrap();

    assert!(xml.contains("<title>blog0: summary 0</title>"));
    assert!(xml.contains("<![CDATA[<p>body</p><br><p>0 notes</p>]]>"));
    assert!(xml.contains("<img src=\"https://64.media.tumblr.com/a.jpg\" alt=\"alt\">"));
    assert!(xml.contains(
        "<blockquote><h2>Q</h2><cite style=\"display: block; text-align: right;\"> - Src</cite></blockquote>"
    ));
    assert!(xml.contains("<tr style=\"background: #eaeaea;\"><th"));
    assert!(xml.contains("<large/><p>clip</p>"));
    assert!(!xml.contains("<small/>"));
    assert!(xml.contains("<i>anon asked</i>"));
    assert!(xml.contains("<title>blog8: summary 8 (reblogged via orig)</title>"));
    assert!(xml.contains("<guid isPermaLink=\"false\">https://blog3.tumblr.com/post/3</guid>"));

    let feed = feed_rs::parser::parse(xml.as_bytes()).expect("output should parse as RSS");
    assert_eq!(feed.entries.len(), 9);
    let answer = feed.entries[7]
        .summary
        .as_ref()
        .map(|s| s.content.clone())
        .unwrap_or_default();
    assert!(answer.contains("because ]]> reasons"), "{}", answer);
}

#[tokio::test]
async fn test_dump_writes_raw_posts() {
    let server = MockServer::start().await;
    mount_page(&server, 0, 3).await;

    let dir = scratch("dump");
    let config = config(&server, &dir, 3);
    let client = TumblrClient::new(reqwest::Client::new(), &config.api_base_url, credentials())
        .unwrap();

    dashboard::run(&client, &config, Some(&config.dump_path))
        .await
        .unwrap();

    let dump: Vec<Value> =
        serde_json::from_str(&std::fs::read_to_string(&config.dump_path).unwrap()).unwrap();
    assert_eq!(dump, (0..3).map(post).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_transport_failure_leaves_previous_feed() {
    let server = MockServer::start().await;
    mount_page(&server, 0, 20).await;
    Mock::given(method("GET"))
        .and(query_param("offset", "20"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = scratch("transport_failure");
    let config = config(&server, &dir, 30);
    std::fs::write(&config.output_path, "previous feed").unwrap();
    let client = TumblrClient::new(reqwest::Client::new(), &config.api_base_url, credentials())
        .unwrap();

    let err = dashboard::run(&client, &config, None).await.unwrap_err();

    assert!(format!("{:#}", err).contains("HTTP error: status 500"));
    assert_eq!(
        std::fs::read_to_string(&config.output_path).unwrap(),
        "previous feed"
    );
}

#[tokio::test]
async fn test_unauthorized_aborts_before_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "meta": {"status": 401, "msg": "Unauthorized"},
            "response": []
        })))
        .mount(&server)
        .await;

    let dir = scratch("unauthorized");
    let config = config(&server, &dir, 5);
    let client = TumblrClient::new(reqwest::Client::new(), &config.api_base_url, credentials())
        .unwrap();

    assert!(dashboard::run(&client, &config, None).await.is_err());
    assert!(!config.output_path.exists());
}

#[tokio::test]
async fn test_control_characters_in_posts_stay_out_of_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/user/dashboard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"status": 200, "msg": "OK"},
            "response": {"posts": [{
                "type": "text",
                "blog_name": "blog\u{1}",
                "post_url": "https://blog.tumblr.com/post/1",
                "timestamp": 1_700_000_000,
                "tags": ["a\u{c}b"],
                "note_count": 3,
                "title": null,
                "summary": "S\u{8}",
                "body": "pasted\u{b}text"
            }]}
        })))
        .mount(&server)
        .await;

    let dir = scratch("control_chars");
    let config = config(&server, &dir, 1);
    let client = TumblrClient::new(reqwest::Client::new(), &config.api_base_url, credentials())
        .unwrap();

    dashboard::run(&client, &config, None).await.unwrap();
    let xml = std::fs::read_to_string(&config.output_path).unwrap();

    assert!(
        !xml.chars()
            .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r')),
        "{:?}",
        xml
    );
    assert!(xml.contains("<title>blog: S</title>"));
    assert!(xml.contains("<category>ab</category>"));
    assert!(xml.contains("pastedtext"));

    let feed = feed_rs::parser::parse(xml.as_bytes()).expect("output should parse as RSS");
    assert_eq!(feed.entries.len(), 1);
}
